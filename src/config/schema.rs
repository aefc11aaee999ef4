//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::cluster::spec::{ClusterConfig, ConnectionSpec, PoolConfig};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// SQL cluster topology and pool settings.
    pub sql: SqlConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Periodic liveness checks.
    pub health_check: HealthCheckConfig,
}

/// Credentials and address of one SQL server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SqlConnConfig {
    pub user: String,
    pub password: String,
    /// `host` or `host:port`.
    pub host: String,
    pub db: String,
}

/// SQL cluster configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Driver identifier, e.g. "mysql".
    pub driver_name: String,

    /// Decode temporal columns in `timezone`.
    pub parse_time: bool,

    /// Session time zone used when `parse_time` is set. Named zones other
    /// than UTC need the server's time zone tables; offsets always work.
    pub timezone: String,

    /// The write node.
    #[serde(alias = "master")]
    pub primary: SqlConnConfig,

    /// Read replicas, in routing order.
    #[serde(alias = "slaves")]
    pub replicas: Vec<SqlConnConfig>,

    /// Pool limits applied to every node.
    pub pool: PoolConfig,
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            driver_name: "mysql".to_string(),
            parse_time: true,
            timezone: "UTC".to_string(),
            primary: SqlConnConfig::default(),
            replicas: Vec::new(),
            pool: PoolConfig::default(),
        }
    }
}

impl SqlConfig {
    fn connection_spec(&self, conn: &SqlConnConfig) -> ConnectionSpec {
        let spec = ConnectionSpec::new(&conn.user, &conn.password, &conn.host, &conn.db);
        if self.parse_time {
            spec.with_time_parsing(&self.timezone)
        } else {
            spec
        }
    }

    /// Topology for [`ClusterConnector`](crate::cluster::ClusterConnector).
    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            driver_name: self.driver_name.clone(),
            primary: self.connection_spec(&self.primary),
            replicas: self
                .replicas
                .iter()
                .map(|r| self.connection_spec(r))
                .collect(),
            pool: self.pool.clone(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON lines.
    pub log_format: LogFormat,

    /// Include source file and line in log events.
    pub enable_caller: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            enable_caller: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable periodic pings.
    pub enabled: bool,

    /// Ping interval in seconds.
    pub interval_secs: u64,

    /// Deadline for one round of pings in seconds.
    pub timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
            timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_config_from_sql_config() {
        let sql = SqlConfig {
            timezone: "Asia/Kolkata".into(),
            primary: SqlConnConfig {
                user: "app".into(),
                password: "pw".into(),
                host: "primary:3306".into(),
                db: "consequent".into(),
            },
            replicas: vec![SqlConnConfig {
                user: "ro".into(),
                password: "pw".into(),
                host: "replica:3306".into(),
                db: "consequent".into(),
            }],
            ..SqlConfig::default()
        };

        let cluster = sql.cluster_config();
        assert_eq!(cluster.driver_name, "mysql");
        assert_eq!(cluster.primary.host, "primary:3306");
        assert!(cluster.primary.parse_time);
        assert_eq!(cluster.primary.timezone, "Asia/Kolkata");
        assert_eq!(cluster.replicas.len(), 1);
        assert_eq!(cluster.replicas[0].user, "ro");
    }

    #[test]
    fn test_parse_time_disabled() {
        let sql = SqlConfig {
            parse_time: false,
            ..SqlConfig::default()
        };
        assert!(!sql.cluster_config().primary.parse_time);
    }

    #[test]
    fn test_legacy_master_slaves_keys() {
        let toml = r#"
            driver_name = "mysql"
            [master]
            user = "u"
            password = "p"
            host = "m"
            db = "d"
            [[slaves]]
            user = "u"
            password = "p"
            host = "s1"
            db = "d"
        "#;
        let sql: SqlConfig = toml::from_str(toml).unwrap();
        assert_eq!(sql.primary.host, "m");
        assert_eq!(sql.replicas[0].host, "s1");
    }
}
