//! Cluster topology definitions.
//!
//! Pure data: one [`ConnectionSpec`] per physical endpoint and a
//! [`ClusterConfig`] grouping the primary with its ordered replicas.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Everything needed to reach a single database endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectionSpec {
    pub user: String,
    pub password: String,
    /// `host` or `host:port`.
    pub host: String,
    pub database: String,
    /// Ask the driver to decode temporal columns in `timezone`.
    pub parse_time: bool,
    /// The MySQL driver sets this as the session `time_zone`: use an offset
    /// such as `+05:30` or `UTC` unless the server has its zone tables loaded.
    pub timezone: String,
}

impl ConnectionSpec {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            host: host.into(),
            database: database.into(),
            parse_time: false,
            timezone: String::new(),
        }
    }

    /// Request time parsing in the given location.
    pub fn with_time_parsing(mut self, timezone: impl Into<String>) -> Self {
        self.parse_time = true;
        self.timezone = timezone.into();
        self
    }
}

impl std::fmt::Debug for ConnectionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSpec")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("parse_time", &self.parse_time)
            .field("timezone", &self.timezone)
            .finish()
    }
}

/// Connection pool limits applied to every node of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on open connections per node.
    pub max_open_connections: u32,

    /// Connections each node keeps open while idle.
    pub min_idle_connections: u32,

    /// Maximum age of a connection before it is retired (0 = forever).
    pub max_lifetime_secs: u64,

    /// Idle time after which a connection is closed (0 = never).
    pub idle_timeout_secs: u64,

    /// How long a caller waits for a free connection.
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    pub fn max_lifetime(&self) -> Option<Duration> {
        non_zero_secs(self.max_lifetime_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_open_connections: 10,
            min_idle_connections: 0,
            max_lifetime_secs: 30 * 60,
            idle_timeout_secs: 10 * 60,
            acquire_timeout_secs: 30,
        }
    }
}

/// A primary and its replicas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// SQL dialect / driver identifier, e.g. `mysql`.
    pub driver_name: String,
    pub primary: ConnectionSpec,
    /// Read replicas in routing order. May be empty.
    pub replicas: Vec<ConnectionSpec>,
    pub pool: PoolConfig,
}

impl ClusterConfig {
    pub fn new(driver_name: impl Into<String>, primary: ConnectionSpec) -> Self {
        Self {
            driver_name: driver_name.into(),
            primary,
            replicas: Vec::new(),
            pool: PoolConfig::default(),
        }
    }

    pub fn with_replica(mut self, replica: ConnectionSpec) -> Self {
        self.replicas.push(replica);
        self
    }

    /// Total node count: the primary plus every replica.
    pub fn node_count(&self) -> usize {
        1 + self.replicas.len()
    }

    /// Specs in handle order: primary at index 0, then replicas.
    pub fn nodes(&self) -> impl Iterator<Item = &ConnectionSpec> {
        std::iter::once(&self.primary).chain(self.replicas.iter())
    }
}
