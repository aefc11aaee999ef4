//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Every node must carry user, password, host and database
//! - Validate value ranges (pool sizes, intervals, log level)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{AppConfig, SqlConnConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("sql.driver_name must not be empty")]
    MissingDriverName,

    #[error("{node}: {field} not found")]
    MissingField { node: String, field: &'static str },

    #[error("sql.timezone must be set when sql.parse_time is enabled")]
    MissingTimezone,

    #[error("sql.pool.max_open_connections must be greater than 0")]
    ZeroPoolSize,

    #[error("sql.pool.min_idle_connections ({min_idle}) exceeds max_open_connections ({max_open})")]
    IdleAboveOpen { min_idle: u32, max_open: u32 },

    #[error("health_check.{0} must be greater than 0")]
    ZeroHealthCheckDuration(&'static str),

    #[error("observability.log_level `{0}` is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn check_node(node: &str, conn: &SqlConnConfig, errors: &mut Vec<ValidationError>) {
    let fields = [
        ("user", &conn.user),
        ("password", &conn.password),
        ("host", &conn.host),
        ("db", &conn.db),
    ];
    for (field, value) in fields {
        if value.trim().is_empty() {
            errors.push(ValidationError::MissingField {
                node: node.to_string(),
                field,
            });
        }
    }
}

/// Validate a loaded configuration, collecting every problem.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let sql = &config.sql;

    if sql.driver_name.trim().is_empty() {
        errors.push(ValidationError::MissingDriverName);
    }
    if sql.parse_time && sql.timezone.trim().is_empty() {
        errors.push(ValidationError::MissingTimezone);
    }

    check_node("sql.primary", &sql.primary, &mut errors);
    for (i, replica) in sql.replicas.iter().enumerate() {
        check_node(&format!("sql.replicas[{}]", i), replica, &mut errors);
    }

    if sql.pool.max_open_connections == 0 {
        errors.push(ValidationError::ZeroPoolSize);
    } else if sql.pool.min_idle_connections > sql.pool.max_open_connections {
        errors.push(ValidationError::IdleAboveOpen {
            min_idle: sql.pool.min_idle_connections,
            max_open: sql.pool.max_open_connections,
        });
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::ZeroHealthCheckDuration("interval_secs"));
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::ZeroHealthCheckDuration("timeout_secs"));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
