//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the cluster described by a validated [`AppConfig`]
//! - Hand the connection to the composition root, which owns it for the
//!   process lifetime
//!
//! # Design Decisions
//! - Fail fast: an unreachable node aborts startup
//! - No process-wide singleton; callers pass the connection explicitly

use thiserror::Error;

use crate::cluster::{ClusterConnection, ClusterConnector, ConnectError};
use crate::config::AppConfig;
use crate::driver::mysql::{self, MySqlDriver, MySqlNode};
use crate::driver::{Driver, Node};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("unsupported driver `{0}`")]
    UnsupportedDriver(String),

    #[error(transparent)]
    Connect(#[from] ConnectError<mysql::Error>),
}

/// Connect with any driver whose name matches the configuration.
pub async fn connect_with<D>(
    config: &AppConfig,
    driver: D,
) -> Result<ClusterConnection<D::Node>, ConnectError<<D::Node as Node>::Error>>
where
    D: Driver + 'static,
{
    ClusterConnector::new(config.sql.cluster_config())
        .connect(driver)
        .await
}

/// Connect the SQL cluster named in `config`.
pub async fn connect_cluster(config: &AppConfig) -> Result<ClusterConnection<MySqlNode>, StartupError> {
    let driver = MySqlDriver;
    if config.sql.driver_name != driver.name() {
        return Err(StartupError::UnsupportedDriver(config.sql.driver_name.clone()));
    }
    Ok(connect_with(config, driver).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_driver() {
        let mut config = AppConfig::default();
        config.sql.driver_name = "postgres".into();
        let err = connect_cluster(&config).await.unwrap_err();
        assert!(matches!(err, StartupError::UnsupportedDriver(name) if name == "postgres"));
    }
}
