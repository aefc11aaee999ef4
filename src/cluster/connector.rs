//! Cluster construction.
//!
//! Opens and pings every node concurrently. Either every node is reachable
//! and a [`ClusterConnection`] is returned, or construction fails with the
//! lowest-index node error and nothing is left open.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cluster::connection::ClusterConnection;
use crate::cluster::error::{ConnectError, NodeRole};
use crate::cluster::round_robin::RoundRobin;
use crate::cluster::scatter::{scatter_each, split_outcomes};
use crate::cluster::spec::ClusterConfig;
use crate::driver::{DataSourceName, Driver, Node};

/// Builds a [`ClusterConnection`] from a [`ClusterConfig`].
///
/// Pool settings given here apply to every node alike.
#[derive(Debug, Clone)]
pub struct ClusterConnector {
    config: ClusterConfig,
}

impl ClusterConnector {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Maximum open connections per node.
    pub fn max_open_connections(mut self, n: u32) -> Self {
        self.config.pool.max_open_connections = n;
        self
    }

    /// Connections each node keeps open while idle.
    pub fn min_idle_connections(mut self, n: u32) -> Self {
        self.config.pool.min_idle_connections = n;
        self
    }

    /// Maximum connection age per node; `None` reuses connections forever.
    pub fn max_connection_lifetime(mut self, lifetime: Option<Duration>) -> Self {
        self.config.pool.max_lifetime_secs = lifetime.map_or(0, |d| d.as_secs().max(1));
        self
    }

    /// Idle time before a pooled connection is closed; `None` keeps it.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.pool.idle_timeout_secs = timeout.map_or(0, |d| d.as_secs().max(1));
        self
    }

    /// Open, verify and wrap every configured node.
    pub async fn connect<D>(
        self,
        driver: D,
    ) -> Result<ClusterConnection<D::Node>, ConnectError<<D::Node as Node>::Error>>
    where
        D: Driver + 'static,
    {
        let config = self.config;
        if config.driver_name.is_empty() {
            return Err(ConnectError::MissingDriverName);
        }
        if config.driver_name != driver.name() {
            return Err(ConnectError::DriverMismatch {
                requested: config.driver_name,
                provided: driver.name().to_string(),
            });
        }

        let dsns: Arc<Vec<DataSourceName>> =
            Arc::new(config.nodes().cloned().map(DataSourceName::new).collect());
        let pool = Arc::new(config.pool.clone());
        let driver = Arc::new(driver);

        tracing::info!(
            driver = %config.driver_name,
            primary = %config.primary.host,
            replicas = config.replicas.len(),
            "Connecting to SQL cluster"
        );
        let started = Instant::now();

        let outcomes = scatter_each(dsns.len(), |i| {
            let driver = driver.clone();
            let dsns = dsns.clone();
            let pool = pool.clone();
            async move {
                let node = driver.open(&dsns[i], &pool).await?;
                if let Err(e) = node.ping().await {
                    if let Err(close_err) = node.close().await {
                        tracing::debug!(
                            index = i,
                            error = %close_err,
                            "Failed to close node after failed ping"
                        );
                    }
                    return Err(e);
                }
                Ok(node)
            }
        })
        .await;

        let (nodes, failure) = split_outcomes(outcomes);
        if let Some((index, source)) = failure {
            let role = NodeRole::of(index);
            tracing::error!(
                index,
                role = %role,
                dsn = ?dsns[index],
                error = %source,
                "SQL cluster node unreachable"
            );
            release(nodes).await;
            return Err(ConnectError::Node {
                index,
                role,
                source,
            });
        }

        tracing::info!(
            nodes = nodes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Connected to SQL cluster"
        );

        Ok(ClusterConnection::assemble(
            config.driver_name,
            nodes,
            RoundRobin::starting_at(rand::random()),
        ))
    }
}

/// Close nodes opened before a sibling failed.
async fn release<N: Node>(nodes: Vec<N>) {
    let nodes: Vec<_> = nodes.into_iter().map(Arc::new).collect();
    let outcomes = scatter_each(nodes.len(), |i| {
        let node = nodes[i].clone();
        async move { node.close().await }
    })
    .await;
    for e in outcomes.into_iter().filter_map(Result::err) {
        tracing::debug!(error = %e, "Failed to release node after aborted connect");
    }
}
