//! Periodic cluster liveness checks.
//!
//! # Responsibilities
//! - Periodically ping every node of a [`ClusterConnection`]
//! - Log up/down transitions and export `sql_cluster_node_up`
//!
//! Results are informational only: a node that stops answering keeps
//! receiving its share of routed calls.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::cluster::error::NodeRole;
use crate::cluster::ClusterConnection;
use crate::config::HealthCheckConfig;
use crate::driver::Node;
use crate::observability::metrics;

pub struct HealthMonitor<N: Node> {
    cluster: ClusterConnection<N>,
    config: HealthCheckConfig,
    last: Vec<Option<bool>>,
}

impl<N: Node> HealthMonitor<N> {
    pub fn new(cluster: ClusterConnection<N>, config: HealthCheckConfig) -> Self {
        let last = vec![None; cluster.len()];
        Self {
            cluster,
            config,
            last,
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Cluster health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            timeout = self.config.timeout_secs,
            nodes = self.cluster.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Ping every node once. Returns whether each node answered in time.
    pub async fn check_all(&mut self) -> Vec<bool> {
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let up: Vec<bool> = self
            .cluster
            .ping_nodes_within(timeout)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| match outcome {
                Some(Ok(())) => true,
                Some(Err(e)) => {
                    tracing::warn!(
                        index,
                        role = %NodeRole::of(index),
                        error = %e,
                        "Health check failed: ping error"
                    );
                    false
                }
                None => {
                    tracing::warn!(
                        index,
                        role = %NodeRole::of(index),
                        timeout_secs = self.config.timeout_secs,
                        "Health check failed: timeout"
                    );
                    false
                }
            })
            .collect();

        for (index, &now) in up.iter().enumerate() {
            match self.last[index] {
                Some(before) if before == now => {}
                Some(_) if now => {
                    tracing::info!(index, role = %NodeRole::of(index), "Node recovered");
                }
                Some(_) => {
                    tracing::warn!(index, role = %NodeRole::of(index), "Node stopped answering pings");
                }
                None => {}
            }
            self.last[index] = Some(now);
            metrics::record_node_up(index, now);
        }

        up
    }
}
