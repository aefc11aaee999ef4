//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sql_cluster_routed_total` (counter): calls routed, by role and node index
//! - `sql_cluster_fanout_failures_total` (counter): failed fan-outs, by operation
//! - `sql_cluster_node_up` (gauge): 1=answering pings, 0=not
//!
//! # Design Decisions
//! - Updates go through the `metrics` facade; without an installed recorder
//!   they are no-ops
//! - Node labels are indices, never hosts or credentials

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::cluster::error::NodeRole;

/// Install the Prometheus recorder with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count one call routed to `node`.
pub fn record_route(role: NodeRole, node: usize) {
    counter!(
        "sql_cluster_routed_total",
        "role" => role.as_str(),
        "node" => node.to_string()
    )
    .increment(1);
}

/// Count a fan-out whose combined result was an error.
pub fn record_fanout_failure(operation: &'static str) {
    counter!("sql_cluster_fanout_failures_total", "operation" => operation).increment(1);
}

/// Record the latest ping outcome for `node`.
pub fn record_node_up(node: usize, up: bool) {
    gauge!("sql_cluster_node_up", "node" => node.to_string()).set(if up { 1.0 } else { 0.0 });
}
