//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (monitor.rs)
//!     → ClusterConnection::ping_nodes_within(timeout), one deadline per node
//!     → log transitions, set sql_cluster_node_up
//! ```
//!
//! # Design Decisions
//! - Observation only: routing never skips a node
//! - Every node gets its own ping deadline; a slow node never marks others down
//! - Stops on the shutdown broadcast

pub mod monitor;

pub use monitor::HealthMonitor;
