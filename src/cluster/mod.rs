//! Primary/replica cluster routing.
//!
//! # Data Flow
//! ```text
//! ClusterConfig
//!     → connector.rs (open + ping every node via scatter.rs)
//!     → ClusterConnection
//!
//! Application call:
//!     write / transaction  → handle 0 (primary)
//!     read                 → round_robin.rs picks handle 1..n
//!     ping / close / prepare → scatter.rs over every handle
//! ```
//!
//! # Design Decisions
//! - No partial clusters: every node must answer at startup
//! - No retries, no health-based exclusion, no error translation
//! - Fan-out always attempts every node and reports the lowest-index error
//! - Prepared statements share the connection's round-robin cursor

pub mod connection;
pub mod connector;
pub mod error;
pub mod round_robin;
pub mod scatter;
pub mod spec;
pub mod statement;

pub use connection::ClusterConnection;
pub use connector::ClusterConnector;
pub use error::{ConnectError, NodeRole};
pub use scatter::scatter;
pub use spec::{ClusterConfig, ConnectionSpec, PoolConfig};
pub use statement::PreparedStatementSet;
