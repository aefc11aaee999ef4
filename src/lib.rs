//! Client-side SQL cluster router.
//!
//! One primary and any number of read replicas behind a single handle:
//! writes and transactions go to the primary, reads rotate over the
//! replicas, and liveness checks, prepare and close fan out to every node.

pub mod cluster;
pub mod config;
pub mod driver;
pub mod health;
pub mod lifecycle;
pub mod observability;

pub use cluster::{ClusterConnection, ClusterConnector, ConnectError, PreparedStatementSet};
pub use config::schema::AppConfig;
pub use driver::{Driver, FromRow, NamedArgs, Node, NodeStatement, Value};
pub use lifecycle::Shutdown;
