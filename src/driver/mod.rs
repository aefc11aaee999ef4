//! Driver layer: the per-node primitives the cluster router is built on.
//!
//! # Data Flow
//! ```text
//! ClusterConnector
//!     → Driver::open(dsn, pool)      (one call per node, concurrently)
//!     → Node::ping
//!
//! ClusterConnection
//!     → Node::{execute, begin, ...}  (primary)
//!     → Node::{query, query_row}     (round-robin replica)
//!     → Node::{ping, close, prepare} (every node)
//! ```
//!
//! # Design Decisions
//! - A node owns its own connection pool; the router never reopens it
//! - Results and errors are driver-native and pass through untouched
//! - Row mapping is a generic decode step ([`FromRow`]), not part of routing

use std::time::Duration;

use async_trait::async_trait;

use crate::cluster::spec::PoolConfig;

pub mod dsn;
pub mod mysql;
pub mod named;
pub mod value;

pub use dsn::DataSourceName;
pub use value::{NamedArgs, Value};

/// Opens nodes for one SQL dialect.
#[async_trait]
pub trait Driver: Send + Sync {
    type Node: Node;

    /// Driver identifier matched against `ClusterConfig::driver_name`.
    fn name(&self) -> &str;

    /// Open a pooled handle to one endpoint. Implementations should not
    /// return before the pool is usable; the caller pings afterwards.
    async fn open(
        &self,
        dsn: &DataSourceName,
        pool: &PoolConfig,
    ) -> Result<Self::Node, <Self::Node as Node>::Error>;
}

/// A live, pool-managed handle bound to one physical database.
#[async_trait]
pub trait Node: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;
    type Row: Send + 'static;
    /// Summary of a statement that returns no rows.
    type Outcome: Send + 'static;
    type Transaction: Send + 'static;
    type Statement: NodeStatement<Error = Self::Error, Row = Self::Row, Outcome = Self::Outcome>;

    async fn ping(&self) -> Result<(), Self::Error>;

    /// Release every pooled connection. The node is unusable afterwards.
    async fn close(&self) -> Result<(), Self::Error>;

    async fn execute(&self, query: &str, params: &[Value]) -> Result<Self::Outcome, Self::Error>;

    async fn named_execute(
        &self,
        query: &str,
        args: &NamedArgs,
    ) -> Result<Self::Outcome, Self::Error>;

    async fn query(&self, query: &str, params: &[Value]) -> Result<Vec<Self::Row>, Self::Error>;

    /// Fetch exactly one row. An empty result is the driver's own
    /// "no rows" error.
    async fn query_row(&self, query: &str, params: &[Value]) -> Result<Self::Row, Self::Error>;

    async fn named_query(
        &self,
        query: &str,
        args: &NamedArgs,
    ) -> Result<Vec<Self::Row>, Self::Error>;

    async fn begin(&self, options: TxOptions) -> Result<Self::Transaction, Self::Error>;

    async fn prepare(&self, query: &str) -> Result<Self::Statement, Self::Error>;

    fn pool_status(&self) -> PoolStatus;
}

/// A statement prepared on one node.
#[async_trait]
pub trait NodeStatement: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;
    type Row: Send + 'static;
    type Outcome: Send + 'static;

    async fn execute(&self, params: &[Value]) -> Result<Self::Outcome, Self::Error>;

    async fn query(&self, params: &[Value]) -> Result<Vec<Self::Row>, Self::Error>;

    async fn query_row(&self, params: &[Value]) -> Result<Self::Row, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;
}

/// Decode a typed value from a row produced by node type `N`.
pub trait FromRow<N: Node>: Sized {
    fn from_row(row: &N::Row) -> Result<Self, N::Error>;
}

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Options for starting a transaction. The default uses the driver's
/// isolation level and a read-write transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
}

impl TxOptions {
    pub fn isolation(level: IsolationLevel) -> Self {
        Self {
            isolation: Some(level),
            read_only: false,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Characteristics clause for `SET TRANSACTION`, if any is non-default.
    pub fn characteristics(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(level) = self.isolation {
            parts.push(format!("ISOLATION LEVEL {}", level.as_sql()));
        }
        if self.read_only {
            parts.push("READ ONLY".to_string());
        }
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

/// Point-in-time pool occupancy for one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatus {
    /// Open connections, idle or in use.
    pub size: u32,
    pub idle: usize,
}

/// Resolved pool settings in driver terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolLimits {
    pub max_open: u32,
    pub min_idle: u32,
    pub max_lifetime: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    pub acquire_timeout: Duration,
}

impl From<&PoolConfig> for PoolLimits {
    fn from(config: &PoolConfig) -> Self {
        Self {
            max_open: config.max_open_connections,
            min_idle: config.min_idle_connections.min(config.max_open_connections),
            max_lifetime: config.max_lifetime(),
            idle_timeout: config.idle_timeout(),
            acquire_timeout: config.acquire_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_characteristics() {
        assert_eq!(TxOptions::default().characteristics(), None);
        assert_eq!(
            TxOptions::isolation(IsolationLevel::Serializable)
                .read_only()
                .characteristics()
                .as_deref(),
            Some("ISOLATION LEVEL SERIALIZABLE, READ ONLY")
        );
        assert_eq!(
            TxOptions::default().read_only().characteristics().as_deref(),
            Some("READ ONLY")
        );
    }

    #[test]
    fn test_pool_limits_clamp_idle() {
        let config = PoolConfig {
            max_open_connections: 4,
            min_idle_connections: 9,
            ..PoolConfig::default()
        };
        let limits = PoolLimits::from(&config);
        assert_eq!(limits.min_idle, 4);
        assert_eq!(limits.max_open, 4);
    }
}
