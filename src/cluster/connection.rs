//! Primary/replica routing over a fixed set of node handles.
//!
//! # Responsibilities
//! - Send writes and transactions to the primary (handle 0)
//! - Spread reads over replicas (handles 1..n) in round-robin order
//! - Fan liveness checks, prepare and close out to every handle
//!
//! # Design Decisions
//! - The handle list never changes after construction
//! - The round-robin cursor is the only mutable state, updated atomically
//! - Driver results and errors pass through untouched

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cluster::error::NodeRole;
use crate::cluster::round_robin::RoundRobin;
use crate::cluster::scatter::{scatter, scatter_each, split_outcomes};
use crate::cluster::statement::PreparedStatementSet;
use crate::driver::{FromRow, NamedArgs, Node, PoolStatus, TxOptions, Value};
use crate::observability::metrics;

struct Inner<N: Node> {
    driver_name: String,
    /// Index 0 is the primary; the rest are replicas in config order.
    nodes: Vec<Arc<N>>,
    cursor: Arc<RoundRobin>,
}

/// A connection to a primary and its read replicas.
///
/// Cloning is cheap and every clone shares the same handles and cursor.
pub struct ClusterConnection<N: Node> {
    inner: Arc<Inner<N>>,
}

impl<N: Node> Clone for ClusterConnection<N> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<N: Node> fmt::Debug for ClusterConnection<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConnection")
            .field("driver_name", &self.inner.driver_name)
            .field("nodes", &self.inner.nodes.len())
            .finish()
    }
}

impl<N: Node> ClusterConnection<N> {
    /// Wrap already opened handles. Use
    /// [`ClusterConnector`](crate::cluster::ClusterConnector) to open them
    /// from configuration.
    pub fn new(driver_name: impl Into<String>, primary: N, replicas: Vec<N>) -> Self {
        let nodes = std::iter::once(primary).chain(replicas).collect();
        Self::assemble(driver_name.into(), nodes, RoundRobin::new())
    }

    pub(crate) fn assemble(driver_name: String, nodes: Vec<N>, cursor: RoundRobin) -> Self {
        debug_assert!(!nodes.is_empty(), "a cluster needs a primary");
        Self {
            inner: Arc::new(Inner {
                driver_name,
                nodes: nodes.into_iter().map(Arc::new).collect(),
                cursor: Arc::new(cursor),
            }),
        }
    }

    pub fn driver_name(&self) -> &str {
        &self.inner.driver_name
    }

    /// Number of handles, primary included.
    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    pub fn replica_count(&self) -> usize {
        self.len() - 1
    }

    /// The handle at `index`, without routing.
    pub fn node(&self, index: usize) -> Option<&N> {
        self.inner.nodes.get(index).map(Arc::as_ref)
    }

    /// The primary handle.
    pub fn primary(&self) -> &N {
        metrics::record_route(NodeRole::Primary, 0);
        &self.inner.nodes[0]
    }

    /// The next replica in rotation, or the primary when there are none.
    pub fn replica(&self) -> &N {
        let index = self.inner.cursor.select(self.len());
        metrics::record_route(NodeRole::of(index), index);
        &self.inner.nodes[index]
    }

    // --- Primary ---

    /// Execute a statement that returns no rows.
    pub async fn execute(&self, query: &str, params: &[Value]) -> Result<N::Outcome, N::Error> {
        self.primary().execute(query, params).await
    }

    /// Execute a statement with `:name` placeholders.
    pub async fn named_execute(
        &self,
        query: &str,
        args: &NamedArgs,
    ) -> Result<N::Outcome, N::Error> {
        self.primary().named_execute(query, args).await
    }

    /// Start a transaction with the driver's default isolation level.
    pub async fn begin(&self) -> Result<N::Transaction, N::Error> {
        self.primary().begin(TxOptions::default()).await
    }

    /// Start a transaction with explicit isolation and access mode.
    pub async fn begin_with(&self, options: TxOptions) -> Result<N::Transaction, N::Error> {
        self.primary().begin(options).await
    }

    // --- Replicas ---

    pub async fn query(&self, query: &str, params: &[Value]) -> Result<Vec<N::Row>, N::Error> {
        self.replica().query(query, params).await
    }

    /// Fetch exactly one row. A missing row is the driver's own error.
    pub async fn query_row(&self, query: &str, params: &[Value]) -> Result<N::Row, N::Error> {
        self.replica().query_row(query, params).await
    }

    pub async fn named_query(
        &self,
        query: &str,
        args: &NamedArgs,
    ) -> Result<Vec<N::Row>, N::Error> {
        self.replica().named_query(query, args).await
    }

    /// Fetch all rows and decode each into `T`.
    pub async fn select<T: FromRow<N>>(
        &self,
        query: &str,
        params: &[Value],
    ) -> Result<Vec<T>, N::Error> {
        let rows = self.query(query, params).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Fetch exactly one row and decode it into `T`.
    pub async fn get<T: FromRow<N>>(&self, query: &str, params: &[Value]) -> Result<T, N::Error> {
        let row = self.query_row(query, params).await?;
        T::from_row(&row)
    }

    // --- Every node ---

    /// Check every node, reporting the first failure by index.
    pub async fn ping(&self) -> Result<(), N::Error> {
        let result = scatter(self.len(), |i| {
            let node = self.inner.nodes[i].clone();
            async move { node.ping().await }
        })
        .await;
        if result.is_err() {
            metrics::record_fanout_failure("ping");
        }
        result
    }

    /// Check every node and return each outcome in handle order.
    pub async fn ping_nodes(&self) -> Vec<Result<(), N::Error>> {
        scatter_each(self.len(), |i| {
            let node = self.inner.nodes[i].clone();
            async move { node.ping().await }
        })
        .await
    }

    /// Check every node, giving each its own `deadline`.
    ///
    /// `None` marks a node that did not answer in time; its ping is
    /// abandoned without affecting the others.
    pub async fn ping_nodes_within(&self, deadline: Duration) -> Vec<Option<Result<(), N::Error>>> {
        scatter_each(self.len(), |i| {
            let node = self.inner.nodes[i].clone();
            async move { Ok::<_, Infallible>(tokio::time::timeout(deadline, node.ping()).await.ok()) }
        })
        .await
        .into_iter()
        .map(|outcome| match outcome {
            Ok(answer) => answer,
            Err(never) => match never {},
        })
        .collect()
    }

    /// Close every node concurrently. Every node is closed even when some
    /// fail; the first failure by index is reported.
    pub async fn close(&self) -> Result<(), N::Error> {
        let result = scatter(self.len(), |i| {
            let node = self.inner.nodes[i].clone();
            async move { node.close().await }
        })
        .await;
        match &result {
            Ok(()) => tracing::info!(nodes = self.len(), "SQL cluster closed"),
            Err(e) => {
                metrics::record_fanout_failure("close");
                tracing::warn!(error = %e, "SQL cluster closed with errors");
            }
        }
        result
    }

    /// Prepare `query` on every node concurrently.
    ///
    /// If any node fails, statements prepared on the others are closed and
    /// the first failure by index is returned.
    pub async fn prepare(&self, query: &str) -> Result<PreparedStatementSet<N>, N::Error> {
        let query: Arc<str> = Arc::from(query);
        let outcomes = scatter_each(self.len(), |i| {
            let node = self.inner.nodes[i].clone();
            let query = query.clone();
            async move { node.prepare(&query).await }
        })
        .await;

        let (statements, failure) = split_outcomes(outcomes);
        if let Some((index, e)) = failure {
            metrics::record_fanout_failure("prepare");
            tracing::debug!(index, "Prepare failed, releasing statements on other nodes");
            PreparedStatementSet::<N>::discard(statements).await;
            return Err(e);
        }

        Ok(PreparedStatementSet::new(
            statements,
            self.inner.cursor.clone(),
        ))
    }

    /// Pool occupancy of every node in handle order.
    pub fn pool_status(&self) -> Vec<PoolStatus> {
        self.inner.nodes.iter().map(|n| n.pool_status()).collect()
    }
}
