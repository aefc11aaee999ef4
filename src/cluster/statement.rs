//! Prepared statements across every node.

use std::fmt;
use std::sync::Arc;

use crate::cluster::error::NodeRole;
use crate::cluster::round_robin::RoundRobin;
use crate::cluster::scatter::{scatter, scatter_each};
use crate::driver::{Node, NodeStatement, Value};
use crate::observability::metrics;

/// One prepared statement per node, index-aligned with the cluster handles.
///
/// `execute` runs on the primary's statement; `query` and `query_row` run on
/// a replica's statement chosen by the cluster's own round-robin cursor, so
/// prepared and ad-hoc reads share one rotation.
pub struct PreparedStatementSet<N: Node> {
    statements: Vec<Arc<N::Statement>>,
    cursor: Arc<RoundRobin>,
}

impl<N: Node> fmt::Debug for PreparedStatementSet<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatementSet")
            .field("statements", &self.statements.len())
            .finish()
    }
}

impl<N: Node> PreparedStatementSet<N> {
    pub(crate) fn new(statements: Vec<N::Statement>, cursor: Arc<RoundRobin>) -> Self {
        Self {
            statements: statements.into_iter().map(Arc::new).collect(),
            cursor,
        }
    }

    /// Close statements left over from a failed prepare, ignoring errors.
    pub(crate) async fn discard(statements: Vec<N::Statement>) {
        let statements: Vec<_> = statements.into_iter().map(Arc::new).collect();
        let outcomes = scatter_each(statements.len(), |i| {
            let stmt = statements[i].clone();
            async move { stmt.close().await }
        })
        .await;
        for e in outcomes.into_iter().filter_map(Result::err) {
            tracing::debug!(error = %e, "Failed to close leftover statement");
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    fn replica(&self) -> &N::Statement {
        let index = self.cursor.select(self.len());
        metrics::record_route(NodeRole::of(index), index);
        &self.statements[index]
    }

    /// Execute on the primary.
    pub async fn execute(&self, params: &[Value]) -> Result<N::Outcome, N::Error> {
        metrics::record_route(NodeRole::Primary, 0);
        self.statements[0].execute(params).await
    }

    /// Query a replica.
    pub async fn query(&self, params: &[Value]) -> Result<Vec<N::Row>, N::Error> {
        self.replica().query(params).await
    }

    /// Query a replica for exactly one row.
    pub async fn query_row(&self, params: &[Value]) -> Result<N::Row, N::Error> {
        self.replica().query_row(params).await
    }

    /// Close every statement concurrently, reporting the first failure by
    /// index.
    pub async fn close(&self) -> Result<(), N::Error> {
        let result = scatter(self.len(), |i| {
            let stmt = self.statements[i].clone();
            async move { stmt.close().await }
        })
        .await;
        if result.is_err() {
            metrics::record_fanout_failure("statement_close");
        }
        result
    }
}
