//! Shared utilities for cluster integration tests.
//!
//! `MockDriver` opens in-memory nodes keyed by host. Every completed call is
//! recorded with the host that served it, and individual hosts can be made
//! unreachable, slow, or failing.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use sql_cluster::cluster::{ClusterConfig, ConnectionSpec, PoolConfig};
use sql_cluster::driver::named;
use sql_cluster::driver::{
    DataSourceName, Driver, FromRow, NamedArgs, Node, NodeStatement, PoolStatus, TxOptions, Value,
};

pub const PRIMARY: &str = "primary:3306";

pub fn replica_host(n: usize) -> String {
    format!("replica-{}:3306", n)
}

/// A cluster config with `replicas` replicas named `replica-1..`.
pub fn cluster_config(replicas: usize) -> ClusterConfig {
    let spec = |host: &str| ConnectionSpec::new("app", "secret", host, "app");
    (1..=replicas).fold(ClusterConfig::new("mock", spec(PRIMARY)), |config, n| {
        config.with_replica(spec(&replica_host(n)))
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{op} failed on {host}")]
pub struct MockError {
    pub host: String,
    pub op: &'static str,
}

/// A row stamped with the node that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MockRow {
    pub host: String,
    pub query: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockOutcome {
    pub host: String,
    pub rows_affected: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTransaction {
    pub host: String,
    pub options: TxOptions,
}

/// Typed decode target used to exercise `select` / `get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedBy {
    pub host: String,
}

impl FromRow<MockNode> for ServedBy {
    fn from_row(row: &MockRow) -> Result<Self, MockError> {
        if row.query.contains("undecodable") {
            return Err(MockError {
                host: row.host.clone(),
                op: "decode",
            });
        }
        Ok(ServedBy {
            host: row.host.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
struct Faults {
    unreachable: HashSet<String>,
    failing: HashSet<(String, &'static str)>,
    delays: HashMap<(String, &'static str), Duration>,
}

/// Shared record of everything the mock nodes did.
#[derive(Debug, Default)]
pub struct MockState {
    faults: Mutex<Faults>,
    calls: Mutex<Vec<(String, &'static str)>>,
    pools: Mutex<HashMap<String, PoolConfig>>,
}

impl MockState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `open` fails for `host`.
    pub fn unreachable(&self, host: &str) {
        self.faults.lock().unwrap().unreachable.insert(host.to_string());
    }

    /// `op` fails on `host`.
    pub fn fail(&self, host: &str, op: &'static str) {
        self.faults
            .lock()
            .unwrap()
            .failing
            .insert((host.to_string(), op));
    }

    /// `op` on `host` takes at least `delay`.
    pub fn delay(&self, host: &str, op: &'static str, delay: Duration) {
        self.faults
            .lock()
            .unwrap()
            .delays
            .insert((host.to_string(), op), delay);
    }

    /// Hosts that completed `op`, in completion order.
    pub fn hosts(&self, op: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, o)| *o == op)
            .map(|(h, _)| h.clone())
            .collect()
    }

    /// How many times `host` completed `op`.
    pub fn count(&self, host: &str, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, o)| h == host && *o == op)
            .count()
    }

    /// Pool settings `host` was opened with.
    pub fn pool(&self, host: &str) -> Option<PoolConfig> {
        self.pools.lock().unwrap().get(host).cloned()
    }

    fn record(&self, host: &str, op: &'static str) {
        self.calls.lock().unwrap().push((host.to_string(), op));
    }

    async fn perform(&self, host: &str, op: &'static str) -> Result<(), MockError> {
        let (delay, fails) = {
            let faults = self.faults.lock().unwrap();
            let key = (host.to_string(), op);
            (faults.delays.get(&key).copied(), faults.failing.contains(&key))
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.record(host, op);
        if fails {
            Err(MockError {
                host: host.to_string(),
                op,
            })
        } else {
            Ok(())
        }
    }
}

pub struct MockDriver {
    name: String,
    state: Arc<MockState>,
}

impl MockDriver {
    pub fn new(state: &Arc<MockState>) -> Self {
        Self::named("mock", state)
    }

    pub fn named(name: &str, state: &Arc<MockState>) -> Self {
        Self {
            name: name.to_string(),
            state: state.clone(),
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Node = MockNode;

    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self, dsn: &DataSourceName, pool: &PoolConfig) -> Result<MockNode, MockError> {
        let host = dsn.host().to_string();
        let unreachable = self.state.faults.lock().unwrap().unreachable.contains(&host);
        self.state.record(&host, "open");
        if unreachable {
            return Err(MockError { host, op: "open" });
        }
        self.state
            .pools
            .lock()
            .unwrap()
            .insert(host.clone(), pool.clone());
        Ok(MockNode::new(&host, &self.state))
    }
}

pub struct MockNode {
    host: String,
    state: Arc<MockState>,
    closed: AtomicBool,
}

impl MockNode {
    pub fn new(host: &str, state: &Arc<MockState>) -> Self {
        Self {
            host: host.to_string(),
            state: state.clone(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn row(&self, query: &str, params: &[Value]) -> MockRow {
        MockRow {
            host: self.host.clone(),
            query: query.to_string(),
            params: params.to_vec(),
        }
    }

    fn bind(&self, query: &str, args: &NamedArgs) -> Result<(String, Vec<Value>), MockError> {
        let bind_error = |_| MockError {
            host: self.host.clone(),
            op: "bind",
        };
        let compiled = named::compile(query, "?").map_err(bind_error)?;
        let params = compiled.bind(args).map_err(bind_error)?;
        Ok((compiled.sql, params))
    }
}

#[async_trait]
impl Node for MockNode {
    type Error = MockError;
    type Row = MockRow;
    type Outcome = MockOutcome;
    type Transaction = MockTransaction;
    type Statement = MockStatement;

    async fn ping(&self) -> Result<(), MockError> {
        self.state.perform(&self.host, "ping").await
    }

    async fn close(&self) -> Result<(), MockError> {
        self.closed.store(true, Ordering::SeqCst);
        self.state.perform(&self.host, "close").await
    }

    async fn execute(&self, _query: &str, params: &[Value]) -> Result<MockOutcome, MockError> {
        self.state.perform(&self.host, "execute").await?;
        Ok(MockOutcome {
            host: self.host.clone(),
            rows_affected: params.len() as u64,
        })
    }

    async fn named_execute(&self, query: &str, args: &NamedArgs) -> Result<MockOutcome, MockError> {
        let (sql, params) = self.bind(query, args)?;
        self.execute(&sql, &params).await
    }

    async fn query(&self, query: &str, params: &[Value]) -> Result<Vec<MockRow>, MockError> {
        self.state.perform(&self.host, "query").await?;
        Ok(vec![self.row(query, params)])
    }

    async fn query_row(&self, query: &str, params: &[Value]) -> Result<MockRow, MockError> {
        self.state.perform(&self.host, "query_row").await?;
        Ok(self.row(query, params))
    }

    async fn named_query(&self, query: &str, args: &NamedArgs) -> Result<Vec<MockRow>, MockError> {
        let (sql, params) = self.bind(query, args)?;
        self.query(&sql, &params).await
    }

    async fn begin(&self, options: TxOptions) -> Result<MockTransaction, MockError> {
        self.state.perform(&self.host, "begin").await?;
        Ok(MockTransaction {
            host: self.host.clone(),
            options,
        })
    }

    async fn prepare(&self, query: &str) -> Result<MockStatement, MockError> {
        self.state.perform(&self.host, "prepare").await?;
        Ok(MockStatement {
            host: self.host.clone(),
            sql: query.to_string(),
            state: self.state.clone(),
            closed: AtomicBool::new(false),
        })
    }

    fn pool_status(&self) -> PoolStatus {
        let size = if self.is_closed() { 0 } else { 1 };
        PoolStatus {
            size,
            idle: size as usize,
        }
    }
}

pub struct MockStatement {
    host: String,
    sql: String,
    state: Arc<MockState>,
    closed: AtomicBool,
}

impl MockStatement {
    async fn perform(&self, op: &'static str) -> Result<(), MockError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MockError {
                host: self.host.clone(),
                op: "closed",
            });
        }
        self.state.perform(&self.host, op).await
    }
}

#[async_trait]
impl NodeStatement for MockStatement {
    type Error = MockError;
    type Row = MockRow;
    type Outcome = MockOutcome;

    async fn execute(&self, params: &[Value]) -> Result<MockOutcome, MockError> {
        self.perform("stmt_execute").await?;
        Ok(MockOutcome {
            host: self.host.clone(),
            rows_affected: params.len() as u64,
        })
    }

    async fn query(&self, params: &[Value]) -> Result<Vec<MockRow>, MockError> {
        self.perform("stmt_query").await?;
        Ok(vec![MockRow {
            host: self.host.clone(),
            query: self.sql.clone(),
            params: params.to_vec(),
        }])
    }

    async fn query_row(&self, params: &[Value]) -> Result<MockRow, MockError> {
        self.perform("stmt_query_row").await?;
        Ok(MockRow {
            host: self.host.clone(),
            query: self.sql.clone(),
            params: params.to_vec(),
        })
    }

    async fn close(&self) -> Result<(), MockError> {
        self.closed.store(true, Ordering::SeqCst);
        self.state.perform(&self.host, "stmt_close").await
    }
}
