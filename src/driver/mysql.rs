//! MySQL driver backed by `sqlx`.
//!
//! # Responsibilities
//! - Open one `MySqlPool` per node from its [`DataSourceName`]
//! - Bind [`Value`] parameters and compile named parameters to `?`
//! - Provide transactions that honour [`TxOptions`]
//!
//! # Design Decisions
//! - Prepared statements are validated on the server at prepare time and
//!   re-executed through the per-connection statement cache afterwards
//! - A transaction owns its pooled connection; dropping it unfinished
//!   discards the connection instead of returning it mid-transaction

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sqlx::mysql::{
    MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlPool,
    MySqlPoolOptions, MySqlQueryResult, MySqlRow,
};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Connection, Executor};
use thiserror::Error;

use crate::cluster::spec::PoolConfig;
use crate::driver::named::{self, BindError};
use crate::driver::{
    DataSourceName, Driver, FromRow, NamedArgs, Node, NodeStatement, PoolLimits, PoolStatus,
    TxOptions, Value,
};

/// MySQL server error number for a duplicate key.
pub const ER_DUP_ENTRY: u16 = 1062;

/// Errors from the MySQL driver.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("transaction already committed or rolled back")]
    TransactionFinished,

    #[error("prepared statement is closed")]
    StatementClosed,
}

/// True when `err` is a unique-key violation.
pub fn is_duplicate_entry(err: &Error) -> bool {
    match err {
        Error::Sqlx(sqlx::Error::Database(db)) => db
            .try_downcast_ref::<MySqlDatabaseError>()
            .is_some_and(|e| e.number() == ER_DUP_ENTRY),
        _ => false,
    }
}

type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

fn bind_all<'q>(mut query: MySqlQuery<'q>, params: &[Value]) -> MySqlQuery<'q> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::UInt(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.clone()),
            Value::Bytes(v) => query.bind(v.clone()),
        };
    }
    query
}

fn compile_named(query: &str, args: &NamedArgs) -> Result<(String, Vec<Value>), Error> {
    let compiled = named::compile(query, "?")?;
    let values = compiled.bind(args)?;
    Ok((compiled.sql, values))
}

/// Value for the session `time_zone`.
///
/// UTC is sent as an offset because named zones need the server's time zone
/// tables loaded (error 1298 otherwise). Other names pass through unchanged
/// and carry that requirement.
fn session_time_zone(tz: &str) -> String {
    match tz.trim() {
        t if t.eq_ignore_ascii_case("utc") || t.eq_ignore_ascii_case("gmt") || t == "Z" => {
            "+00:00".to_string()
        }
        t => t.to_string(),
    }
}

/// Opens [`MySqlNode`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDriver;

#[async_trait]
impl Driver for MySqlDriver {
    type Node = MySqlNode;

    fn name(&self) -> &str {
        "mysql"
    }

    async fn open(&self, dsn: &DataSourceName, pool: &PoolConfig) -> Result<MySqlNode, Error> {
        let spec = dsn.spec();
        let (host, port) = dsn.host_and_port();

        let mut options = MySqlConnectOptions::new()
            .host(host)
            .username(&spec.user)
            .password(&spec.password)
            .database(&spec.database);
        if let Some(port) = port {
            options = options.port(port);
        }
        if spec.parse_time && !spec.timezone.is_empty() {
            options = options.timezone(Some(session_time_zone(&spec.timezone)));
        }

        let limits = PoolLimits::from(pool);
        let pool = MySqlPoolOptions::new()
            .max_connections(limits.max_open)
            .min_connections(limits.min_idle)
            .max_lifetime(limits.max_lifetime)
            .idle_timeout(limits.idle_timeout)
            .acquire_timeout(limits.acquire_timeout)
            .connect_with(options)
            .await?;

        tracing::debug!(dsn = ?dsn, max_open = limits.max_open, "MySQL pool opened");
        Ok(MySqlNode { pool })
    }
}

/// One MySQL server behind a connection pool.
#[derive(Debug, Clone)]
pub struct MySqlNode {
    pool: MySqlPool,
}

impl MySqlNode {
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for code that needs `sqlx` directly.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl Node for MySqlNode {
    type Error = Error;
    type Row = MySqlRow;
    type Outcome = MySqlQueryResult;
    type Transaction = MySqlTransaction;
    type Statement = MySqlNodeStatement;

    async fn ping(&self) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.pool.close().await;
        Ok(())
    }

    async fn execute(&self, query: &str, params: &[Value]) -> Result<MySqlQueryResult, Error> {
        Ok(bind_all(sqlx::query(query), params).execute(&self.pool).await?)
    }

    async fn named_execute(&self, query: &str, args: &NamedArgs) -> Result<MySqlQueryResult, Error> {
        let (sql, values) = compile_named(query, args)?;
        Ok(bind_all(sqlx::query(&sql), &values).execute(&self.pool).await?)
    }

    async fn query(&self, query: &str, params: &[Value]) -> Result<Vec<MySqlRow>, Error> {
        Ok(bind_all(sqlx::query(query), params).fetch_all(&self.pool).await?)
    }

    async fn query_row(&self, query: &str, params: &[Value]) -> Result<MySqlRow, Error> {
        Ok(bind_all(sqlx::query(query), params).fetch_one(&self.pool).await?)
    }

    async fn named_query(&self, query: &str, args: &NamedArgs) -> Result<Vec<MySqlRow>, Error> {
        let (sql, values) = compile_named(query, args)?;
        Ok(bind_all(sqlx::query(&sql), &values).fetch_all(&self.pool).await?)
    }

    async fn begin(&self, options: TxOptions) -> Result<MySqlTransaction, Error> {
        let mut conn = self.pool.acquire().await?;
        // Applies to the next transaction on this session only.
        if let Some(characteristics) = options.characteristics() {
            let set = format!("SET TRANSACTION {}", characteristics);
            Executor::execute(&mut *conn, set.as_str()).await?;
        }
        Executor::execute(&mut *conn, "START TRANSACTION").await?;
        Ok(MySqlTransaction { conn: Some(conn) })
    }

    async fn prepare(&self, query: &str) -> Result<MySqlNodeStatement, Error> {
        Executor::prepare(&self.pool, query).await?;
        Ok(MySqlNodeStatement::new(self.pool.clone(), query))
    }

    fn pool_status(&self) -> PoolStatus {
        PoolStatus {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }
}

/// A statement prepared on one MySQL node. Unusable once closed.
#[derive(Debug)]
pub struct MySqlNodeStatement {
    pool: MySqlPool,
    sql: String,
    closed: AtomicBool,
}

impl MySqlNodeStatement {
    fn new(pool: MySqlPool, sql: &str) -> Self {
        Self {
            pool,
            sql: sql.to_owned(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn open_sql(&self) -> Result<&str, Error> {
        if self.is_closed() {
            return Err(Error::StatementClosed);
        }
        Ok(&self.sql)
    }
}

#[async_trait]
impl NodeStatement for MySqlNodeStatement {
    type Error = Error;
    type Row = MySqlRow;
    type Outcome = MySqlQueryResult;

    async fn execute(&self, params: &[Value]) -> Result<MySqlQueryResult, Error> {
        let sql = self.open_sql()?;
        Ok(bind_all(sqlx::query(sql), params).execute(&self.pool).await?)
    }

    async fn query(&self, params: &[Value]) -> Result<Vec<MySqlRow>, Error> {
        let sql = self.open_sql()?;
        Ok(bind_all(sqlx::query(sql), params).fetch_all(&self.pool).await?)
    }

    async fn query_row(&self, params: &[Value]) -> Result<MySqlRow, Error> {
        let sql = self.open_sql()?;
        Ok(bind_all(sqlx::query(sql), params).fetch_one(&self.pool).await?)
    }

    /// Mark the statement closed. Server-side handles live in each
    /// connection's statement cache and are released with the connection.
    async fn close(&self) -> Result<(), Error> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// A transaction pinned to one pooled connection on the primary.
#[derive(Debug)]
pub struct MySqlTransaction {
    conn: Option<PoolConnection<MySql>>,
}

impl MySqlTransaction {
    fn connection(&mut self) -> Result<&mut MySqlConnection, Error> {
        self.conn.as_deref_mut().ok_or(Error::TransactionFinished)
    }

    pub async fn execute(&mut self, query: &str, params: &[Value]) -> Result<MySqlQueryResult, Error> {
        let conn = self.connection()?;
        Ok(bind_all(sqlx::query(query), params).execute(conn).await?)
    }

    pub async fn named_execute(
        &mut self,
        query: &str,
        args: &NamedArgs,
    ) -> Result<MySqlQueryResult, Error> {
        let (sql, values) = compile_named(query, args)?;
        let conn = self.connection()?;
        Ok(bind_all(sqlx::query(&sql), &values).execute(conn).await?)
    }

    pub async fn query(&mut self, query: &str, params: &[Value]) -> Result<Vec<MySqlRow>, Error> {
        let conn = self.connection()?;
        Ok(bind_all(sqlx::query(query), params).fetch_all(conn).await?)
    }

    pub async fn query_row(&mut self, query: &str, params: &[Value]) -> Result<MySqlRow, Error> {
        let conn = self.connection()?;
        Ok(bind_all(sqlx::query(query), params).fetch_one(conn).await?)
    }

    pub async fn commit(mut self) -> Result<(), Error> {
        self.finish("COMMIT").await
    }

    pub async fn rollback(mut self) -> Result<(), Error> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&mut self, statement: &str) -> Result<(), Error> {
        let mut conn = self.conn.take().ok_or(Error::TransactionFinished)?;
        match Executor::execute(&mut *conn, statement).await {
            Ok(_) => Ok(()),
            Err(e) => {
                drop(conn.detach());
                Err(e.into())
            }
        }
    }
}

impl Drop for MySqlTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::warn!("Transaction dropped without commit or rollback, discarding connection");
            drop(conn.detach());
        }
    }
}

impl<T> FromRow<MySqlNode> for T
where
    T: for<'r> sqlx::FromRow<'r, MySqlRow>,
{
    fn from_row(row: &MySqlRow) -> Result<Self, Error> {
        Ok(<T as sqlx::FromRow<'_, MySqlRow>>::from_row(row)?)
    }
}
