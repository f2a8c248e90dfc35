//! MySQL connection pool and statement execution.
//!
//! This module provides:
//! - `Database`: an owned pool handle with an explicit open/close lifecycle
//! - `PooledConnection`: a checked-out connection that returns itself to the pool on drop
//! - `Database::execute_query`: one parameterized statement on one connection
//! - `Database::execute_transaction`: an ordered batch of statements, all or nothing
//!
//! There is no global pool. Callers create a `Database`, pass `&Database` to
//! whatever needs it, and call `close()` when done.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rust_decimal::Decimal;
use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Connection, FromRow, MySql};

use crate::{config::DbConfig, error::AppError};

/// Type alias for MySQL connection pool.
pub type DbPool = MySqlPool;

/// A bind value for a parameterized statement.
///
/// Statements are built at runtime (fixture lists, table names from a fixed
/// order), so parameters are carried as values rather than as Rust types
/// known to the query macro.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Bool(bool),
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One statement of a transaction batch.
///
/// # Example
///
/// ```
/// use banking_testkit::db::{SqlValue, Statement};
///
/// let stmt = Statement::new("UPDATE accounts SET balance = ? WHERE account_id = ?")
///     .bind(45000)
///     .bind(1001);
/// assert_eq!(stmt.params, vec![SqlValue::Int(45000), SqlValue::Int(1001)]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append a positional parameter (`?` placeholders, in order).
    pub fn bind(mut self, value: impl Into<SqlValue>) -> Self {
        self.params.push(value.into());
        self
    }
}

/// Counters for connections handed out by a `Database`.
///
/// `acquired` is bumped when `acquire()` succeeds, `released` when the
/// resulting `PooledConnection` is dropped. Outside of an in-flight call the
/// two are equal.
#[derive(Debug, Default)]
pub struct LeaseStats {
    acquired: AtomicU64,
    released: AtomicU64,
}

impl LeaseStats {
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    /// Connections currently checked out.
    pub fn outstanding(&self) -> u64 {
        self.acquired().saturating_sub(self.released())
    }
}

/// A connection checked out of the pool.
///
/// Dereferences to `MySqlConnection`, so it can be passed to sqlx as
/// `&mut *conn`. Dropping it returns the connection to the pool on every exit
/// path, including `?` and panics.
#[derive(Debug)]
pub struct PooledConnection {
    conn: PoolConnection<MySql>,
    stats: Arc<LeaseStats>,
}

impl Deref for PooledConnection {
    type Target = MySqlConnection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.stats.released.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("Database connection released");
    }
}

/// Owned handle to the MySQL connection pool.
///
/// Cloning is cheap and shares the same pool, closed flag and counters.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
    closed: Arc<AtomicBool>,
    stats: Arc<LeaseStats>,
}

fn pool_options(config: &DbConfig) -> MySqlPoolOptions {
    MySqlPoolOptions::new()
        // Bounded pool; callers beyond capacity wait up to acquire_timeout
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
}

impl Database {
    /// Create the pool and establish the first connection.
    ///
    /// # Errors
    ///
    /// `Acquire` if the server is unreachable or rejects the credentials.
    pub async fn open(config: &DbConfig) -> Result<Self, AppError> {
        let pool = pool_options(config)
            .connect_with(config.connect_options())
            .await
            .map_err(|e| {
                tracing::error!("Failed to initialize connection pool: {e}");
                AppError::Acquire(e)
            })?;

        tracing::info!(
            host = %config.host,
            database = %config.name,
            max_connections = config.max_connections,
            "Database connection pool initialized"
        );
        Ok(Self::from_pool(pool))
    }

    /// Create the pool without connecting.
    ///
    /// Connections are opened on the first `acquire()`. Must be called from
    /// within a tokio runtime.
    pub fn open_lazy(config: &DbConfig) -> Self {
        Self::from_pool(pool_options(config).connect_lazy_with(config.connect_options()))
    }

    /// Wrap an existing sqlx pool.
    pub fn from_pool(pool: DbPool) -> Self {
        Self {
            pool,
            closed: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(LeaseStats::default()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The underlying sqlx pool, for APIs that take one (e.g. migrations).
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn lease_stats(&self) -> &LeaseStats {
        &self.stats
    }

    /// Check a connection out of the pool.
    ///
    /// # Errors
    ///
    /// - `PoolClosed` after `close()`
    /// - `Acquire` if no connection became available within the acquire timeout
    pub async fn acquire(&self) -> Result<PooledConnection, AppError> {
        if self.is_closed() {
            return Err(AppError::PoolClosed);
        }

        let conn = self.pool.acquire().await.map_err(|e| {
            tracing::error!("Failed to get database connection: {e}");
            match e {
                sqlx::Error::PoolClosed => AppError::PoolClosed,
                other => AppError::Acquire(other),
            }
        })?;

        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("Database connection acquired");

        Ok(PooledConnection {
            conn,
            stats: Arc::clone(&self.stats),
        })
    }

    /// Drain and close every pooled connection.
    ///
    /// Waits for checked-out connections to come back. Calling it twice is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.pool.close().await;
        tracing::info!("Database connection pool closed");
    }

    /// Ping the server on one pooled connection.
    ///
    /// Failures are logged and reported as `false`, never as an error.
    pub async fn verify_connection(&self) -> bool {
        let result = async {
            let mut conn = self.acquire().await?;
            conn.ping().await?;
            Ok::<_, AppError>(())
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!("Database connection verified");
                true
            }
            Err(e) => {
                tracing::error!("Database connection verification failed: {e}");
                false
            }
        }
    }

    /// Run one parameterized statement and return its rows.
    ///
    /// The connection goes back to the pool whether the statement succeeds
    /// or fails; the error is returned unchanged.
    pub async fn execute_query(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<MySqlRow>, AppError> {
        let mut conn = self.acquire().await?;
        tracing::debug!(sql, "Executing query");

        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!("Query execution failed: {e}");
                AppError::Database(e)
            })?;

        Ok(rows)
    }

    /// Run one write statement and return the number of affected rows.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, AppError> {
        let mut conn = self.acquire().await?;
        tracing::debug!(sql, "Executing statement");

        let result = bind_params(sqlx::query(sql), params)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!("Statement execution failed: {e}");
                AppError::Database(e)
            })?;

        Ok(result.rows_affected())
    }

    /// Run a query and decode the first row, if any.
    ///
    /// An empty result is `Ok(None)`, not an error.
    pub async fn fetch_first_as<T>(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<T>, AppError>
    where
        T: for<'r> FromRow<'r, MySqlRow>,
    {
        let rows = self.execute_query(sql, params).await?;
        let first = rows.first().map(|row| T::from_row(row)).transpose()?;
        Ok(first)
    }

    /// Run statements in order inside one transaction on one connection.
    ///
    /// # Atomicity
    ///
    /// If every statement succeeds the transaction is committed. If any fails,
    /// the transaction is rolled back on the same connection and the failing
    /// statement's error is returned. A failed rollback is logged and does not
    /// replace that error. The connection is released in every case.
    pub async fn execute_transaction(&self, statements: &[Statement]) -> Result<(), AppError> {
        let mut conn = self.acquire().await?;
        let mut tx = conn.begin().await?;
        tracing::info!(statements = statements.len(), "Transaction started");

        for statement in statements {
            tracing::debug!(sql = %statement.sql, "Executing transaction statement");

            let result = bind_params(sqlx::query(&statement.sql), &statement.params)
                .execute(&mut *tx)
                .await;

            if let Err(err) = result {
                tracing::error!("Transaction failed: {err}");
                match tx.rollback().await {
                    Ok(()) => tracing::warn!("Transaction rolled back due to error"),
                    Err(rollback_err) => {
                        tracing::error!("Transaction rollback failed: {rollback_err}")
                    }
                }
                return Err(AppError::Database(err));
            }
        }

        tx.commit().await?;
        tracing::info!("Transaction committed successfully");

        Ok(())
    }
}

/// Attach positional parameters to a query, in order.
fn bind_params<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    params: &'q [SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    params.iter().fold(query, |query, value| match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Decimal(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Bool(v) => query.bind(*v),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A config pointing at a port nothing listens on.
    fn unreachable_config() -> DbConfig {
        DbConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            acquire_timeout_secs: 1,
            ..DbConfig::default()
        }
    }

    #[test]
    fn statement_collects_params_in_order() {
        let stmt = Statement::new("INSERT INTO accounts VALUES (?, ?, ?, ?)")
            .bind(1001)
            .bind(1)
            .bind("Savings")
            .bind(Decimal::from(50000));

        assert_eq!(
            stmt.params,
            vec![
                SqlValue::Int(1001),
                SqlValue::Int(1),
                SqlValue::Text("Savings".to_string()),
                SqlValue::Decimal(Decimal::from(50000)),
            ]
        );
    }

    #[test]
    fn none_binds_as_null() {
        let phone: Option<&str> = None;
        assert_eq!(SqlValue::from(phone), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(7_i64)), SqlValue::Int(7));
    }

    #[tokio::test]
    async fn closed_pool_refuses_to_acquire() {
        let db = Database::open_lazy(&DbConfig::default());
        db.close().await;

        assert!(db.is_closed());
        assert!(matches!(db.acquire().await, Err(AppError::PoolClosed)));
        assert!(matches!(
            db.execute_query("SELECT 1", &[]).await,
            Err(AppError::PoolClosed)
        ));
        assert!(matches!(
            db.execute_transaction(&[Statement::new("SELECT 1")]).await,
            Err(AppError::PoolClosed)
        ));
        assert_eq!(db.lease_stats().acquired(), 0);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let db = Database::open_lazy(&DbConfig::default());
        db.close().await;
        db.close().await;
        assert!(db.is_closed());
    }

    #[tokio::test]
    async fn acquire_failure_is_reported_and_leaks_nothing() {
        let db = Database::open_lazy(&unreachable_config());

        let err = db.execute_query("SELECT 1", &[]).await.unwrap_err();
        assert!(err.is_acquisition(), "unexpected error: {err}");

        let err = db
            .execute_transaction(&[Statement::new("SELECT 1")])
            .await
            .unwrap_err();
        assert!(err.is_acquisition(), "unexpected error: {err}");

        let stats = db.lease_stats();
        assert_eq!(stats.acquired(), stats.released());
        assert_eq!(stats.outstanding(), 0);
    }

    #[tokio::test]
    async fn verify_connection_reports_false_when_unreachable() {
        let db = Database::open_lazy(&unreachable_config());
        assert!(!db.verify_connection().await);
    }
}
