//! # Database Pool Management
//!
//! Connection pool creation and the transaction-control primitives every
//! unit of work is built from.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  DbConfig::new(path) / DbConfig::from_env()                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ acquire() → begin() → ... → commit()/rollback() → release()    │
//! │       ▼                                                                 │
//! │  Unit of work 1 ──► holds Conn1 exclusively                            │
//! │  Unit of work 2 ──► holds Conn2 exclusively                            │
//! │  Unit of work 3 ──► waits up to acquire_timeout, then PoolExhausted    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases use WAL so readers don't block the single writer.
//! Transactions begin `IMMEDIATE`, so writers are serialized at `begin()`
//! and wait for each other up to `busy_timeout`.

use std::str::FromStr;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Connection, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::migrations;

/// Exclusive connection handle, bound to one unit of work until released.
pub type DbConnection = PoolConnection<Sqlite>;

// =============================================================================
// Database
// =============================================================================

/// The persistence gateway: owns the pool, hands out connections, and issues
/// transaction-control statements.
///
/// Constructed explicitly and injected into `OrderService`; there is no
/// process-wide pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    config: DbConfig,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads (file databases)
    ///    - Foreign keys enabled
    ///    - Busy timeout: how long a writer waits for the lock before `Busy`
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        let connect_options = connect_options
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout);

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout);

        // An in-memory database dies with its last connection
        pool_options = if config.is_in_memory() {
            pool_options.idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.idle_timeout(Some(config.idle_timeout))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool, config };

        if db.config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the configuration this database was opened with.
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Checks out an exclusive connection.
    ///
    /// ## Errors
    /// * `DbError::PoolExhausted` - no connection freed up within `acquire_timeout`
    /// * `DbError::ConnectionFailed` - pool closed or database unreachable
    pub async fn acquire(&self) -> DbResult<DbConnection> {
        let conn = self.pool.acquire().await.map_err(DbError::from)?;

        debug!(
            pool_size = self.pool.size(),
            idle = self.pool.num_idle(),
            "Connection acquired"
        );

        Ok(conn)
    }

    /// Returns a connection to the pool.
    ///
    /// Takes the handle by value, so a connection cannot be released twice
    /// or used after release.
    pub fn release(&self, conn: DbConnection) {
        drop(conn);
        debug!(idle = self.pool.num_idle(), "Connection released");
    }

    /// Starts a transaction on an acquired connection.
    ///
    /// Uses `BEGIN IMMEDIATE`: the write lock is taken up front, so
    /// concurrent units of work queue behind each other under `busy_timeout`.
    /// A deferred `BEGIN` would fail with `Busy` as soon as a reader tried to
    /// upgrade after another writer committed.
    pub async fn begin<'c>(&self, conn: &'c mut DbConnection) -> DbResult<Transaction<'c, Sqlite>> {
        conn.begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| match DbError::from(e) {
                busy @ DbError::Busy(_) => busy,
                other => DbError::TransactionFailed(format!("begin: {other}")),
            })
    }

    /// Commits a transaction.
    pub async fn commit(&self, tx: Transaction<'_, Sqlite>) -> DbResult<()> {
        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(format!("commit: {e}")))
    }

    /// Rolls back a transaction.
    ///
    /// The error is returned for logging only; callers never surface it in
    /// place of the failure that caused the rollback.
    pub async fn rollback(&self, tx: Transaction<'_, Sqlite>) -> DbResult<()> {
        tx.rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(format!("rollback: {e}")))
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Closes the database connection pool.
    ///
    /// After calling close, `acquire()` fails with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
