//! # Transaction Wrapper
//!
//! Runs a unit of work atomically on one pooled connection.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     run_in_transaction(ctx, work)                       │
//! │                                                                         │
//! │  acquire() ──► begin() ──► work(&mut conn) ──┬── Ok  ──► commit()      │
//! │     │                                        │                          │
//! │     │                                        └── Err ──► rollback()     │
//! │     │                                                      │            │
//! │     │                                   rollback failed? log it, keep   │
//! │     │                                   the ORIGINAL error, close conn  │
//! │     ▼                                                      │            │
//! │  release() ◄───────────────────────────────────────────────┘            │
//! │  (always, on every path)                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let ctx = TxContext::new("restock").with("product", &name);
//! let product = db
//!     .run_in_transaction(&ctx, move |conn| {
//!         Box::pin(async move {
//!             ProductRepository::new(conn).restore_stock(&id, 10).await
//!         })
//!     })
//!     .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use sqlx::SqliteConnection;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::pool::{Database, DbConnection};

/// Future returned by a unit of work, borrowing the transaction's connection.
pub type TxFuture<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

// =============================================================================
// Transaction Context
// =============================================================================

/// Caller-supplied description of a unit of work, attached to every log line
/// the wrapper emits.
#[derive(Debug, Clone)]
pub struct TxContext {
    operation: &'static str,
    fields: Vec<(&'static str, String)>,
}

impl TxContext {
    pub fn new(operation: &'static str) -> Self {
        TxContext {
            operation,
            fields: Vec::new(),
        }
    }

    /// Adds a key/value pair (customer, product, quantity, ...).
    pub fn with(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl fmt::Display for TxContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation)?;
        for (key, value) in &self.fields {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

// =============================================================================
// run_in_transaction
// =============================================================================

impl Database {
    /// Runs `work` inside a transaction and commits if it succeeds.
    ///
    /// ## Guarantees
    /// - `Ok` from `work` → commit, return the value
    /// - `Err` from `work` → rollback, return that same error
    /// - Rollback failure is logged and never replaces the original error
    /// - Timeout (`DbConfig::transaction_timeout`) → `DbError::Timeout`, rollback
    /// - The connection is released on every path
    pub async fn run_in_transaction<T, E, F>(&self, context: &TxContext, work: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> TxFuture<'c, T, E> + Send,
        T: Send,
        E: From<DbError> + fmt::Display + Send,
    {
        let tx_id = Uuid::new_v4().simple().to_string();
        let tx_id = &tx_id[..8];

        let mut conn = match self.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(tx_id, context = %context, error = %e, "Could not acquire connection");
                return Err(e.into());
            }
        };

        let (outcome, discard_connection) = self.execute_unit(&mut conn, context, tx_id, work).await;

        if discard_connection {
            conn.close_on_drop();
        }
        self.release(conn);
        debug!(tx_id, context = %context, "Transaction connection released");

        outcome
    }

    /// Begin, run, commit or roll back. Returns the outcome and whether the
    /// connection is in an unknown transaction state.
    async fn execute_unit<T, E, F>(
        &self,
        conn: &mut DbConnection,
        context: &TxContext,
        tx_id: &str,
        work: F,
    ) -> (Result<T, E>, bool)
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> TxFuture<'c, T, E> + Send,
        T: Send,
        E: From<DbError> + fmt::Display + Send,
    {
        let mut tx = match self.begin(conn).await {
            Ok(tx) => tx,
            Err(e) => {
                error!(tx_id, context = %context, error = %e, "Failed to begin transaction");
                return (Err(e.into()), true);
            }
        };

        debug!(tx_id, context = %context, "Transaction started");

        let result = match self.config().transaction_timeout {
            Some(limit) => match tokio::time::timeout(limit, work(&mut *tx)).await {
                Ok(result) => result,
                Err(_) => Err(DbError::Timeout(limit).into()),
            },
            None => work(&mut *tx).await,
        };

        match result {
            Ok(value) => match self.commit(tx).await {
                Ok(()) => {
                    info!(tx_id, context = %context, "Transaction committed");
                    (Ok(value), false)
                }
                Err(e) => {
                    error!(tx_id, context = %context, error = %e, "Commit failed");
                    (Err(e.into()), true)
                }
            },
            Err(err) => {
                warn!(tx_id, context = %context, error = %err, "Unit of work failed, rolling back");

                match self.rollback(tx).await {
                    Ok(()) => {
                        info!(tx_id, context = %context, "Transaction rolled back");
                        (Err(err), false)
                    }
                    Err(rollback_err) => {
                        error!(
                            tx_id,
                            context = %context,
                            error = %rollback_err,
                            original_error = %err,
                            "Rollback failed, keeping original error"
                        );
                        (Err(err), true)
                    }
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::OrderError;
    use crate::DbConfig;
    use tienda_core::CoreError;

    async fn customer_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn insert_customer(conn: &mut SqliteConnection, email: &str) -> Result<(), OrderError> {
        sqlx::query(
            "INSERT INTO customers (id, name, email, created_at) VALUES (?1, 'Ana', ?2, '2026-01-01T00:00:00Z')",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(email)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    #[test]
    fn test_context_display() {
        let ctx = TxContext::new("process_order")
            .with("customer", "Juan Pérez")
            .with("quantity", 2);
        assert_eq!(ctx.to_string(), "process_order customer=Juan Pérez quantity=2");
        assert_eq!(ctx.operation(), "process_order");
    }

    #[tokio::test]
    async fn test_commit_on_success() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let value: Result<&str, OrderError> = db
            .run_in_transaction(&TxContext::new("test"), |conn| {
                Box::pin(async move {
                    insert_customer(conn, "ana@tienda.mx").await?;
                    Ok::<_, OrderError>("done")
                })
            })
            .await;

        assert_eq!(value.unwrap(), "done");
        assert_eq!(customer_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_rollback_returns_original_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let result: Result<(), OrderError> = db
            .run_in_transaction(&TxContext::new("test"), |conn| {
                Box::pin(async move {
                    insert_customer(conn, "ana@tienda.mx").await?;
                    Err(OrderError::from(CoreError::ProductNotFound("Tablet".to_string())))
                })
            })
            .await;

        assert!(matches!(
            result,
            Err(OrderError::Core(CoreError::ProductNotFound(ref name))) if name == "Tablet"
        ));
        assert_eq!(customer_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_connection_released_after_failure() {
        let db = Database::new(DbConfig::in_memory().acquire_timeout(Duration::from_millis(200)))
            .await
            .unwrap();

        for _ in 0..3 {
            let result: Result<(), OrderError> = db
                .run_in_transaction(&TxContext::new("test"), |_conn| {
                    Box::pin(async move { Err(OrderError::from(CoreError::SimulatedFailure("boom".to_string()))) })
                })
                .await;
            assert!(result.is_err());
        }

        // The single pooled connection must be free again
        let conn = db.acquire().await.unwrap();
        db.release(conn);
    }

    #[tokio::test]
    async fn test_pool_exhaustion_surfaces_as_error() {
        let db = Database::new(DbConfig::in_memory().acquire_timeout(Duration::from_millis(100)))
            .await
            .unwrap();
        let held = db.acquire().await.unwrap();

        let result: Result<(), OrderError> = db
            .run_in_transaction(&TxContext::new("test"), |_conn| Box::pin(async move { Ok(()) }))
            .await;

        assert!(matches!(result, Err(OrderError::Db(DbError::PoolExhausted))));
        db.release(held);
    }

    #[tokio::test]
    async fn test_timeout_rolls_back() {
        let config = DbConfig::in_memory().transaction_timeout(Duration::from_millis(50));
        let db = Database::new(config).await.unwrap();

        let result: Result<(), OrderError> = db
            .run_in_transaction(&TxContext::new("slow"), |conn| {
                Box::pin(async move {
                    insert_customer(conn, "slow@tienda.mx").await?;
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok::<_, OrderError>(())
                })
            })
            .await;

        assert!(matches!(result, Err(OrderError::Db(DbError::Timeout(_)))));
        assert_eq!(customer_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_failed_rollback_keeps_original_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        // Ending the transaction behind the wrapper's back makes its ROLLBACK fail
        let result: Result<(), OrderError> = db
            .run_in_transaction(&TxContext::new("test"), |conn| {
                Box::pin(async move {
                    sqlx::query("COMMIT").execute(&mut *conn).await?;
                    Err(OrderError::from(CoreError::SimulatedFailure("after commit".to_string())))
                })
            })
            .await;

        assert!(matches!(
            result,
            Err(OrderError::Core(CoreError::SimulatedFailure(ref msg))) if msg == "after commit"
        ));
        assert!(db.health_check().await);
    }
}
