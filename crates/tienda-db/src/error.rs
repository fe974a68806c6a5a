//! # Database Error Types
//!
//! Error types for database operations and for the order service.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OrderError ← DbError or CoreError (business rule)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  run_in_transaction: rollback, then return the SAME OrderError         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Shell maps OrderError::code() to its own status                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;

use tienda_core::{CoreError, ErrorCode, ValidationError};

/// SQLite primary result codes for lock contention.
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Inserting a duplicate customer email
    /// - Inserting a duplicate product name
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Order referencing a non-existent customer_id or product_id
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, non-positive quantity).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Pool exhausted (all connections in use until the acquire timeout).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The unit of work exceeded its time budget.
    #[error("Transaction timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// SQLite kept the database locked past the busy timeout.
    #[error("Database is busy: {0}")]
    Busy(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin or commit failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DbError::NotFound { .. } => ErrorCode::NotFound,
            DbError::ForeignKeyViolation { .. } => ErrorCode::ReferentialIntegrity,
            DbError::ConnectionFailed(_) | DbError::PoolExhausted => ErrorCode::ConnectionError,
            DbError::Timeout(_) | DbError::Busy(_) => ErrorCode::Timeout,
            _ => ErrorCode::DatabaseError,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound           → DbError::NotFound
/// Database, UniqueViolation          → DbError::UniqueViolation
/// Database, ForeignKeyViolation      → DbError::ForeignKeyViolation
/// Database, CheckViolation           → DbError::CheckViolation
/// Database, SQLITE_BUSY / LOCKED     → DbError::Busy
/// sqlx::Error::PoolTimedOut          → DbError::PoolExhausted
/// sqlx::Error::PoolClosed / Io       → DbError::ConnectionFailed
/// Other                              → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message().to_string();

                match db_err.kind() {
                    // SQLite: "UNIQUE constraint failed: <table>.<column>"
                    ErrorKind::UniqueViolation => {
                        let field = msg
                            .split("UNIQUE constraint failed: ")
                            .nth(1)
                            .unwrap_or("unknown")
                            .to_string();
                        DbError::UniqueViolation {
                            field,
                            value: "unknown".to_string(),
                        }
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message: msg },
                    ErrorKind::CheckViolation => DbError::CheckViolation { message: msg },
                    _ => match db_err.code().as_deref() {
                        Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => DbError::Busy(msg),
                        _ if msg.contains("database is locked") => DbError::Busy(msg),
                        _ => DbError::QueryFailed(msg),
                    },
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::Io(e) => DbError::ConnectionFailed(e.to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Order Error
// =============================================================================

/// Error returned by repositories, the transaction wrapper and the service.
///
/// The wrapper never converts one variant into another: whatever the unit
/// of work returned is what the caller receives.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Business rule failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Infrastructure failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl OrderError {
    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::Core(e) => e.code(),
            OrderError::Db(e) => e.code(),
        }
    }

    /// `true` for business rule failures, `false` for infrastructure faults.
    pub fn is_business(&self) -> bool {
        matches!(self, OrderError::Core(_))
    }

    /// Returns the business error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            OrderError::Core(e) => Some(e),
            OrderError::Db(_) => None,
        }
    }
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        OrderError::Db(err.into())
    }
}

impl From<ValidationError> for OrderError {
    fn from(err: ValidationError) -> Self {
        OrderError::Core(err.into())
    }
}

/// Result type for repository and service operations.
pub type ServiceResult<T> = Result<T, OrderError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_connection_errors() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::PoolExhausted));
        assert_eq!(err.code(), ErrorCode::ConnectionError);

        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::ConnectionFailed(_)));
    }

    #[test]
    fn test_order_error_preserves_core_error() {
        let err: OrderError = CoreError::ProductNotFound("Tablet".to_string()).into();
        assert!(err.is_business());
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.to_string(), "Product not found: Tablet");
        assert!(matches!(
            err.as_core(),
            Some(CoreError::ProductNotFound(name)) if name == "Tablet"
        ));
    }

    #[test]
    fn test_validation_error_converts() {
        let err: OrderError = ValidationError::Required {
            field: "email".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_timeout_code() {
        let err = OrderError::from(DbError::Timeout(std::time::Duration::from_secs(1)));
        assert!(!err.is_business());
        assert_eq!(err.code(), ErrorCode::Timeout);
    }
}
