//! # Error Types
//!
//! Domain-specific error types for tienda-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tienda-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule failures                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tienda-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── OrderError       - CoreError | DbError, returned by the service   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → OrderError → shell               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` raised inside a unit of work causes a rollback. The
//! transaction wrapper hands the error back unchanged.

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Error Code
// =============================================================================

/// Machine-readable error codes for shells.
///
/// A REST shell maps these to status codes, a CLI to exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed input, rejected before any transaction (400)
    ValidationError,
    /// Email reused with a different name (409)
    IdentityConflict,
    /// Unknown product or order (404)
    NotFound,
    /// Not enough stock (422)
    InsufficientStock,
    /// Order already cancelled (409)
    AlreadyCancelled,
    /// Dangling reference at write time (422)
    ReferentialIntegrity,
    /// Injected failure (500)
    SimulatedFailure,
    /// Pool exhausted or store unreachable (503)
    ConnectionError,
    /// Unit of work or statement timed out (504)
    Timeout,
    /// Any other database failure (500)
    DatabaseError,
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The submitted email belongs to a customer with a different name.
    ///
    /// ## When This Occurs
    /// ```text
    /// On record:  juan@example.com → "Juan Pérez"
    /// Submitted:  juan@example.com → "Juan Perez"
    ///      │
    ///      ▼
    /// IdentityConflict (no insert, no rename, rollback)
    /// ```
    #[error(
        "Customer {email} is registered as '{existing_name}', not '{submitted_name}'"
    )]
    IdentityConflict {
        email: String,
        existing_name: String,
        submitted_name: String,
    },

    /// Product cannot be found by name.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Not enough stock to cover the requested quantity.
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// The store rejected a dangling reference while writing an order.
    #[error("Referenced {reference} does not exist: {id}")]
    ReferentialIntegrity { reference: String, id: String },

    /// Failure injected on request, after validation and before any write.
    #[error("Simulated failure: {0}")]
    SimulatedFailure(String),

    /// Order cannot be found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Order was already cancelled.
    #[error("Order {0} is already cancelled")]
    AlreadyCancelled(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::IdentityConflict { .. } => ErrorCode::IdentityConflict,
            CoreError::ProductNotFound(_) | CoreError::OrderNotFound(_) => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::ReferentialIntegrity { .. } => ErrorCode::ReferentialIntegrity,
            CoreError::SimulatedFailure(_) => ErrorCode::SimulatedFailure,
            CoreError::AlreadyCancelled(_) => ErrorCode::AlreadyCancelled,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// Creates an InsufficientStock error.
    pub fn insufficient_stock(product: impl Into<String>, available: i64, requested: i64) -> Self {
        CoreError::InsufficientStock {
            product: product.into(),
            available,
            requested,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised while normalizing a request, before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Too many entries in a list.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::insufficient_stock("Laptop", 3, 5);
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Laptop: available 3, requested 5"
        );

        let err = CoreError::IdentityConflict {
            email: "juan@example.com".to_string(),
            existing_name: "Juan Pérez".to_string(),
            submitted_name: "Pedro".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Customer juan@example.com is registered as 'Juan Pérez', not 'Pedro'"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "products".to_string(),
        };
        assert_eq!(err.to_string(), "products is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "email".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn test_error_code_serialization() {
        let code = CoreError::ProductNotFound("Tablet".to_string()).code();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"NOT_FOUND\"");
    }
}
