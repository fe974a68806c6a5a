//! # Validation Module
//!
//! Input validation for order requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Shell (REST/CLI)                                             │
//! │  └── Deserialization into OrderRequest                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (before any transaction is opened)              │
//! │  ├── Required fields, lengths, email shape                             │
//! │  └── Quantities > 0 and bounded                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Inside the unit of work                                      │
//! │  ├── Product exists, stock covers the request                          │
//! │  └── Email/name identity                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── UNIQUE(email), UNIQUE(name)                                       │
//! │  ├── CHECK(stock >= 0), CHECK(quantity > 0)                            │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tienda_core::validation::{validate_email, validate_quantity};
//!
//! assert!(validate_email("juan@example.com").is_ok());
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;

// =============================================================================
// String Validators
// =============================================================================

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a customer name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_required_text("customer.name", name, MAX_NAME_LEN)
}

/// Validates a product name in an order line.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required_text("product", name, MAX_NAME_LEN)
}

/// Validates the shape of an email address.
///
/// ## Rules
/// - Must not be empty, at most 254 characters
/// - No whitespace
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a `.` that is neither first nor last
///
/// ## Example
/// ```rust
/// use tienda_core::validation::validate_email;
///
/// assert!(validate_email("ana@tienda.mx").is_ok());
/// assert!(validate_email("ana@tienda").is_err());
/// assert!(validate_email("ana tienda.mx").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    validate_required_text("customer.email", email, MAX_EMAIL_LEN)?;

    let email = email.trim();
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "customer.email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid("must contain exactly one '@'")),
    };

    if local.is_empty() {
        return Err(invalid("missing local part"));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must look like 'example.com'"));
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the number of lines in one request.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "products".to_string(),
        });
    }

    if count > MAX_ORDER_LINES {
        return Err(ValidationError::TooMany {
            field: "products".to_string(),
            max: MAX_ORDER_LINES,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_name() {
        assert!(validate_customer_name("Juan Pérez").is_ok());
        assert!(matches!(
            validate_customer_name("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_customer_name(&"x".repeat(201)),
            Err(ValidationError::TooLong { max: 200, .. })
        ));
    }

    #[test]
    fn test_email() {
        assert!(validate_email("juan.perez@example.com").is_ok());
        assert!(validate_email("  juan@example.com  ").is_ok());
        assert!(matches!(validate_email(""), Err(ValidationError::Required { .. })));
        for bad in ["juan", "@example.com", "a@b@c.com", "juan@example.", "juan@.com"] {
            assert!(
                matches!(validate_email(bad), Err(ValidationError::InvalidFormat { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(matches!(
            validate_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_quantity(-3),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            validate_quantity(MAX_ITEM_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(0).is_err());
        assert!(matches!(
            validate_line_count(MAX_ORDER_LINES + 1),
            Err(ValidationError::TooMany { .. })
        ));
    }
}
