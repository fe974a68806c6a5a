//! # Order Requests
//!
//! The shape callers submit, and its normalization into order lines.
//!
//! ## Normalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  { product: "Laptop", quantity: 2 }          ──┐                        │
//! │                                                ├─► ProductSelection     │
//! │  { products: [{product, quantity}, ...] }    ──┘        │               │
//! │                                                         ▼               │
//! │  neither present ──► ValidationError         Vec<OrderLine> (trimmed,   │
//! │                                              validated, canonical)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything in this module runs before a transaction is opened.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validation::{
    validate_customer_name, validate_email, validate_line_count, validate_product_name,
    validate_quantity, ValidationResult,
};

// =============================================================================
// Customer Input
// =============================================================================

/// Customer data submitted with an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl CustomerInput {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        CustomerInput {
            name: name.into(),
            email: email.into(),
            phone: None,
            address: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Validates and returns a trimmed copy.
    ///
    /// Blank optional fields become `None`.
    pub fn normalized(&self) -> ValidationResult<CustomerInput> {
        validate_customer_name(&self.name)?;
        validate_email(&self.email)?;

        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(CustomerInput {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: clean(&self.phone),
            address: clean(&self.address),
        })
    }
}

// =============================================================================
// Product Selection
// =============================================================================

/// One `{product, quantity}` pair as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    /// Product name.
    pub product: String,
    pub quantity: i64,
}

impl OrderLineInput {
    pub fn new(product: impl Into<String>, quantity: i64) -> Self {
        OrderLineInput {
            product: product.into(),
            quantity,
        }
    }
}

/// Which product form the request used.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductSelection {
    Single(OrderLineInput),
    Multiple(Vec<OrderLineInput>),
}

impl ProductSelection {
    /// Validates every line and returns the canonical list.
    pub fn into_lines(self) -> ValidationResult<Vec<OrderLine>> {
        let inputs = match self {
            ProductSelection::Single(line) => vec![line],
            ProductSelection::Multiple(lines) => lines,
        };

        validate_line_count(inputs.len())?;

        inputs
            .into_iter()
            .map(|input| {
                validate_product_name(&input.product)?;
                validate_quantity(input.quantity)?;
                Ok(OrderLine {
                    product: input.product.trim().to_string(),
                    quantity: input.quantity,
                })
            })
            .collect()
    }
}

/// A validated order line: product name and positive quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product: String,
    pub quantity: i64,
}

// =============================================================================
// Order Request
// =============================================================================

/// An order request as a shell would deserialize it.
///
/// Either `product` + `quantity` or `products` must be present. When both
/// are present the list wins.
///
/// ## Example
/// ```rust
/// use tienda_core::request::OrderRequest;
///
/// let json = r#"{
///     "customer": { "name": "Ana", "email": "ana@tienda.mx" },
///     "products": [
///         { "product": "Laptop", "quantity": 1 },
///         { "product": "Mouse", "quantity": 2 }
///     ],
///     "simulateError": false
/// }"#;
/// # let request: OrderRequest = serde_json::from_str(json).unwrap();
/// # assert_eq!(request.normalize().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub customer: CustomerInput,

    #[serde(default)]
    pub product: Option<String>,

    #[serde(default)]
    pub quantity: Option<i64>,

    #[serde(default)]
    pub products: Option<Vec<OrderLineInput>>,

    /// Fail on purpose after validation, before any write.
    #[serde(default)]
    pub simulate_error: bool,
}

impl OrderRequest {
    /// Request for a single product.
    pub fn single(customer: CustomerInput, product: impl Into<String>, quantity: i64) -> Self {
        OrderRequest {
            customer,
            product: Some(product.into()),
            quantity: Some(quantity),
            products: None,
            simulate_error: false,
        }
    }

    /// Request for several products.
    pub fn multiple(customer: CustomerInput, products: Vec<OrderLineInput>) -> Self {
        OrderRequest {
            customer,
            product: None,
            quantity: None,
            products: Some(products),
            simulate_error: false,
        }
    }

    /// Sets the fault-injection flag.
    pub fn with_simulated_error(mut self, simulate: bool) -> Self {
        self.simulate_error = simulate;
        self
    }

    /// Identifies which product form was submitted.
    ///
    /// A lone `product` without `quantity` (or the reverse) counts as absent.
    pub fn selection(&self) -> Option<ProductSelection> {
        if let Some(products) = &self.products {
            return Some(ProductSelection::Multiple(products.clone()));
        }

        match (&self.product, self.quantity) {
            (Some(product), Some(quantity)) => Some(ProductSelection::Single(OrderLineInput {
                product: product.clone(),
                quantity,
            })),
            _ => None,
        }
    }

    /// Validates the product part of the request into canonical lines.
    pub fn normalize(&self) -> ValidationResult<Vec<OrderLine>> {
        self.selection()
            .ok_or_else(|| ValidationError::Required {
                field: "product/quantity or products".to_string(),
            })?
            .into_lines()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerInput {
        CustomerInput::new("Juan Pérez", "juan@example.com")
    }

    #[test]
    fn test_single_normalizes_to_one_line() {
        let lines = OrderRequest::single(customer(), "  Laptop ", 2)
            .normalize()
            .unwrap();
        assert_eq!(
            lines,
            vec![OrderLine {
                product: "Laptop".to_string(),
                quantity: 2
            }]
        );
    }

    #[test]
    fn test_list_wins_over_single() {
        let mut request = OrderRequest::multiple(
            customer(),
            vec![OrderLineInput::new("Mouse", 1), OrderLineInput::new("Teclado", 3)],
        );
        request.product = Some("Laptop".to_string());
        request.quantity = Some(1);

        let lines = request.normalize().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product, "Mouse");
    }

    #[test]
    fn test_missing_selection_is_rejected() {
        let mut request = OrderRequest::single(customer(), "Laptop", 1);
        request.quantity = None;
        assert!(matches!(
            request.normalize(),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let request = OrderRequest::multiple(customer(), vec![]);
        assert!(matches!(
            request.normalize(),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_bad_line_is_rejected() {
        let request = OrderRequest::multiple(
            customer(),
            vec![OrderLineInput::new("Mouse", 1), OrderLineInput::new("Teclado", 0)],
        );
        assert!(matches!(
            request.normalize(),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_customer_normalized() {
        let input = CustomerInput::new("  Ana  ", " ana@tienda.mx ").with_phone("   ");
        let clean = input.normalized().unwrap();
        assert_eq!(clean.name, "Ana");
        assert_eq!(clean.email, "ana@tienda.mx");
        assert_eq!(clean.phone, None);

        assert!(CustomerInput::new("", "ana@tienda.mx").normalized().is_err());
    }

    #[test]
    fn test_deserialize_single_form() {
        let json = r#"{
            "customer": { "name": "Juan Pérez", "email": "juan@example.com", "phone": "555-1234" },
            "product": "Laptop",
            "quantity": 2
        }"#;
        let request: OrderRequest = serde_json::from_str(json).unwrap();
        assert!(!request.simulate_error);
        assert_eq!(request.customer.phone.as_deref(), Some("555-1234"));
        assert!(matches!(
            request.selection(),
            Some(ProductSelection::Single(_))
        ));
    }
}
