//! # Domain Types
//!
//! Core domain types used throughout Tienda Orders.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │     Order       │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  customer_id    │   │  id (UUID)      │       │
//! │  │  email (unique) │   │  product_id ────│──►│  name (unique)  │       │
//! │  │  name           │   │  quantity       │   │  price_cents    │       │
//! │  └─────────────────┘   │  unit_price     │   │  stock >= 0     │       │
//! │                        │  total          │   │  min_stock      │       │
//! │                        │  status         │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business key: `email` for customers, `name` for products

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Customer
// =============================================================================

/// A customer, identified by a unique email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Full name. Must match exactly when the email is reused.
    pub name: String,

    /// Business identity.
    pub email: String,

    pub phone: Option<String>,

    pub address: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Outcome of resolving a customer by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResolution {
    pub customer: Customer,

    /// `true` when the row was inserted by this unit of work.
    pub created: bool,
}

// =============================================================================
// Product
// =============================================================================

/// A product with its current stock level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business identity, used by order requests.
    pub name: String,

    pub description: Option<String>,

    /// Current unit price in cents.
    pub price_cents: i64,

    /// Sellable units. Never negative.
    pub stock: i64,

    /// Restock threshold: the product is "low" when `stock <= min_stock`.
    pub min_stock: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units are available.
    #[inline]
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }

    /// Checks whether the product is at or below its restock threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

/// Input for inserting a catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
    pub min_stock: i64,
}

impl NewProduct {
    /// Creates a product input without description.
    pub fn new(name: impl Into<String>, price_cents: i64, stock: i64, min_stock: i64) -> Self {
        NewProduct {
            name: name.into(),
            description: None,
            price_cents,
            stock,
            min_stock,
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, not yet fulfilled.
    Pending,
    /// Fulfilled.
    Completed,
    /// Cancelled; stock has been restored.
    Cancelled,
}

impl OrderStatus {
    /// Returns the value stored in the `status` column.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order line: one product, one quantity, one customer.
///
/// ## Snapshot Pattern
/// `unit_price_cents` is copied from the product when the order is created,
/// so later price changes do not rewrite order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// `quantity × unit_price_cents`, computed when the row is written.
    pub total_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Order joined with customer and product display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Aggregates over all non-cancelled orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatistics {
    pub order_count: i64,
    pub total_revenue: Money,
    pub average_order_value: Money,
    pub distinct_customers: i64,
}

impl OrderStatistics {
    /// Builds statistics from raw aggregates, deriving the average.
    pub fn from_totals(order_count: i64, total_revenue_cents: i64, distinct_customers: i64) -> Self {
        let total_revenue = Money::from_cents(total_revenue_cents);
        OrderStatistics {
            order_count,
            total_revenue,
            average_order_value: total_revenue.average_over(order_count),
            distinct_customers,
        }
    }
}

// =============================================================================
// Order Results
// =============================================================================

/// Stock movement of one processed product line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedProduct {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
}

/// One line of the order summary breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineBreakdown {
    pub product: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Totals for a processed order request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub line_count: usize,
    pub total_units: i64,
    pub total_value: Money,
    pub lines: Vec<LineBreakdown>,
}

impl OrderSummary {
    /// Adds one line to the summary.
    pub fn push_line(&mut self, product: impl Into<String>, quantity: i64, unit_price: Money) {
        let line_total = unit_price * quantity;
        self.line_count += 1;
        self.total_units += quantity;
        self.total_value += line_total;
        self.lines.push(LineBreakdown {
            product: product.into(),
            quantity,
            unit_price,
            line_total,
        });
    }
}

/// Everything a committed order request produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub customer: Customer,
    pub customer_created: bool,
    pub processed_products: Vec<ProcessedProduct>,
    pub orders: Vec<Order>,
    pub summary: OrderSummary,
}

/// Result of cancelling an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancellation {
    /// The order as it was before removal.
    pub order: OrderDetail,
    pub success: bool,
}

/// Cancellation plus the product's stock after restoration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationResult {
    pub order: OrderDetail,
    pub product: Product,
    pub restored_quantity: i64,
    pub success: bool,
}

/// Dashboard view: statistics, recent orders, products to restock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub statistics: OrderStatistics,
    pub recent_orders: Vec<OrderDetail>,
    pub low_stock_products: Vec<Product>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min_stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            name: "Laptop".to_string(),
            description: None,
            price_cents: 150_000,
            stock,
            min_stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_stock_checks() {
        let p = product(10, 5);
        assert!(p.has_stock_for(10));
        assert!(!p.has_stock_for(11));
        assert!(!p.is_low_stock());
        assert!(product(5, 5).is_low_stock());
    }

    #[test]
    fn test_summary_accumulates_lines() {
        let mut summary = OrderSummary::default();
        summary.push_line("Laptop", 2, Money::from_cents(1000));
        summary.push_line("Mouse", 3, Money::from_cents(250));

        assert_eq!(summary.line_count, 2);
        assert_eq!(summary.total_units, 5);
        assert_eq!(summary.total_value.cents(), 2750);
        assert_eq!(summary.lines[1].line_total.cents(), 750);
    }

    #[test]
    fn test_statistics_average() {
        let stats = OrderStatistics::from_totals(4, 1000, 2);
        assert_eq!(stats.average_order_value.cents(), 250);

        let empty = OrderStatistics::from_totals(0, 0, 0);
        assert!(empty.average_order_value.is_zero());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(OrderStatus::Cancelled.as_str(), "cancelled");
    }
}
