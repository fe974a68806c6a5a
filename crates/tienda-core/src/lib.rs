//! # tienda-core: Pure Business Logic for Tienda Orders
//!
//! This crate holds everything about an order that can be decided without
//! touching the database: entity types, the shape of an order request,
//! normalization of that request, input validation, money arithmetic and
//! the domain error taxonomy.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tienda Orders Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Shell (REST / CLI / RPC - not here)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ OrderRequest                           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tienda-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  request  │  │ validation│  │   │
//! │  │   │ Customer  │  │   Money   │  │ Selection │  │   rules   │  │   │
//! │  │   │  Product  │  │           │  │ OrderLine │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tienda-db (Database Layer)                   │   │
//! │  │     pool, run_in_transaction, repositories, OrderService        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entities and read models (Customer, Product, Order, ...)
//! - [`request`] - Order requests and their normalization into order lines
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tienda_core::request::{CustomerInput, OrderRequest};
//!
//! let request = OrderRequest::single(
//!     CustomerInput::new("Juan Pérez", "juan@example.com"),
//!     "Laptop",
//!     2,
//! );
//!
//! let lines = request.normalize().unwrap();
//! assert_eq!(lines.len(), 1);
//! assert_eq!(lines[0].quantity, 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod request;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorCode, ValidationError};
pub use money::Money;
pub use request::{CustomerInput, OrderLine, OrderLineInput, OrderRequest, ProductSelection};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of product lines in a single order request.
///
/// ## Business Reason
/// One request is one transaction holding one pooled connection; keeping
/// requests small keeps that hold short.
pub const MAX_ORDER_LINES: usize = 50;

/// Maximum quantity of a single product line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Number of orders returned in the summary's "recent orders" list.
pub const RECENT_ORDERS_LIMIT: i64 = 10;
