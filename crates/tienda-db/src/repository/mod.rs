//! # Repository Module
//!
//! Database repository implementations for Tienda Orders.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories Share One Connection                    │
//! │                                                                         │
//! │  run_in_transaction(ctx, |conn| ...)                                   │
//! │       │                                                                 │
//! │       │  &mut SqliteConnection (inside BEGIN ... COMMIT)               │
//! │       ▼                                                                 │
//! │  CustomerRepository::new(conn).create_or_reuse(..)                     │
//! │  ProductRepository::new(conn).decrement_stock(..)                      │
//! │  OrderRepository::new(conn).create(..)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  A repository never acquires a connection or opens a transaction of   │
//! │  its own, so every write it makes belongs to the caller's unit of     │
//! │  work and rolls back with it.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CustomerRepository`] - Email-keyed customer resolution
//! - [`ProductRepository`] - Catalog reads and stock movements
//! - [`OrderRepository`] - Order lines, cancellation, statistics

pub mod customer;
pub mod order;
pub mod product;

pub use customer::CustomerRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;
