//! # tienda-db: Persistence Layer for Tienda Orders
//!
//! SQLite storage, the transaction wrapper, repositories and the order
//! service, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tienda Orders Data Flow                          │
//! │                                                                         │
//! │  Shell (HTTP handler, CLI, test)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tienda-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   OrderService (service/)                                       │   │
//! │  │        │                                                        │   │
//! │  │        │ run_in_transaction (transaction.rs)                    │   │
//! │  │        ▼                                                        │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CustomerRepo  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo   │    │ 001_init.sql │  │   │
//! │  │   │ begin/commit  │    │ OrderRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ./tienda.db  (or :memory: in tests)                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Pool and timeout settings, environment loading
//! - [`pool`] - Connection pool and transaction-control primitives
//! - [`transaction`] - `run_in_transaction` unit-of-work wrapper
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - `DbError` and `OrderError`
//! - [`repository`] - Customer, product and order repositories
//! - [`service`] - `OrderService`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tienda_core::{CustomerInput, OrderRequest};
//! use tienda_db::{Database, DbConfig, OrderService};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//! let service = OrderService::new(db);
//!
//! let request = OrderRequest::single(
//!     CustomerInput::new("Juan Pérez", "juan@example.com"),
//!     "Laptop",
//!     2,
//! );
//! let result = service.process_order(request).await?;
//! println!("Total: {}", result.summary.total_value);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod transaction;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, DbConfig};
pub use error::{DbError, DbResult, OrderError, ServiceResult};
pub use pool::{Database, DbConnection};
pub use transaction::{TxContext, TxFuture};

// Repository re-exports for convenience
pub use repository::{CustomerRepository, OrderRepository, ProductRepository};

pub use service::{BatchItemError, BatchItemResult, BatchResult, OrderService};
