//! # Service Module
//!
//! The order orchestrator: every public operation is one unit of work run
//! through [`Database::run_in_transaction`](crate::Database::run_in_transaction).
//!
//! - [`OrderService`] - process, cancel, restock, summary and listings
//! - [`BatchResult`] - per-request outcomes of `batch_process_orders`

pub mod batch;
pub mod order;

pub use batch::{BatchItemError, BatchItemResult, BatchResult};
pub use order::OrderService;
