//! # Batch Processing
//!
//! Runs several order requests one after another, each in its own
//! transaction.
//!
//! ## Failure Isolation
//! ```text
//! requests:   [ r0 ]  [ r1 ]  [ r2 ]  [ r3 ]
//!               │       │       │       │
//!             COMMIT  ROLLBACK  │       │
//!               ✓       ✗       │       │
//!                       │       │       │
//!   stop_on_first_error = false ──► r2, r3 still run
//!   stop_on_first_error = true  ──► r2, r3 skipped
//!
//! r0 stays committed either way.
//! ```

use serde::Serialize;
use tracing::{info, warn};

use crate::error::OrderError;
use crate::service::OrderService;
use tienda_core::{ErrorCode, OrderRequest, OrderResult};

/// Why one batch item failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&OrderError> for BatchItemError {
    fn from(err: &OrderError) -> Self {
        BatchItemError {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one request in a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    /// Position in the submitted list.
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<OrderResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BatchItemError>,
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Requests never attempted because the batch stopped early.
    pub skipped: usize,
    pub items: Vec<BatchItemResult>,
}

impl BatchResult {
    fn new(total: usize) -> Self {
        BatchResult {
            total,
            successful: 0,
            failed: 0,
            skipped: 0,
            items: Vec::with_capacity(total),
        }
    }

    /// `true` when every request committed.
    pub fn all_succeeded(&self) -> bool {
        self.successful == self.total
    }

    fn record_success(&mut self, index: usize, result: OrderResult) {
        self.successful += 1;
        self.items.push(BatchItemResult {
            index,
            success: true,
            result: Some(result),
            error: None,
        });
    }

    fn record_failure(&mut self, index: usize, err: &OrderError) {
        self.failed += 1;
        self.items.push(BatchItemResult {
            index,
            success: false,
            result: None,
            error: Some(err.into()),
        });
    }
}

impl OrderService {
    /// Processes `requests` in order, one transaction each.
    ///
    /// A failed request never undoes the ones before it. With
    /// `stop_on_first_error` the remaining requests are skipped.
    pub async fn batch_process_orders(
        &self,
        requests: Vec<OrderRequest>,
        stop_on_first_error: bool,
    ) -> BatchResult {
        let total = requests.len();
        let mut batch = BatchResult::new(total);

        info!(total, stop_on_first_error, "Processing order batch");

        for (index, request) in requests.into_iter().enumerate() {
            match self.process_order(request).await {
                Ok(result) => batch.record_success(index, result),
                Err(err) => {
                    warn!(index, code = ?err.code(), error = %err, "Batch item failed");
                    batch.record_failure(index, &err);

                    if stop_on_first_error {
                        batch.skipped = total - index - 1;
                        break;
                    }
                }
            }
        }

        info!(
            total,
            successful = batch.successful,
            failed = batch.failed,
            skipped = batch.skipped,
            "Batch processing complete"
        );

        batch
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceResult;
    use crate::repository::ProductRepository;
    use crate::{Database, DbConfig, TxContext};
    use tienda_core::{CustomerInput, NewProduct, Product};

    async fn service() -> OrderService {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let inserted: ServiceResult<Product> = db
            .run_in_transaction(&TxContext::new("seed"), |conn| {
                Box::pin(async move {
                    ProductRepository::new(conn)
                        .insert(&NewProduct::new("Mouse", 2_500, 5, 1))
                        .await
                        .map_err(OrderError::from)
                })
            })
            .await;
        inserted.unwrap();
        OrderService::new(db)
    }

    fn requests() -> Vec<OrderRequest> {
        let ana = CustomerInput::new("Ana", "ana@example.com");
        vec![
            OrderRequest::single(ana.clone(), "Mouse", 2),
            OrderRequest::single(ana.clone(), "Mouse", 10),
            OrderRequest::single(ana, "Mouse", 1),
        ]
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let service = service().await;

        let batch = service.batch_process_orders(requests(), false).await;

        assert_eq!(batch.total, 3);
        assert_eq!(batch.successful, 2);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.skipped, 0);
        assert!(!batch.all_succeeded());

        let failure = &batch.items[1];
        assert!(!failure.success);
        assert_eq!(
            failure.error.as_ref().map(|e| e.code),
            Some(ErrorCode::InsufficientStock)
        );

        // 5 - 2 - 1
        let products = service.list_products().await.unwrap();
        assert_eq!(products[0].stock, 2);
    }

    #[tokio::test]
    async fn test_batch_stops_on_first_error() {
        let service = service().await;

        let batch = service.batch_process_orders(requests(), true).await;

        assert_eq!(batch.successful, 1);
        assert_eq!(batch.failed, 1);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.items.len(), 2);

        // The first request stays committed
        assert_eq!(service.list_orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_result_serializes_camel_case() {
        let service = service().await;

        let batch = service.batch_process_orders(requests(), true).await;
        let json = serde_json::to_value(&batch).unwrap();

        assert_eq!(json["items"][1]["error"]["code"], "INSUFFICIENT_STOCK");
        assert!(json["items"][0]["result"]["customerCreated"].as_bool().unwrap());
        assert!(json["items"][1].get("result").is_none());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let service = service().await;
        let batch = service.batch_process_orders(Vec::new(), true).await;
        assert_eq!(batch.total, 0);
        assert!(batch.all_succeeded());
    }
}
