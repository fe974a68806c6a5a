//! # Order Service
//!
//! Business operations over the repositories, each one a single unit of
//! work.
//!
//! ## process_order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         process_order(request)                          │
//! │                                                                         │
//! │  1. Normalize ─────── ValidationError (no transaction opened)          │
//! │       │                                                                 │
//! │  ═════╪═══════════════ BEGIN ═══════════════════════════════════════   │
//! │       ▼                                                                 │
//! │  2. Resolve customer ─ IdentityConflict                                │
//! │       │                                                                 │
//! │  3. Validate ALL lines before any write                                │
//! │       ├── unknown name ─────────────────── ProductNotFound             │
//! │       └── cumulative qty > stock ───────── InsufficientStock           │
//! │       │                                                                 │
//! │  4. simulate_error? ─ SimulatedFailure                                 │
//! │       │                                                                 │
//! │  5. Per line: INSERT order, decrement stock                            │
//! │       │                                                                 │
//! │  ═════╪═══════════════ COMMIT (any error above → ROLLBACK) ══════════   │
//! │       ▼                                                                 │
//! │  6. OrderResult { customer, processed_products, orders, summary }      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::error::{OrderError, ServiceResult};
use crate::pool::Database;
use crate::repository::{CustomerRepository, OrderRepository, ProductRepository};
use crate::transaction::{TxContext, TxFuture};
use tienda_core::validation::{validate_product_name, validate_quantity};
use tienda_core::{
    CancellationResult, CoreError, Customer, CustomerInput, OrderDetail, OrderLine,
    OrderRequest, OrderResult, OrderSummary, ProcessedProduct, Product, Summary,
    ValidationError, RECENT_ORDERS_LIMIT,
};

/// Order orchestration over an injected [`Database`].
///
/// Cloning is cheap: clones share the same pool.
#[derive(Debug, Clone)]
pub struct OrderService {
    db: Database,
}

impl OrderService {
    pub fn new(db: Database) -> Self {
        OrderService { db }
    }

    /// The database this service runs on.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Validates and persists an order request atomically.
    ///
    /// Either every line is written and every stock decremented, or nothing
    /// is, including a customer row created for this request.
    pub async fn process_order(&self, request: OrderRequest) -> ServiceResult<OrderResult> {
        let customer = request.customer.normalized()?;
        let lines = request.normalize()?;
        let simulate_error = request.simulate_error;

        let context = order_context(&customer, &lines, simulate_error);

        info!(
            customer = %customer.email,
            lines = lines.len(),
            "Processing order"
        );

        let outcome = self
            .db
            .run_in_transaction(&context, move |conn| {
                Box::pin(execute_order(conn, customer, lines, simulate_error))
            })
            .await;

        match &outcome {
            Ok(result) => info!(
                customer_id = %result.customer.id,
                orders = result.orders.len(),
                total = %result.summary.total_value,
                "Order processed"
            ),
            Err(e) => warn!(code = ?e.code(), error = %e, "Order rejected"),
        }

        outcome
    }

    /// Cancels an order and puts its quantity back into stock.
    ///
    /// The order row is removed; a second cancel reports `OrderNotFound`.
    pub async fn cancel_order(&self, order_id: &str) -> ServiceResult<CancellationResult> {
        let order_id = order_id.trim().to_string();
        if order_id.is_empty() {
            return Err(ValidationError::Required {
                field: "order_id".to_string(),
            }
            .into());
        }

        let context = TxContext::new("cancel_order").with("order", &order_id);

        let outcome = self
            .db
            .run_in_transaction(&context, move |conn| Box::pin(execute_cancel(conn, order_id)))
            .await;

        match &outcome {
            Ok(result) => info!(
                order_id = %result.order.id,
                product = %result.product.name,
                restored = result.restored_quantity,
                "Order cancelled"
            ),
            Err(e) => warn!(code = ?e.code(), error = %e, "Cancellation rejected"),
        }

        outcome
    }

    /// Adds `quantity` units to a product's stock.
    ///
    /// `quantity` has the same bounds as an order line.
    pub async fn restock(&self, product: &str, quantity: i64) -> ServiceResult<Product> {
        validate_product_name(product)?;
        validate_quantity(quantity)?;

        let name = product.trim().to_string();
        let context = TxContext::new("restock")
            .with("product", &name)
            .with("quantity", quantity);

        self.db
            .run_in_transaction(&context, move |conn| Box::pin(execute_restock(conn, name, quantity)))
            .await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Statistics, recent orders and low-stock products, read in one
    /// transaction so the three views agree.
    pub async fn get_summary(&self) -> ServiceResult<Summary> {
        let context = TxContext::new("get_summary");
        self.db
            .run_in_transaction(&context, |conn| Box::pin(read_summary(conn)))
            .await
    }

    pub async fn list_customers(&self) -> ServiceResult<Vec<Customer>> {
        self.read(|conn| {
            Box::pin(async move {
                CustomerRepository::new(conn)
                    .list_all()
                    .await
                    .map_err(OrderError::from)
            })
        })
        .await
    }

    pub async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        self.read(|conn| {
            Box::pin(async move {
                ProductRepository::new(conn)
                    .list_all()
                    .await
                    .map_err(OrderError::from)
            })
        })
        .await
    }

    pub async fn list_orders(&self) -> ServiceResult<Vec<OrderDetail>> {
        self.read(|conn| {
            Box::pin(async move {
                OrderRepository::new(conn)
                    .list_all()
                    .await
                    .map_err(OrderError::from)
            })
        })
        .await
    }

    pub async fn list_orders_by_customer(&self, customer_id: &str) -> ServiceResult<Vec<OrderDetail>> {
        let customer_id = customer_id.to_string();
        self.read(move |conn| {
            Box::pin(async move {
                OrderRepository::new(conn)
                    .list_by_customer(&customer_id)
                    .await
                    .map_err(OrderError::from)
            })
        })
        .await
    }

    /// Gets one order.
    ///
    /// ## Errors
    /// * `CoreError::OrderNotFound` - no such order
    pub async fn get_order(&self, order_id: &str) -> ServiceResult<OrderDetail> {
        let order_id = order_id.to_string();
        self.read(move |conn| {
            Box::pin(async move {
                OrderRepository::new(conn)
                    .by_id(&order_id)
                    .await?
                    .ok_or_else(|| OrderError::from(CoreError::OrderNotFound(order_id.clone())))
            })
        })
        .await
    }

    /// Runs a read on a pooled connection without a transaction.
    async fn read<T, F>(&self, read: F) -> ServiceResult<T>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> TxFuture<'c, T, OrderError> + Send,
        T: Send,
    {
        let mut conn = self.db.acquire().await?;
        let result = read(&mut *conn).await;
        self.db.release(conn);
        result
    }
}

// =============================================================================
// Units of Work
// =============================================================================

/// Log context for an order: customer, every `name×qty` line, simulate flag.
fn order_context(customer: &CustomerInput, lines: &[OrderLine], simulate_error: bool) -> TxContext {
    let products = lines
        .iter()
        .map(|line| format!("{}×{}", line.product, line.quantity))
        .collect::<Vec<_>>()
        .join(",");

    TxContext::new("process_order")
        .with("customer", &customer.email)
        .with("products", products)
        .with("simulate_error", simulate_error)
}

async fn execute_order(
    conn: &mut SqliteConnection,
    customer: CustomerInput,
    lines: Vec<OrderLine>,
    simulate_error: bool,
) -> ServiceResult<OrderResult> {
    // Step 2
    let resolution = CustomerRepository::new(&mut *conn)
        .create_or_reuse(&customer)
        .await?;

    // Step 3: nothing is written until every line has passed
    let mut products = ProductRepository::new(&mut *conn);
    let mut demand: HashMap<String, i64> = HashMap::new();
    let mut resolved: Vec<(OrderLine, Product)> = Vec::with_capacity(lines.len());

    for line in lines {
        let product = products
            .find_by_name(&line.product)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(line.product.clone()))?;

        let requested = demand.entry(product.id.clone()).or_insert(0);
        *requested += line.quantity;

        if !products.check_stock(&product.id, *requested).await? {
            return Err(CoreError::insufficient_stock(&product.name, product.stock, *requested).into());
        }

        resolved.push((line, product));
    }

    // Step 4
    if simulate_error {
        return Err(CoreError::SimulatedFailure("Error simulated after validation".to_string()).into());
    }

    // Step 5
    let mut processed_products = Vec::with_capacity(resolved.len());
    let mut orders = Vec::with_capacity(resolved.len());
    let mut summary = OrderSummary::default();

    for (line, product) in resolved {
        let order = OrderRepository::new(&mut *conn)
            .create(&resolution.customer.id, &product.id, line.quantity, product.price())
            .await?;

        let updated = ProductRepository::new(&mut *conn)
            .decrement_stock(&product.id, line.quantity)
            .await?;

        processed_products.push(ProcessedProduct {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity: line.quantity,
            previous_stock: updated.stock + line.quantity,
            new_stock: updated.stock,
        });
        summary.push_line(&product.name, line.quantity, product.price());
        orders.push(order);
    }

    debug!(lines = summary.line_count, units = summary.total_units, "Order lines persisted");

    Ok(OrderResult {
        customer: resolution.customer,
        customer_created: resolution.created,
        processed_products,
        orders,
        summary,
    })
}

async fn execute_cancel(conn: &mut SqliteConnection, order_id: String) -> ServiceResult<CancellationResult> {
    let cancellation = OrderRepository::new(&mut *conn).cancel(&order_id).await?;

    let product = ProductRepository::new(&mut *conn)
        .restore_stock(&cancellation.order.product_id, cancellation.order.quantity)
        .await?;

    Ok(CancellationResult {
        restored_quantity: cancellation.order.quantity,
        order: cancellation.order,
        product,
        success: cancellation.success,
    })
}

async fn execute_restock(conn: &mut SqliteConnection, name: String, quantity: i64) -> ServiceResult<Product> {
    let mut products = ProductRepository::new(conn);

    let product = products
        .find_by_name(&name)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(name.clone()))?;

    products.restore_stock(&product.id, quantity).await
}

async fn read_summary(conn: &mut SqliteConnection) -> ServiceResult<Summary> {
    let mut orders = OrderRepository::new(&mut *conn);
    let statistics = orders.aggregate_statistics().await?;
    let recent_orders = orders.recent(RECENT_ORDERS_LIMIT).await?;

    let low_stock_products = ProductRepository::new(&mut *conn).list_low_stock().await?;

    Ok(Summary {
        statistics,
        recent_orders,
        low_stock_products,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
