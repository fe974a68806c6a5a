//! # Order Repository
//!
//! Order rows, joined views, cancellation and statistics.
//!
//! ## Order Row Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One row per order line                               │
//! │                                                                         │
//! │  orders                                                                │
//! │  ├── customer_id ──► customers.id                                      │
//! │  ├── product_id  ──► products.id                                       │
//! │  ├── quantity          (> 0)                                           │
//! │  ├── unit_price_cents  (snapshot of products.price_cents)              │
//! │  ├── total_cents       (quantity × unit_price_cents)                   │
//! │  └── status            pending | completed | cancelled                 │
//! │                                                                         │
//! │  Reads go through OrderDetail: the row plus customer name/email and    │
//! │  product name.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult, ServiceResult};
use tienda_core::{
    CoreError, Money, Order, OrderCancellation, OrderDetail, OrderStatistics, OrderStatus,
};

const DETAIL_SELECT: &str = r#"
    SELECT
        o.id,
        o.customer_id,
        c.name AS customer_name,
        c.email AS customer_email,
        o.product_id,
        p.name AS product_name,
        o.quantity,
        o.unit_price_cents,
        o.total_cents,
        o.status,
        o.created_at
    FROM orders o
    INNER JOIN customers c ON c.id = o.customer_id
    INNER JOIN products p ON p.id = o.product_id
"#;

/// Repository for order rows, bound to the connection of the current unit
/// of work.
#[derive(Debug)]
pub struct OrderRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> OrderRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        OrderRepository { conn }
    }

    /// Creates a pending order line.
    ///
    /// ## Snapshot Pattern
    /// `unit_price` is the product price at order time. The total is
    /// computed here, never trusted from the caller.
    ///
    /// ## Errors
    /// * `CoreError::ReferentialIntegrity` - customer or product row missing
    pub async fn create(
        &mut self,
        customer_id: &str,
        product_id: &str,
        quantity: i64,
        unit_price: Money,
    ) -> ServiceResult<Order> {
        let order = Order {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents: unit_price.cents(),
            total_cents: (unit_price * quantity).cents(),
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_id, product_id, quantity,
                unit_price_cents, total_cents, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_id)
        .bind(&order.product_id)
        .bind(order.quantity)
        .bind(order.unit_price_cents)
        .bind(order.total_cents)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&mut *self.conn)
        .await;

        match inserted.map_err(DbError::from) {
            Ok(_) => {
                debug!(
                    id = %order.id,
                    product_id = %product_id,
                    quantity,
                    total_cents = order.total_cents,
                    "Order created"
                );
                Ok(order)
            }
            Err(DbError::ForeignKeyViolation { .. }) => {
                Err(self.dangling_reference(customer_id, product_id).await?.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Works out which side of a rejected insert was missing.
    async fn dangling_reference(&mut self, customer_id: &str, product_id: &str) -> DbResult<CoreError> {
        let customer_exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?1)")
                .bind(customer_id)
                .fetch_one(&mut *self.conn)
                .await?;

        let (reference, id) = if customer_exists != 0 {
            ("product", product_id)
        } else {
            ("customer", customer_id)
        };

        Ok(CoreError::ReferentialIntegrity {
            reference: reference.to_string(),
            id: id.to_string(),
        })
    }

    /// Gets one order with customer and product details.
    pub async fn by_id(&mut self, order_id: &str) -> DbResult<Option<OrderDetail>> {
        let sql = format!("{DETAIL_SELECT} WHERE o.id = ?1");
        let order = sqlx::query_as::<_, OrderDetail>(&sql)
            .bind(order_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(order)
    }

    /// Lists all orders, newest first.
    pub async fn list_all(&mut self) -> DbResult<Vec<OrderDetail>> {
        let sql = format!("{DETAIL_SELECT} ORDER BY o.created_at DESC, o.rowid DESC");
        let orders = sqlx::query_as::<_, OrderDetail>(&sql)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(orders)
    }

    /// Lists one customer's orders, newest first.
    pub async fn list_by_customer(&mut self, customer_id: &str) -> DbResult<Vec<OrderDetail>> {
        let sql = format!(
            "{DETAIL_SELECT} WHERE o.customer_id = ?1 ORDER BY o.created_at DESC, o.rowid DESC"
        );
        let orders = sqlx::query_as::<_, OrderDetail>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(orders)
    }

    /// The `limit` most recent orders.
    pub async fn recent(&mut self, limit: i64) -> DbResult<Vec<OrderDetail>> {
        let sql = format!("{DETAIL_SELECT} ORDER BY o.created_at DESC, o.rowid DESC LIMIT ?1");
        let orders = sqlx::query_as::<_, OrderDetail>(&sql)
            .bind(limit)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(orders)
    }

    /// Removes an order and returns it as it was.
    ///
    /// Stock is not touched here; the caller restores it in the same unit
    /// of work.
    ///
    /// ## Errors
    /// * `CoreError::OrderNotFound` - no such order
    /// * `CoreError::AlreadyCancelled` - status is already `cancelled`
    pub async fn cancel(&mut self, order_id: &str) -> ServiceResult<OrderCancellation> {
        let order = self
            .by_id(order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;

        if order.status == OrderStatus::Cancelled {
            return Err(CoreError::AlreadyCancelled(order_id.to_string()).into());
        }

        sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(order_id)
            .execute(&mut *self.conn)
            .await?;

        debug!(id = %order_id, "Order removed");

        Ok(OrderCancellation {
            order,
            success: true,
        })
    }

    /// Count, revenue, average value and distinct customers over every
    /// order that is not cancelled.
    pub async fn aggregate_statistics(&mut self) -> DbResult<OrderStatistics> {
        let (order_count, revenue_cents, distinct_customers): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(total_cents), 0),
                COUNT(DISTINCT customer_id)
            FROM orders
            WHERE status != 'cancelled'
            "#,
        )
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(OrderStatistics::from_totals(
            order_count,
            revenue_cents,
            distinct_customers,
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrderError;
    use crate::repository::{CustomerRepository, ProductRepository};
    use crate::{Database, DbConfig};
    use tienda_core::{CustomerInput, NewProduct};

    struct Fixture {
        db: Database,
        customer_id: String,
        product_id: String,
    }

    async fn setup() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let customer = CustomerRepository::new(&mut *conn)
            .create_or_reuse(&CustomerInput::new("Ana", "ana@example.com"))
            .await
            .unwrap()
            .customer;
        let product = ProductRepository::new(&mut *conn)
            .insert(&NewProduct::new("Mouse", 2_500, 50, 5))
            .await
            .unwrap();

        db.release(conn);
        Fixture {
            db,
            customer_id: customer.id,
            product_id: product.id,
        }
    }

    #[tokio::test]
    async fn test_create_computes_total() {
        let fx = setup().await;
        let mut conn = fx.db.acquire().await.unwrap();
        let mut repo = OrderRepository::new(&mut *conn);

        let order = repo
            .create(&fx.customer_id, &fx.product_id, 3, Money::from_cents(2_500))
            .await
            .unwrap();
        assert_eq!(order.total_cents, 7_500);
        assert_eq!(order.status, OrderStatus::Pending);

        let detail = repo.by_id(&order.id).await.unwrap().unwrap();
        assert_eq!(detail.customer_name, "Ana");
        assert_eq!(detail.product_name, "Mouse");
        assert_eq!(detail.total_cents, 7_500);
    }

    #[tokio::test]
    async fn test_missing_references_reported_by_side() {
        let fx = setup().await;
        let mut conn = fx.db.acquire().await.unwrap();
        let mut repo = OrderRepository::new(&mut *conn);

        let err = repo
            .create("no-such-customer", &fx.product_id, 1, Money::from_cents(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Core(CoreError::ReferentialIntegrity { ref reference, .. }) if reference == "customer"
        ));

        let err = repo
            .create(&fx.customer_id, "no-such-product", 1, Money::from_cents(100))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::Core(CoreError::ReferentialIntegrity { ref reference, ref id }) if reference == "product" && id == "no-such-product"
        ));
    }

    #[tokio::test]
    async fn test_cancel_removes_order() {
        let fx = setup().await;
        let mut conn = fx.db.acquire().await.unwrap();
        let mut repo = OrderRepository::new(&mut *conn);

        let order = repo
            .create(&fx.customer_id, &fx.product_id, 2, Money::from_cents(2_500))
            .await
            .unwrap();

        let cancelled = repo.cancel(&order.id).await.unwrap();
        assert!(cancelled.success);
        assert_eq!(cancelled.order.quantity, 2);
        assert!(repo.by_id(&order.id).await.unwrap().is_none());

        let again = repo.cancel(&order.id).await.unwrap_err();
        assert!(matches!(again, OrderError::Core(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_cancel_rejects_cancelled_status() {
        let fx = setup().await;
        let mut conn = fx.db.acquire().await.unwrap();

        let order = OrderRepository::new(&mut *conn)
            .create(&fx.customer_id, &fx.product_id, 1, Money::from_cents(2_500))
            .await
            .unwrap();
        sqlx::query("UPDATE orders SET status = 'cancelled' WHERE id = ?1")
            .bind(&order.id)
            .execute(&mut *conn)
            .await
            .unwrap();

        let err = OrderRepository::new(&mut *conn).cancel(&order.id).await.unwrap_err();
        assert!(matches!(err, OrderError::Core(CoreError::AlreadyCancelled(_))));
    }

    #[tokio::test]
    async fn test_statistics_exclude_cancelled() {
        let fx = setup().await;
        let mut conn = fx.db.acquire().await.unwrap();

        let empty = OrderRepository::new(&mut *conn).aggregate_statistics().await.unwrap();
        assert_eq!(empty.order_count, 0);
        assert!(empty.average_order_value.is_zero());

        let mut repo = OrderRepository::new(&mut *conn);
        repo.create(&fx.customer_id, &fx.product_id, 1, Money::from_cents(1_000))
            .await
            .unwrap();
        repo.create(&fx.customer_id, &fx.product_id, 2, Money::from_cents(1_000))
            .await
            .unwrap();
        let dropped = repo
            .create(&fx.customer_id, &fx.product_id, 5, Money::from_cents(1_000))
            .await
            .unwrap();
        sqlx::query("UPDATE orders SET status = 'cancelled' WHERE id = ?1")
            .bind(&dropped.id)
            .execute(&mut *conn)
            .await
            .unwrap();

        let stats = OrderRepository::new(&mut *conn).aggregate_statistics().await.unwrap();
        assert_eq!(stats.order_count, 2);
        assert_eq!(stats.total_revenue.cents(), 3_000);
        assert_eq!(stats.average_order_value.cents(), 1_500);
        assert_eq!(stats.distinct_customers, 1);
    }

    #[tokio::test]
    async fn test_listings_newest_first() {
        let fx = setup().await;
        let mut conn = fx.db.acquire().await.unwrap();
        let mut repo = OrderRepository::new(&mut *conn);

        let first = repo
            .create(&fx.customer_id, &fx.product_id, 1, Money::from_cents(2_500))
            .await
            .unwrap();
        let second = repo
            .create(&fx.customer_id, &fx.product_id, 4, Money::from_cents(2_500))
            .await
            .unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);

        assert_eq!(repo.list_by_customer(&fx.customer_id).await.unwrap().len(), 2);
        assert!(repo.list_by_customer("someone-else").await.unwrap().is_empty());
        assert_eq!(repo.recent(1).await.unwrap()[0].id, second.id);
    }
}
