//! # Product Repository
//!
//! Catalog reads and stock movements.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, subtract in Rust, write the absolute value            │
//! │     UPDATE products SET stock = 7 WHERE id = ?                         │
//! │     (a concurrent sale between read and write is lost)                 │
//! │                                                                         │
//! │  ✅ CORRECT: conditional delta                                          │
//! │     UPDATE products SET stock = stock - 3                              │
//! │     WHERE id = ? AND stock >= 3                                        │
//! │                                                                         │
//! │  0 rows affected → someone else took the stock → InsufficientStock     │
//! │  CHECK (stock >= 0) in the schema backs this up                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult, ServiceResult};
use tienda_core::{CoreError, NewProduct, Product, ValidationError};

/// Repository for product rows, bound to the connection of the current
/// unit of work.
///
/// ## Usage
/// ```rust,ignore
/// let mut products = ProductRepository::new(conn);
///
/// let laptop = products.find_by_name("Laptop").await?;
/// let updated = products.decrement_stock(&laptop.id, 2).await?;
/// ```
#[derive(Debug)]
pub struct ProductRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductRepository { conn }
    }

    /// Gets a product by its unique name.
    pub async fn find_by_name(&mut self, name: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, stock, min_stock, created_at, updated_at
            FROM products
            WHERE name = ?1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(product)
    }

    /// Gets a product by its ID.
    pub async fn find_by_id(&mut self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, stock, min_stock, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(product)
    }

    /// Lists the catalog sorted by name.
    pub async fn list_all(&mut self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, stock, min_stock, created_at, updated_at
            FROM products
            ORDER BY name
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(products)
    }

    /// Products at or below their restock threshold, emptiest first.
    pub async fn list_low_stock(&mut self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price_cents, stock, min_stock, created_at, updated_at
            FROM products
            WHERE stock <= min_stock
            ORDER BY stock ASC, name
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(products)
    }

    /// Inserts a catalog product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated fields
    /// * `Err(DbError::UniqueViolation)` - name already exists
    pub async fn insert(&mut self, new: &NewProduct) -> DbResult<Product> {
        debug!(name = %new.name, "Inserting product");

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: new.description.clone(),
            price_cents: new.price_cents,
            stock: new.stock,
            min_stock: new.min_stock,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price_cents, stock, min_stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.name.clone(),
            },
            other => other,
        })?;

        Ok(product)
    }

    /// Counts catalog products (for diagnostics).
    pub async fn count(&mut self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }

    /// Checks whether `quantity` units are in stock right now.
    ///
    /// Read-only and unlocked: the answer can be stale by the time a
    /// decrement runs, which is why `decrement_stock` re-checks.
    pub async fn check_stock(&mut self, product_id: &str, quantity: i64) -> DbResult<bool> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        match stock {
            Some(stock) => Ok(stock >= quantity),
            None => Err(DbError::not_found("Product", product_id)),
        }
    }

    /// Takes `quantity` units out of stock and returns the updated row.
    ///
    /// ## Errors
    /// * `CoreError::InsufficientStock` - fewer than `quantity` units. Inside
    ///   `run_in_transaction` the write lock is held, so the read decides;
    ///   the conditional UPDATE only matters on a connection without it
    /// * `DbError::NotFound` - unknown product
    pub async fn decrement_stock(&mut self, product_id: &str, quantity: i64) -> ServiceResult<Product> {
        ensure_positive(quantity)?;

        let current = self
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        if !current.has_stock_for(quantity) {
            return Err(CoreError::insufficient_stock(&current.name, current.stock, quantity).into());
        }

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2,
                updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        let updated = self
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::insufficient_stock(&updated.name, updated.stock, quantity).into());
        }

        debug!(
            id = %product_id,
            previous = current.stock,
            new = updated.stock,
            "Stock decremented"
        );

        Ok(updated)
    }

    /// Puts `quantity` units back into stock and returns the updated row.
    pub async fn restore_stock(&mut self, product_id: &str, quantity: i64) -> ServiceResult<Product> {
        ensure_positive(quantity)?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id).into());
        }

        let updated = self
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        debug!(id = %product_id, quantity, new = updated.stock, "Stock restored");

        Ok(updated)
    }
}

fn ensure_positive(quantity: i64) -> Result<(), ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
