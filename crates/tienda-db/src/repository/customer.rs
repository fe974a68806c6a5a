//! # Customer Repository
//!
//! Customers are identified by email. Submitting an email again either reuses
//! the stored customer (same name) or is rejected (different name).
//!
//! ## Resolution Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create_or_reuse(name, email)                         │
//! │                                                                         │
//! │  SELECT ... WHERE email = ?                                            │
//! │       │                                                                 │
//! │       ├── none ────────────► INSERT ──► { customer, created: true }    │
//! │       │                        │                                        │
//! │       │                        └── UNIQUE failed (concurrent insert)   │
//! │       │                               └── re-read, apply rules below   │
//! │       │                                                                 │
//! │       ├── same name ───────► { existing, created: false }              │
//! │       │                                                                 │
//! │       └── other name ──────► IdentityConflict (no write at all)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult, ServiceResult};
use tienda_core::{CoreError, Customer, CustomerInput, CustomerResolution};

/// Repository for customer rows, bound to the connection of the current
/// unit of work.
#[derive(Debug)]
pub struct CustomerRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CustomerRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CustomerRepository { conn }
    }

    /// Gets a customer by email.
    pub async fn find_by_email(&mut self, email: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone, address, created_at
            FROM customers
            WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by ID.
    pub async fn find_by_id(&mut self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone, address, created_at
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(customer)
    }

    /// Lists all customers, newest first.
    pub async fn list_all(&mut self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone, address, created_at
            FROM customers
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(customers)
    }

    /// Returns the customer registered under `input.email`, inserting it if
    /// the email is new.
    ///
    /// `input` is expected to be normalized (trimmed, validated).
    ///
    /// ## Errors
    /// * `CoreError::IdentityConflict` - email on record under another name
    pub async fn create_or_reuse(&mut self, input: &CustomerInput) -> ServiceResult<CustomerResolution> {
        if let Some(existing) = self.find_by_email(&input.email).await? {
            let customer = ensure_same_identity(existing, input)?;
            debug!(id = %customer.id, email = %customer.email, "Reusing customer");
            return Ok(CustomerResolution {
                customer,
                created: false,
            });
        }

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            created_at: Utc::now(),
        };

        match self.insert(&customer).await {
            Ok(()) => {
                debug!(id = %customer.id, email = %customer.email, "Customer created");
                Ok(CustomerResolution {
                    customer,
                    created: true,
                })
            }
            Err(DbError::UniqueViolation { .. }) => {
                // Another unit of work inserted the same email first
                let existing = self
                    .find_by_email(&input.email)
                    .await?
                    .ok_or_else(|| DbError::duplicate("customers.email", &input.email))?;
                let customer = ensure_same_identity(existing, input)?;
                Ok(CustomerResolution {
                    customer,
                    created: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(&mut self, customer: &Customer) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.created_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }
}

/// The stored name must match the submitted one exactly.
fn ensure_same_identity(existing: Customer, input: &CustomerInput) -> Result<Customer, CoreError> {
    if existing.name == input.name {
        Ok(existing)
    } else {
        Err(CoreError::IdentityConflict {
            email: existing.email,
            existing_name: existing.name,
            submitted_name: input.name.clone(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrderError;
    use crate::{Database, DbConfig};

    async fn count(conn: &mut SqliteConnection) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(conn)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_reuse() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let input = CustomerInput::new("Juan Pérez", "juan@example.com").with_phone("555-0101");

        let first = CustomerRepository::new(&mut *conn).create_or_reuse(&input).await.unwrap();
        assert!(first.created);
        assert_eq!(first.customer.phone.as_deref(), Some("555-0101"));

        let second = CustomerRepository::new(&mut *conn).create_or_reuse(&input).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.customer.id, first.customer.id);
        assert_eq!(count(&mut *conn).await, 1);
    }

    #[tokio::test]
    async fn test_identity_conflict_writes_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        CustomerRepository::new(&mut *conn)
            .create_or_reuse(&CustomerInput::new("Juan Pérez", "juan@example.com"))
            .await
            .unwrap();

        let err = CustomerRepository::new(&mut *conn)
            .create_or_reuse(&CustomerInput::new("Juan Perez", "juan@example.com"))
            .await
            .unwrap_err();

        match err {
            OrderError::Core(CoreError::IdentityConflict {
                existing_name,
                submitted_name,
                ..
            }) => {
                assert_eq!(existing_name, "Juan Pérez");
                assert_eq!(submitted_name, "Juan Perez");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let stored = CustomerRepository::new(&mut *conn)
            .find_by_email("juan@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "Juan Pérez");
        assert_eq!(count(&mut *conn).await, 1);
    }

    #[tokio::test]
    async fn test_find_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();
        let mut repo = CustomerRepository::new(&mut *conn);

        assert!(repo.find_by_email("nadie@example.com").await.unwrap().is_none());

        let ana = repo
            .create_or_reuse(&CustomerInput::new("Ana", "ana@example.com"))
            .await
            .unwrap()
            .customer;
        repo.create_or_reuse(&CustomerInput::new("Luis", "luis@example.com"))
            .await
            .unwrap();

        let found = repo.find_by_id(&ana.id).await.unwrap().unwrap();
        assert_eq!(found.email, "ana@example.com");

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Luis");
    }
}
