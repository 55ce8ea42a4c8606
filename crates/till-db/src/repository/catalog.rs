//! # Catalog Repositories
//!
//! Lookups for customers and services. Their CRUD rules live with the
//! catalog owner; the ledger only needs to resolve ids at sale time and the
//! seed binary needs to create a few rows.

use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{Customer, Money, Service};

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: i64,
    full_name: String,
    document_type: String,
    document_number: String,
    is_active: bool,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            full_name: row.full_name,
            document_type: row.document_type,
            document_number: row.document_number,
            is_active: row.is_active,
        }
    }
}

/// Customer to register.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub full_name: String,
    pub document_type: String,
    pub document_number: String,
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Loads a customer (active or not) on an existing connection.
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, full_name, document_type, document_number, is_active
            FROM customers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Customer::from))
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    pub async fn insert(&self, new: &NewCustomer) -> DbResult<Customer> {
        debug!(document = %new.document_number, "Inserting customer");

        let id = sqlx::query(
            r#"
            INSERT INTO customers (full_name, document_type, document_number, is_active, created_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            "#,
        )
        .bind(&new.full_name)
        .bind(&new.document_type)
        .bind(&new.document_number)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Marks a customer inactive. Past sales keep their snapshot.
    pub async fn deactivate(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE customers SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Services
// =============================================================================

#[derive(Debug, FromRow)]
struct ServiceRow {
    id: i64,
    description: String,
    value_cents: Money,
    is_active: bool,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            description: row.description,
            value: row.value_cents,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

impl ServiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Service>> {
        let row: Option<ServiceRow> = sqlx::query_as(
            "SELECT id, description, value_cents, is_active FROM services WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(Service::from))
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Service>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    pub async fn insert(&self, description: &str, value: Money) -> DbResult<Service> {
        debug!(description = %description, value = %value, "Inserting service");

        let id = sqlx::query(
            r#"
            INSERT INTO services (description, value_cents, is_active, created_at)
            VALUES (?1, ?2, 1, ?3)
            "#,
        )
        .bind(description)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Service", id))
    }

    pub async fn deactivate(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE services SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
