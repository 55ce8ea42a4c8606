//! # Product Repository
//!
//! Database operations for products and their stock levels.
//!
//! ## Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Stock is only ever written inside a transaction that also appends     │
//! │  an inventory movement:                                                 │
//! │                                                                         │
//! │  insert()        products row  +  movement(kind = creation)             │
//! │  set_quantity()  called by the inventory gateway, which appends the     │
//! │                  sale / cancellation / adjustment movement itself       │
//! │                                                                         │
//! │  CHECK (quantity >= 0) backs the gateway's own stock check.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use super::inventory::{InventoryRepository, NewMovement};
use crate::error::{DbError, DbResult};
use till_core::validation::{validate_description, validate_non_negative, validate_product_code};
use till_core::{Money, MovementKind, Product};

#[derive(Debug, FromRow)]
struct ProductRow {
    id: i64,
    code: String,
    description: String,
    quantity: i64,
    cost_price_cents: Money,
    sale_price_cents: Money,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            code: row.code,
            description: row.description,
            quantity: row.quantity,
            cost_price: row.cost_price_cents,
            sale_price: row.sale_price_cents,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = r#"
    id, code, description, quantity, cost_price_cents, sale_price_cents,
    is_active, created_at, updated_at
"#;

/// Product to register, with its opening stock.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub code: String,
    pub description: String,
    pub quantity: i64,
    pub cost_price: Money,
    pub sale_price: Money,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Loads a product on an existing connection.
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(row.map(Product::from))
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE code = ?1", PRODUCT_COLUMNS);
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Inserts a product and its `creation` movement atomically.
    ///
    /// ## Arguments
    /// * `new` - Product data including opening stock
    /// * `actor_id` - User registering the product (recorded on the movement)
    pub async fn insert(&self, new: &NewProduct, actor_id: i64) -> DbResult<Product> {
        validate_product_code(&new.code)?;
        validate_description("description", &new.description)?;
        validate_non_negative("cost_price", new.cost_price)?;
        validate_non_negative("sale_price", new.sale_price)?;

        debug!(code = %new.code, quantity = new.quantity, "Inserting product");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO products (
                code, description, quantity, cost_price_cents, sale_price_cents,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
            "#,
        )
        .bind(new.code.trim())
        .bind(new.description.trim())
        .bind(new.quantity)
        .bind(new.cost_price)
        .bind(new.sale_price)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, new.code.trim()),
            other => other,
        })?
        .last_insert_rowid();

        InventoryRepository::append(
            &mut tx,
            &NewMovement {
                product_id: id,
                product_code: new.code.trim().to_string(),
                quantity_delta: new.quantity,
                resulting_quantity: new.quantity,
                kind: MovementKind::Creation,
                actor_id,
                note: Some("Initial stock".to_string()),
                created_at: now,
            },
        )
        .await?;

        let product = Self::fetch(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        tx.commit().await?;
        Ok(product)
    }

    /// Overwrites the stock level of a product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no such product
    /// * `Err(DbError::CheckViolation)` - `quantity` is negative
    pub async fn set_quantity(
        conn: &mut SqliteConnection,
        id: i64,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = id, quantity = quantity, "Updating stock");

        let result = sqlx::query("UPDATE products SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(quantity)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Active products at or below `threshold`, lowest stock first.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE is_active = 1 AND quantity <= ?1 ORDER BY quantity, code",
            PRODUCT_COLUMNS
        );
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Soft-deletes a product; its sales and movements stay intact.
    pub async fn deactivate(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
