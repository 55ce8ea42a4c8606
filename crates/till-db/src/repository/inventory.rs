//! # Inventory Movement Repository
//!
//! Append-only audit trail of every stock change.
//!
//! ```text
//! product P-1: 10 ──sale(-3)──► 7 ──cancellation(+3)──► 10 ──adjustment(-1)──► 9
//!                    │                  │                       │
//!                    ▼                  ▼                       ▼
//!               movement #1        movement #2             movement #3
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use super::page_size;
use crate::error::DbResult;
use till_core::{InventoryMovement, MovementKind};

#[derive(Debug, FromRow)]
struct MovementRow {
    id: i64,
    product_id: i64,
    product_code: String,
    quantity_delta: i64,
    resulting_quantity: i64,
    kind: MovementKind,
    actor_id: i64,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<MovementRow> for InventoryMovement {
    fn from(row: MovementRow) -> Self {
        InventoryMovement {
            id: row.id,
            product_id: row.product_id,
            product_code: row.product_code,
            quantity_delta: row.quantity_delta,
            resulting_quantity: row.resulting_quantity,
            kind: row.kind,
            actor_id: row.actor_id,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

/// A movement about to be recorded.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: i64,
    pub product_code: String,
    pub quantity_delta: i64,
    pub resulting_quantity: i64,
    pub kind: MovementKind,
    pub actor_id: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Movement history query. Every field is optional; results are newest
/// first.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub product_id: Option<i64>,
    pub product_code: Option<String>,
    pub kind: Option<MovementKind>,
    pub actor_id: Option<i64>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub to: Option<DateTime<Utc>>,
    pub offset: u32,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Appends a movement on the caller's connection (usually a
    /// transaction that also changed the product quantity).
    pub async fn append(conn: &mut SqliteConnection, movement: &NewMovement) -> DbResult<i64> {
        debug!(
            product_id = movement.product_id,
            delta = movement.quantity_delta,
            kind = ?movement.kind,
            "Recording inventory movement"
        );

        let id = sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                product_id, product_code, quantity_delta, resulting_quantity,
                kind, actor_id, note, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(movement.product_id)
        .bind(&movement.product_code)
        .bind(movement.quantity_delta)
        .bind(movement.resulting_quantity)
        .bind(movement.kind)
        .bind(movement.actor_id)
        .bind(&movement.note)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    /// Lists movements matching `filter`, newest first.
    pub async fn list(&self, filter: &MovementFilter) -> DbResult<Vec<InventoryMovement>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT id, product_id, product_code, quantity_delta, resulting_quantity,
                   kind, actor_id, note, created_at
            FROM inventory_movements
            WHERE 1 = 1
            "#,
        );

        if let Some(product_id) = filter.product_id {
            qb.push(" AND product_id = ").push_bind(product_id);
        }
        if let Some(code) = &filter.product_code {
            qb.push(" AND product_code = ").push_bind(code.clone());
        }
        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ").push_bind(kind);
        }
        if let Some(actor_id) = filter.actor_id {
            qb.push(" AND actor_id = ").push_bind(actor_id);
        }
        if let Some(from) = filter.from {
            qb.push(" AND julianday(created_at) >= julianday(")
                .push_bind(from)
                .push(")");
        }
        if let Some(to) = filter.to {
            qb.push(" AND julianday(created_at) <= julianday(")
                .push_bind(to)
                .push(")");
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page_size(filter.limit))
            .push(" OFFSET ")
            .push_bind(filter.offset as i64);

        let rows: Vec<MovementRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(InventoryMovement::from).collect())
    }
}
