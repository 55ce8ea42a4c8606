//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. INSERT (inside the ledger's transaction)                           │
//! │     └── insert() → Sale { status: Completed } + sale_items rows        │
//! │                                                                         │
//! │  2. (OPTIONAL) CANCEL                                                  │
//! │     └── mark_cancelled() → Sale { status: Cancelled, reason, ... }     │
//! │                                                                         │
//! │  Rows are never deleted.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use super::page_size;
use crate::error::{DbError, DbResult};
use till_core::{
    Cancellation, ItemKind, Money, PaymentMethod, Rate, Sale, SaleItem, SaleStatus,
    SalesByMethod,
};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct SaleRow {
    id: i64,
    invoice_number: String,
    created_at: DateTime<Utc>,
    business_date: NaiveDate,
    customer_id: i64,
    customer_name: String,
    customer_document: String,
    subtotal_cents: Money,
    discount_cents: Money,
    discount_percentage_bps: Option<Rate>,
    tax_applied: bool,
    tax_rate_bps: Option<Rate>,
    tax_cents: Money,
    total_cents: Money,
    payment_method: PaymentMethod,
    created_by: i64,
    created_by_username: String,
    status: SaleStatus,
    cancel_reason: Option<String>,
    cancelled_by: Option<i64>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>) -> Sale {
        let cancellation = match (self.cancel_reason, self.cancelled_by, self.cancelled_at) {
            (Some(reason), Some(cancelled_by), Some(cancelled_at)) => Some(Cancellation {
                reason,
                cancelled_by,
                cancelled_at,
            }),
            _ => None,
        };

        Sale {
            id: self.id,
            invoice_number: self.invoice_number,
            created_at: self.created_at,
            business_date: self.business_date,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_document: self.customer_document,
            items,
            subtotal: self.subtotal_cents,
            discount: self.discount_cents,
            discount_percentage: self.discount_percentage_bps,
            tax_applied: self.tax_applied,
            tax_rate: self.tax_rate_bps,
            tax_amount: self.tax_cents,
            total: self.total_cents,
            payment_method: self.payment_method,
            created_by: self.created_by,
            created_by_username: self.created_by_username,
            status: self.status,
            cancellation,
        }
    }
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    source_id: i64,
    kind: ItemKind,
    quantity: i64,
    unit_price_cents: Money,
    description: String,
    line_total_cents: Money,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            source_id: row.source_id,
            kind: row.kind,
            quantity: row.quantity,
            unit_price: row.unit_price_cents,
            description: row.description,
            line_total: row.line_total_cents,
        }
    }
}

const SALE_COLUMNS: &str = r#"
    s.id, s.invoice_number, s.created_at, s.business_date,
    s.customer_id, s.customer_name, s.customer_document,
    s.subtotal_cents, s.discount_cents, s.discount_percentage_bps,
    s.tax_applied, s.tax_rate_bps, s.tax_cents, s.total_cents,
    s.payment_method, s.created_by, s.created_by_username, s.status,
    s.cancel_reason, s.cancelled_by, s.cancelled_at
"#;

// =============================================================================
// Inputs
// =============================================================================

/// A fully priced sale ready to be written. The id is assigned on insert.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub invoice_number: String,
    pub created_at: DateTime<Utc>,
    pub business_date: NaiveDate,
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_document: String,
    pub items: Vec<SaleItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub discount_percentage: Option<Rate>,
    pub tax_applied: bool,
    pub tax_rate: Option<Rate>,
    pub tax_amount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub created_by: i64,
    pub created_by_username: String,
}

/// Sale history query. Every field is optional; results are newest first.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    /// Exact invoice number.
    pub invoice_number: Option<String>,
    pub customer_id: Option<i64>,
    /// Sales containing at least one line of this product.
    pub product_id: Option<i64>,
    /// Inclusive lower bound on the business date.
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound on the business date (covers the whole day).
    pub end_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub status: Option<SaleStatus>,
    pub offset: u32,
    pub limit: Option<u32>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Writes a sale and its items on the caller's transaction.
    ///
    /// ## Snapshot Pattern
    /// Descriptions and unit prices are copied onto the items, so later
    /// catalog edits never change a past invoice.
    pub async fn insert(conn: &mut SqliteConnection, sale: &NewSale) -> DbResult<Sale> {
        debug!(invoice_number = %sale.invoice_number, total = %sale.total, "Inserting sale");

        let id = sqlx::query(
            r#"
            INSERT INTO sales (
                invoice_number, created_at, business_date,
                customer_id, customer_name, customer_document,
                subtotal_cents, discount_cents, discount_percentage_bps,
                tax_applied, tax_rate_bps, tax_cents, total_cents,
                payment_method, created_by, created_by_username, status
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, 'completed'
            )
            "#,
        )
        .bind(&sale.invoice_number)
        .bind(sale.created_at)
        .bind(sale.business_date)
        .bind(sale.customer_id)
        .bind(&sale.customer_name)
        .bind(&sale.customer_document)
        .bind(sale.subtotal)
        .bind(sale.discount)
        .bind(sale.discount_percentage)
        .bind(sale.tax_applied)
        .bind(sale.tax_rate)
        .bind(sale.tax_amount)
        .bind(sale.total)
        .bind(sale.payment_method)
        .bind(sale.created_by)
        .bind(&sale.created_by_username)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => {
                DbError::duplicate(field, sale.invoice_number.clone())
            }
            other => other,
        })?
        .last_insert_rowid();

        for (position, item) in sale.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    sale_id, position, source_id, kind, quantity,
                    unit_price_cents, description, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(id)
            .bind(position as i64)
            .bind(item.source_id)
            .bind(item.kind)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(&item.description)
            .bind(item.line_total)
            .execute(&mut *conn)
            .await?;
        }

        Self::fetch(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Loads a sale with its items on an existing connection.
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales s WHERE s.id = ?1", SALE_COLUMNS);
        let row: Option<SaleRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => {
                let items = Self::fetch_items(conn, row.id).await?;
                Ok(Some(row.into_sale(items)))
            }
            None => Ok(None),
        }
    }

    async fn fetch_items(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let rows: Vec<SaleItemRow> = sqlx::query_as(
            r#"
            SELECT source_id, kind, quantity, unit_price_cents, description, line_total_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(SaleItem::from).collect())
    }

    /// Gets a sale by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Flips a completed sale to cancelled.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no completed sale with this id
    pub async fn mark_cancelled(
        conn: &mut SqliteConnection,
        id: i64,
        cancellation: &Cancellation,
    ) -> DbResult<()> {
        debug!(id = id, "Cancelling sale");

        let result = sqlx::query(
            r#"
            UPDATE sales SET
                status = 'cancelled',
                cancel_reason = ?2,
                cancelled_by = ?3,
                cancelled_at = ?4
            WHERE id = ?1 AND status = 'completed'
            "#,
        )
        .bind(id)
        .bind(&cancellation.reason)
        .bind(cancellation.cancelled_by)
        .bind(cancellation.cancelled_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale (completed)", id));
        }

        Ok(())
    }

    /// Lists sales matching `filter`, newest first.
    pub async fn list(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM sales s WHERE 1 = 1", SALE_COLUMNS));

        if let Some(invoice_number) = &filter.invoice_number {
            qb.push(" AND s.invoice_number = ")
                .push_bind(invoice_number.trim().to_string());
        }
        if let Some(customer_id) = filter.customer_id {
            qb.push(" AND s.customer_id = ").push_bind(customer_id);
        }
        if let Some(product_id) = filter.product_id {
            qb.push(
                " AND EXISTS (SELECT 1 FROM sale_items i \
                 WHERE i.sale_id = s.id AND i.kind = 'product' AND i.source_id = ",
            )
            .push_bind(product_id)
            .push(")");
        }
        if let Some(start) = filter.start_date {
            qb.push(" AND s.business_date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND s.business_date <= ").push_bind(end);
        }
        if let Some(method) = filter.payment_method {
            qb.push(" AND s.payment_method = ").push_bind(method);
        }
        if let Some(status) = filter.status {
            qb.push(" AND s.status = ").push_bind(status);
        }

        qb.push(" ORDER BY s.created_at DESC, s.id DESC LIMIT ")
            .push_bind(page_size(filter.limit))
            .push(" OFFSET ")
            .push_bind(filter.offset as i64);

        let mut conn = self.pool.acquire().await?;
        let rows: Vec<SaleRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            let items = Self::fetch_items(&mut conn, row.id).await?;
            sales.push(row.into_sale(items));
        }

        debug!(count = sales.len(), "Sale list returned");
        Ok(sales)
    }

    /// Sums completed sales of one business date per payment method.
    pub async fn totals_by_method(
        conn: &mut SqliteConnection,
        business_date: NaiveDate,
    ) -> DbResult<SalesByMethod> {
        let rows: Vec<(PaymentMethod, Money)> = sqlx::query_as(
            r#"
            SELECT payment_method, SUM(total_cents)
            FROM sales
            WHERE business_date = ?1 AND status = 'completed'
            GROUP BY payment_method
            "#,
        )
        .bind(business_date)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::catalog::NewCustomer;
    use crate::{Database, DbConfig};

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db
            .customers()
            .insert(&NewCustomer {
                full_name: "Walk-in".to_string(),
                document_type: "NIT".to_string(),
                document_number: "0".to_string(),
            })
            .await
            .unwrap();
        (db, customer.id)
    }

    fn new_sale(invoice: &str, customer_id: i64, method: PaymentMethod, cents: i64) -> NewSale {
        let item = SaleItem::new(0, ItemKind::AdHocService, 1, Money::from_cents(cents), "Ad-hoc service: setup").unwrap();
        NewSale {
            invoice_number: invoice.to_string(),
            created_at: Utc::now(),
            business_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            customer_id,
            customer_name: "Walk-in".to_string(),
            customer_document: "0".to_string(),
            subtotal: item.line_total,
            discount: Money::zero(),
            discount_percentage: None,
            tax_applied: false,
            tax_rate: None,
            tax_amount: Money::zero(),
            total: item.line_total,
            items: vec![item],
            payment_method: method,
            created_by: 1,
            created_by_username: "cashier".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_fetch_sale() {
        let (db, customer_id) = setup().await;

        let mut tx = db.begin().await.unwrap();
        let sale = SaleRepository::insert(&mut tx, &new_sale("INV-1", customer_id, PaymentMethod::Cash, 1500))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let loaded = db.sales().get_by_id(sale.id).await.unwrap().unwrap();
        assert_eq!(loaded, sale);
        assert_eq!(loaded.status, SaleStatus::Completed);
        assert_eq!(loaded.items.len(), 1);
        assert!(loaded.cancellation.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_is_rejected() {
        let (db, customer_id) = setup().await;

        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert(&mut tx, &new_sale("INV-1", customer_id, PaymentMethod::Cash, 100))
            .await
            .unwrap();
        let err = SaleRepository::insert(&mut tx, &new_sale("INV-1", customer_id, PaymentMethod::Card, 100))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "INV-1"));
    }

    #[tokio::test]
    async fn test_mark_cancelled_only_once() {
        let (db, customer_id) = setup().await;
        let mut tx = db.begin().await.unwrap();
        let sale = SaleRepository::insert(&mut tx, &new_sale("INV-1", customer_id, PaymentMethod::Cash, 100))
            .await
            .unwrap();

        let cancellation = Cancellation {
            reason: "Customer changed mind".to_string(),
            cancelled_by: 9,
            cancelled_at: Utc::now(),
        };
        SaleRepository::mark_cancelled(&mut tx, sale.id, &cancellation)
            .await
            .unwrap();
        assert!(SaleRepository::mark_cancelled(&mut tx, sale.id, &cancellation)
            .await
            .is_err());
        tx.commit().await.unwrap();

        let loaded = db.sales().get_by_id(sale.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SaleStatus::Cancelled);
        assert_eq!(loaded.cancellation.unwrap().cancelled_by, 9);
    }

    #[tokio::test]
    async fn test_totals_by_method_skip_cancelled() {
        let (db, customer_id) = setup().await;
        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert(&mut tx, &new_sale("INV-1", customer_id, PaymentMethod::Cash, 1000))
            .await
            .unwrap();
        SaleRepository::insert(&mut tx, &new_sale("INV-2", customer_id, PaymentMethod::Card, 700))
            .await
            .unwrap();
        let cancelled = SaleRepository::insert(&mut tx, &new_sale("INV-3", customer_id, PaymentMethod::Cash, 300))
            .await
            .unwrap();
        SaleRepository::mark_cancelled(
            &mut tx,
            cancelled.id,
            &Cancellation {
                reason: "Duplicate ticket".to_string(),
                cancelled_by: 1,
                cancelled_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        let totals = SaleRepository::totals_by_method(&mut tx, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap())
            .await
            .unwrap();
        assert_eq!(totals.cash, Money::from_cents(1000));
        assert_eq!(totals.card, Money::from_cents(700));
        assert_eq!(totals.transfer, Money::zero());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (db, customer_id) = setup().await;
        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert(&mut tx, &new_sale("INV-1", customer_id, PaymentMethod::Cash, 1000))
            .await
            .unwrap();
        SaleRepository::insert(&mut tx, &new_sale("INV-2", customer_id, PaymentMethod::Transfer, 700))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let all = db.sales().list(&SaleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].invoice_number, "INV-2");

        let transfers = db
            .sales()
            .list(&SaleFilter {
                payment_method: Some(PaymentMethod::Transfer),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(transfers.len(), 1);

        let by_invoice = db
            .sales()
            .list(&SaleFilter {
                invoice_number: Some("INV-1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_invoice.len(), 1);

        let out_of_range = db
            .sales()
            .list(&SaleFilter {
                start_date: NaiveDate::from_ymd_opt(2026, 3, 15),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(out_of_range.is_empty());

        let page = db
            .sales()
            .list(&SaleFilter {
                offset: 1,
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].invoice_number, "INV-1");
    }
}
