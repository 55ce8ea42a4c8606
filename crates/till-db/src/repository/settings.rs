//! # Settings Repository
//!
//! The singleton `store_settings` row and the invoice counter it carries.
//!
//! ## Invoice Issuance
//! ```text
//! UPDATE store_settings
//!    SET next_invoice_number = next_invoice_number + 1
//!  WHERE id = 1
//! RETURNING invoice_prefix, next_invoice_number - 1
//!      │
//!      ▼
//! "INV-" + 41  →  "INV-41"   (counter now 42)
//! ```
//! One statement, committed on its own: a number is handed out exactly once
//! even if the sale that asked for it later fails (the gap is accepted).

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use till_core::{Money, Rate, StoreSettings};

#[derive(Debug, FromRow)]
struct SettingsRow {
    store_name: String,
    invoice_prefix: String,
    next_invoice_number: i64,
    tax_rate_bps: Rate,
    apply_tax_by_default: bool,
    initial_cash_balance_cents: Money,
    low_stock_threshold: i64,
}

impl From<SettingsRow> for StoreSettings {
    fn from(row: SettingsRow) -> Self {
        StoreSettings {
            store_name: row.store_name,
            invoice_prefix: row.invoice_prefix,
            next_invoice_number: row.next_invoice_number,
            tax_rate: row.tax_rate_bps,
            apply_tax_by_default: row.apply_tax_by_default,
            initial_cash_balance: row.initial_cash_balance_cents,
            low_stock_threshold: row.low_stock_threshold,
        }
    }
}

/// Repository for store settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Inserts `defaults` if no settings row exists yet, then returns the
    /// stored settings. An existing row is never overwritten.
    pub async fn ensure_defaults(&self, defaults: &StoreSettings) -> DbResult<StoreSettings> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO store_settings (
                id, store_name, invoice_prefix, next_invoice_number,
                tax_rate_bps, apply_tax_by_default, initial_cash_balance_cents,
                low_stock_threshold, updated_at
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&defaults.store_name)
        .bind(&defaults.invoice_prefix)
        .bind(defaults.next_invoice_number)
        .bind(defaults.tax_rate)
        .bind(defaults.apply_tax_by_default)
        .bind(defaults.initial_cash_balance)
        .bind(defaults.low_stock_threshold)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            info!(store = %defaults.store_name, "Store settings initialized");
        }

        self.get().await
    }

    /// Returns the store settings.
    pub async fn get(&self) -> DbResult<StoreSettings> {
        let row: Option<SettingsRow> = sqlx::query_as(
            r#"
            SELECT store_name, invoice_prefix, next_invoice_number, tax_rate_bps,
                   apply_tax_by_default, initial_cash_balance_cents, low_stock_threshold
            FROM store_settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(StoreSettings::from)
            .ok_or_else(|| DbError::not_found("StoreSettings", 1))
    }

    /// Issues the next invoice number and advances the counter.
    pub async fn issue_invoice_number(&self) -> DbResult<String> {
        let issued: Option<(String, i64)> = sqlx::query_as(
            r#"
            UPDATE store_settings
            SET next_invoice_number = next_invoice_number + 1,
                updated_at = ?1
            WHERE id = 1
            RETURNING invoice_prefix, next_invoice_number - 1
            "#,
        )
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        let (prefix, number) = issued.ok_or_else(|| DbError::not_found("StoreSettings", 1))?;
        let invoice_number = format!("{}{}", prefix, number);

        debug!(invoice_number = %invoice_number, "Invoice number issued");
        Ok(invoice_number)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use till_core::{Money, StoreSettings};

    #[tokio::test]
    async fn test_ensure_defaults_keeps_existing_row() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let first = StoreSettings {
            initial_cash_balance: Money::from_cents(5_000_000),
            ..StoreSettings::default()
        };
        let stored = db.settings().ensure_defaults(&first).await.unwrap();
        assert_eq!(stored, first);

        let second = StoreSettings {
            store_name: "Other".to_string(),
            ..StoreSettings::default()
        };
        let stored = db.settings().ensure_defaults(&second).await.unwrap();
        assert_eq!(stored.store_name, first.store_name);
        assert_eq!(stored.initial_cash_balance, Money::from_cents(5_000_000));
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_sequential() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.settings()
            .ensure_defaults(&StoreSettings::default())
            .await
            .unwrap();

        assert_eq!(db.settings().issue_invoice_number().await.unwrap(), "INV-1");
        assert_eq!(db.settings().issue_invoice_number().await.unwrap(), "INV-2");
        assert_eq!(db.settings().get().await.unwrap().next_invoice_number, 3);
    }

    #[tokio::test]
    async fn test_missing_settings_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.settings().get().await.is_err());
        assert!(db.settings().issue_invoice_number().await.is_err());
    }
}
