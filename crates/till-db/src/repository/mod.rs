//! # Repository Module
//!
//! Database repository implementations for the ledger.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reads (pool)                          Writes (transaction)             │
//! │  ────────────                          ────────────────────             │
//! │  db.sales().get_by_id(7)               let mut tx = db.begin().await?;  │
//! │  db.sales().list(&filter)              ProductRepository::set_quantity( │
//! │  db.cash_sessions().today(date)            &mut tx, id, qty, now)       │
//! │       │                                SaleRepository::insert(          │
//! │       │  borrows a pooled connection       &mut tx, &new_sale)          │
//! │       ▼                                tx.commit().await?;              │
//! │  SQLite                                     │                           │
//! │                                             ▼  all-or-nothing           │
//! │                                        SQLite                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Associated functions taking `&mut SqliteConnection` compose inside one
//! transaction; methods on `&self` are standalone reads or self-contained
//! writes.
//!
//! ## Available Repositories
//!
//! - [`settings::SettingsRepository`] - Store settings and invoice numbers
//! - [`catalog::CustomerRepository`], [`catalog::ServiceRepository`] - Catalog lookups
//! - [`product::ProductRepository`] - Products and stock levels
//! - [`inventory::InventoryRepository`] - Inventory movement audit trail
//! - [`sale::SaleRepository`] - Sales and sale items
//! - [`cash_session::CashSessionRepository`] - Cash sessions and expenses

pub mod cash_session;
pub mod catalog;
pub mod inventory;
pub mod product;
pub mod sale;
pub mod settings;

/// Default page size for list queries.
pub const DEFAULT_LIMIT: u32 = 100;

/// Upper bound for a single page.
pub const MAX_LIMIT: u32 = 1_000;

/// Clamps a requested page size into `1..=MAX_LIMIT`.
pub(crate) fn page_size(limit: Option<u32>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as i64
}
