//! # till-db: Database Layer for the Till Ledger
//!
//! This crate provides database access for the till ledger.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Data Flow                                   │
//! │                                                                         │
//! │  till-ledger (create_sale, close_session, adjust_stock, ...)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo   │    │ 001_initial  │  │   │
//! │  │   │ Transactions  │    │ CashSession   │    │ _schema.sql  │  │   │
//! │  │   │               │    │ Inventory ... │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (till.db)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sale, cash session, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("till.db")).await?;
//!
//! // Reads go through the pool
//! let sale = db.sales().get_by_id(7).await?;
//!
//! // Multi-table writes share one transaction
//! let mut tx = db.begin().await?;
//! ProductRepository::set_quantity(&mut tx, product_id, 9, now).await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, Storage};

// Repository re-exports for convenience
pub use repository::cash_session::{CashSessionRepository, CloseRecord, NewSession, SessionFilter};
pub use repository::catalog::{CustomerRepository, NewCustomer, ServiceRepository};
pub use repository::inventory::{InventoryRepository, MovementFilter, NewMovement};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::sale::{NewSale, SaleFilter, SaleRepository};
pub use repository::settings::SettingsRepository;
pub use repository::{DEFAULT_LIMIT, MAX_LIMIT};
