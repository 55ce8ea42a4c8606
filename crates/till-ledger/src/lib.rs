//! # till-ledger: Sale Ledger and Cash Session Engine
//!
//! Records sales, moves stock with them, and reconciles the daily cash
//! drawer.
//!
//! ## Module Organization
//! ```text
//! till_ledger/
//! ├── lib.rs          ◄─── You are here (Till facade, tracing setup)
//! ├── sales.rs        ◄─── Sale ledger: create / cancel / get / list
//! ├── inventory.rs    ◄─── Inventory gateway: reserve / release / adjust
//! ├── cash.rs         ◄─── Cash sessions: open / close / reopen / list
//! ├── clock.rs        ◄─── System and fixed clocks
//! ├── config.rs       ◄─── LedgerConfig (TILL_* environment)
//! └── error.rs        ◄─── LedgerError, ErrorCode, ErrorBody
//! ```
//!
//! ## Serialization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One RwLock<()> shared by every component of a Till:                    │
//! │                                                                         │
//! │   create_sale, cancel_sale,            get_sale, list_sales,            │
//! │   open/close/reopen_session,   vs.     today_session, list_sessions,    │
//! │   adjust_stock                         movements, low_stock             │
//! │        │                                     │                          │
//! │        ▼                                     ▼                          │
//! │   lock.write()  (one at a time)        lock.read()  (concurrent)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Inside a mutation every read and write that must agree runs in one
//! SQLite transaction.
//!
//! ## Usage
//! ```rust,ignore
//! use till_ledger::{init_tracing, LedgerConfig, Till};
//!
//! init_tracing();
//! let till = Till::open(LedgerConfig::from_env()?).await?;
//!
//! let session = till.cash().open_session(&actor, None).await?;
//! let sale = till.sales().create_sale(&request, &actor).await?;
//! ```

pub mod cash;
pub mod clock;
pub mod config;
pub mod error;
pub mod inventory;
pub mod sales;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

use till_db::{Database, DbConfig};

pub use cash::{CashSessionManager, CloseRequest, ExpenseRequest};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, LedgerConfig};
pub use error::{ErrorBody, ErrorCode, LedgerError, LedgerResult};
pub use inventory::{InventoryGateway, StockAdjustment, StockContext};
pub use sales::{SaleLedger, SaleLineRequest, SaleRequest};

/// State shared by every component of one [`Till`].
#[derive(Debug, Clone)]
pub(crate) struct Shared {
    pub(crate) db: Database,
    pub(crate) lock: Arc<RwLock<()>>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// Entry point to the ledger.
///
/// Cheap to clone; clones share the database pool and the lock.
#[derive(Debug, Clone)]
pub struct Till {
    shared: Shared,
}

impl Till {
    /// Opens (or creates) the database at `config.db_path`, applies
    /// migrations and seeds the store settings on first use.
    pub async fn open(config: LedgerConfig) -> LedgerResult<Self> {
        let db = Database::new(DbConfig::new(config.db_path.clone())).await?;
        Self::with_database(db, &config, Arc::new(SystemClock)).await
    }

    /// Builds a ledger over an existing database and clock.
    pub async fn with_database(
        db: Database,
        config: &LedgerConfig,
        clock: Arc<dyn Clock>,
    ) -> LedgerResult<Self> {
        let settings = db.settings().ensure_defaults(&config.store_defaults()).await?;
        info!(
            store = %settings.store_name,
            next_invoice = settings.next_invoice_number,
            "Ledger ready"
        );

        Ok(Till {
            shared: Shared {
                db,
                lock: Arc::new(RwLock::new(())),
                clock,
            },
        })
    }

    pub fn sales(&self) -> SaleLedger {
        SaleLedger::new(self.shared.clone())
    }

    pub fn cash(&self) -> CashSessionManager {
        CashSessionManager::new(self.shared.clone())
    }

    pub fn inventory(&self) -> InventoryGateway {
        InventoryGateway::new(self.shared.clone())
    }

    /// The underlying database, for catalog maintenance and reporting.
    pub fn database(&self) -> &Database {
        &self.shared.db
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=till=trace` - Show trace for till crates only
/// - Default: `info,till=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn"));

    // A second call (tests, embedding hosts) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
