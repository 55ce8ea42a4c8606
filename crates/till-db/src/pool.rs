//! # Database Handle
//!
//! Opens the SQLite store, applies migrations and hands out repositories
//! and transactions.
//!
//! ## Connections and Transactions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storage::File(path)                 Storage::Memory                    │
//! │  WAL journal, up to N connections    one private connection             │
//! │                                                                         │
//! │  db.sales().list(..)  ──► borrows a connection for one statement        │
//! │  db.begin()           ──► holds a connection until commit / drop        │
//! │                                                                         │
//! │  With Storage::Memory the transaction owns the only connection: a       │
//! │  caller holding a transaction must not go back to the pool, it would    │
//! │  wait on itself until `acquire_timeout` fires.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::cash_session::CashSessionRepository;
use crate::repository::catalog::{CustomerRepository, ServiceRepository};
use crate::repository::inventory::InventoryRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::settings::SettingsRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Where the ledger lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// A database file, created on first open.
    File(PathBuf),
    /// A throwaway database private to one [`Database`].
    Memory,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub storage: Storage,
    /// Upper bound on pooled connections. Forced to 1 for [`Storage::Memory`].
    pub max_connections: u32,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
    /// How long SQLite retries on a locked database file before failing.
    pub busy_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            storage: Storage::File(path.into()),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn in_memory() -> Self {
        DbConfig {
            storage: Storage::Memory,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = match &self.storage {
            Storage::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal),
            // sqlx gives every `:memory:` parse its own database name
            Storage::Memory => SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?,
        };

        // Off by default in SQLite
        Ok(options.foreign_keys(true).busy_timeout(self.busy_timeout))
    }

    fn pool_size(&self) -> u32 {
        match self.storage {
            Storage::File(_) => self.max_connections.max(1),
            Storage::Memory => 1,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the ledger store.
///
/// Cheap to clone; every clone shares the same pool.
///
/// ```rust,ignore
/// let sale = db.sales().get_by_id(42).await?;
///
/// let mut tx = db.begin().await?;
/// SaleRepository::mark_cancelled(&mut tx, 42, &cancellation).await?;
/// tx.commit().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the store and brings its schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let size = config.pool_size();
        match &config.storage {
            Storage::File(path) => info!(path = %path.display(), connections = size, "Opening ledger database"),
            Storage::Memory => debug!("Opening in-memory ledger database"),
        }

        // An in-memory database lives as long as its one connection
        let pool = SqlitePoolOptions::new()
            .max_connections(size)
            .min_connections(if config.storage == Storage::Memory { 1 } else { 0 })
            .idle_timeout(None)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        migrations::run_migrations(&pool).await?;

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a transaction; dropping it without `commit` rolls back.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub fn settings(&self) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn services(&self) -> ServiceRepository {
        ServiceRepository::new(self.pool.clone())
    }

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn cash_sessions(&self) -> CashSessionRepository {
        CashSessionRepository::new(self.pool.clone())
    }

    pub async fn close(&self) {
        info!("Closing ledger database");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
