//! # Schema Migrations
//!
//! The schema ships inside the binary; [`Database::new`](crate::Database::new)
//! applies whatever the file has not seen yet.
//!
//! ```text
//! migrations/sqlite/
//! └── 001_initial_schema.sql   settings, catalog, products, movements,
//!                              sales + items, cash sessions + expenses
//! ```
//!
//! Applied files are checksummed in `_sqlx_migrations`; edit the schema by
//! adding `NNN_description.sql`, never by changing a shipped file.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations in order. Safe to call on every start.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    debug!(known = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
