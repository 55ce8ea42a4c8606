//! # Database Error Types
//!
//! What can go wrong below the ledger, sorted into the cases the ledger
//! reacts to differently.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error                                DbError                     │
//! │  ───────────                                ───────                     │
//! │  RowNotFound                          ──►   NotFound                    │
//! │  Database(kind = UniqueViolation)     ──►   UniqueViolation             │
//! │  Database(kind = ForeignKeyViolation) ──►   ForeignKeyViolation         │
//! │  Database(kind = CheckViolation)      ──►   CheckViolation              │
//! │  PoolTimedOut                         ──►   PoolExhausted               │
//! │  anything else                        ──►   QueryFailed                 │
//! │                                                                         │
//! │  till-ledger turns NotFound / UniqueViolation / Invalid into            │
//! │  user-facing errors and logs the rest behind a generic Internal.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::error::ErrorKind;
use thiserror::Error;
use till_core::ValidationError;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the row.
    ///
    /// Repositories that know which business key collided (invoice
    /// number, product code, open session date) re-raise this through
    /// [`DbError::duplicate`] with the offending value filled in.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Negative stock, unbalanced sale totals and the like.
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    /// The row was rejected before reaching SQLite.
    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Could not open database: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }
}

/// SQLite reports the column as `UNIQUE constraint failed: table.column`.
fn unique_column(message: &str) -> String {
    message
        .rsplit_once(": ")
        .map(|(_, column)| column.to_string())
        .unwrap_or_else(|| "value".to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: unique_column(&message),
                        value: "unknown".to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    ErrorKind::CheckViolation => DbError::CheckViolation { message },
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
