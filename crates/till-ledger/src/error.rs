//! # Ledger Error Type
//!
//! The one error type every ledger operation returns.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Ledger                             │
//! │                                                                         │
//! │  ValidationError ───────────────────────────► InvalidInput              │
//! │                                                                         │
//! │  CoreError::InsufficientStock ──────────────► InsufficientStock         │
//! │  CoreError::InvalidState ───────────────────► InvalidState              │
//! │  CoreError::Forbidden ──────────────────────► Forbidden                 │
//! │                                                                         │
//! │  DbError::NotFound ─────────────────────────► NotFound                  │
//! │  DbError::UniqueViolation ──────────────────► Conflict                  │
//! │  DbError::* (anything else) ── error!(..) ──► Internal (generic text)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! Callers that cross a process boundary send an [`ErrorBody`]:
//! ```json
//! {
//!   "code": "INSUFFICIENT_STOCK",
//!   "message": "Insufficient stock for CBL-1M: available 3, requested 5"
//! }
//! ```

use serde::Serialize;
use thiserror::Error;
use till_core::{CoreError, ValidationError};
use till_db::DbError;

/// Errors returned by the sale ledger, inventory gateway and cash session
/// manager.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The operation collides with existing state (open session, duplicate).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-readable error codes.
///
/// ## Usage in a UI
/// ```typescript
/// switch (e.code) {
///   case 'INSUFFICIENT_STOCK': highlightLine(e.message); break;
///   case 'CONFLICT':           offerReopen();           break;
///   default:                   showError(e.message);
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    InvalidInput,
    Conflict,
    InsufficientStock,
    Forbidden,
    InvalidState,
    Internal,
}

/// Serializable form of a [`LedgerError`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        LedgerError::InvalidInput(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        LedgerError::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        LedgerError::Forbidden(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            LedgerError::NotFound { .. } => ErrorCode::NotFound,
            LedgerError::InvalidInput(_) => ErrorCode::InvalidInput,
            LedgerError::Conflict(_) => ErrorCode::Conflict,
            LedgerError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            LedgerError::Forbidden(_) => ErrorCode::Forbidden,
            LedgerError::InvalidState(_) => ErrorCode::InvalidState,
            LedgerError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

/// Converts database errors, hiding storage details behind a generic
/// message.
impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                LedgerError::Conflict(format!("{} '{}' already exists", field, value))
            }
            DbError::Invalid(err) => LedgerError::InvalidInput(err.to_string()),
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                LedgerError::Internal("Database busy".to_string())
            }
            other => {
                tracing::error!(error = %other, "Database operation failed");
                LedgerError::Internal("Database operation failed".to_string())
            }
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                code,
                available,
                requested,
            } => LedgerError::InsufficientStock {
                code,
                available,
                requested,
            },
            err @ CoreError::InvalidState { .. } => LedgerError::InvalidState(err.to_string()),
            err @ CoreError::Forbidden { .. } => LedgerError::Forbidden(err.to_string()),
            CoreError::Validation(e) => e.into(),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::InvalidInput(err.to_string())
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
