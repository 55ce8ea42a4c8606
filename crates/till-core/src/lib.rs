//! # till-core: Pure Business Logic for the Till Ledger
//!
//! This crate holds the arithmetic and rules of the ledger as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    till-ledger (engine)                         │   │
//! │  │    SaleLedger ──► InventoryGateway      CashSessionManager      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing   │  │ reconcile │  │   │
//! │  │   │   Sale    │  │   Money   │  │ discount   │  │ expected  │  │   │
//! │  │   │  Session  │  │   Rate    │  │ tax, total │  │ cash      │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sale, CashSession, Actor, etc.)
//! - [`money`] - Money and Rate with integer arithmetic
//! - [`pricing`] - Subtotal, discount, tax and total of a sale
//! - [`reconciliation`] - Cash-drawer close arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Input rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::money::{Money, Rate};
//!
//! let subtotal = Money::from_major_minor(100, 0);
//! let tax = subtotal.percent_of(Rate::from_bps(1900)); // 19%
//! assert_eq!(tax.cents(), 1900);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod reconciliation;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Rate};
pub use pricing::{price, DiscountSpec, PricingResult, TaxPolicy};
pub use reconciliation::{reconcile, Reconciliation, SalesByMethod};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines accepted in a single sale request.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches typing 10000 instead of 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Minimum length of a cancellation reason (after trimming).
pub const MIN_CANCEL_REASON_LEN: usize = 5;

/// Minimum length of an expense concept (after trimming).
pub const MIN_EXPENSE_CONCEPT_LEN: usize = 3;
