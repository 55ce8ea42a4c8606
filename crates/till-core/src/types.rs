//! # Domain Types
//!
//! Core domain types used throughout the till ledger.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │   CashSession   │   │ InventoryMove   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (seq i64)   │   │  business_date  │   │  product_id     │       │
//! │  │  invoice_number │   │  status         │   │  quantity_delta │       │
//! │  │  items[]        │   │  totals         │   │  resulting_qty  │       │
//! │  │  total          │   │  expenses[]     │   │  kind           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  PaymentMethod  │   │   SaleStatus    │   │      Role       │       │
//! │  │  Cash           │   │   Completed     │   │  Admin Support  │       │
//! │  │  Card Transfer  │   │   Cancelled     │   │  Cashier Clerk  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity
//! A sale has an internal sequential `id` and a human-facing
//! `invoice_number` (`{prefix}{n}`). Both are issued once and never reused.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{Money, Rate};

// =============================================================================
// Actors & Roles
// =============================================================================

/// Role of the authenticated actor, supplied by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access.
    Admin,
    /// Technical support, same privileges as admin on the ledger.
    Support,
    /// Runs the register and the cash drawer.
    Cashier,
    /// Can sell catalog items only.
    Clerk,
}

impl Role {
    /// Admin and support may cancel sales, reopen sessions, adjust stock
    /// and override the opening float.
    #[inline]
    pub const fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::Support)
    }

    /// Ad-hoc service lines have no catalog price, so only trusted roles
    /// may type one in.
    #[inline]
    pub const fn can_bill_ad_hoc(&self) -> bool {
        matches!(self, Role::Admin | Role::Support | Role::Cashier)
    }

    /// Roles that may take custody of the cash drawer.
    #[inline]
    pub const fn can_open_session(&self) -> bool {
        matches!(self, Role::Admin | Role::Support | Role::Cashier)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Support => "support",
            Role::Cashier => "cashier",
            Role::Clerk => "clerk",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated user performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, username: impl Into<String>, role: Role) -> Self {
        Actor {
            id,
            username: username.into(),
            role,
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid or an expense was disbursed.
///
/// Stored lowercase; parsed case-insensitively so `"Cash"`, `"CASH"` and
/// the legacy `"Efectivo"` all resolve to [`PaymentMethod::Cash`].
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Transfer,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
        }
    }

    /// Serde hook for request fields; goes through [`FromStr`] so casing
    /// and the legacy names are accepted on the way in.
    pub fn deserialize_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }

    /// [`PaymentMethod::deserialize_lenient`] for optional fields.
    pub fn deserialize_lenient_opt<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Self>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| raw.parse().map_err(de::Error::custom))
            .transpose()
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "efectivo" => Ok(PaymentMethod::Cash),
            "card" | "tarjeta" => Ok(PaymentMethod::Card),
            "transfer" | "transferencia" => Ok(PaymentMethod::Transfer),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: PaymentMethod::ALL
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            }),
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale. Completed → Cancelled is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    Completed,
    Cancelled,
}

impl SaleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// What a sale line refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Stock-tracked catalog product.
    Product,
    /// Catalog service, no stock.
    CatalogService,
    /// Free-text service priced at the counter (source id 0).
    AdHocService,
}

/// A line of a sale, snapshotted at sale time.
///
/// Price and description are frozen so later catalog edits never change
/// a past invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    /// Product or service id; 0 for ad-hoc lines.
    pub source_id: i64,
    pub kind: ItemKind,
    pub quantity: i64,
    pub unit_price: Money,
    pub description: String,
    /// `quantity × unit_price`.
    pub line_total: Money,
}

impl SaleItem {
    pub fn new(
        source_id: i64,
        kind: ItemKind,
        quantity: i64,
        unit_price: Money,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let line_total = unit_price
            .checked_mul(quantity)
            .ok_or_else(|| ValidationError::TooLarge {
                field: "line_total".to_string(),
            })?;

        Ok(SaleItem {
            source_id,
            kind,
            quantity,
            unit_price,
            description: description.into(),
            line_total,
        })
    }

    /// Whether the line moved stock and must be released on cancellation.
    #[inline]
    pub fn is_stock_tracked(&self) -> bool {
        self.kind == ItemKind::Product
    }
}

// =============================================================================
// Sale
// =============================================================================

/// Who cancelled a sale, when and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cancellation {
    pub reason: String,
    pub cancelled_by: i64,
    #[ts(as = "String")]
    pub cancelled_at: DateTime<Utc>,
}

/// An invoice. Never deleted; only ever cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    pub invoice_number: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Local calendar date the sale belongs to; drives the cash close.
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_document: String,
    pub items: Vec<SaleItem>,
    pub subtotal: Money,
    /// Discount value actually applied.
    pub discount: Money,
    /// Present only when the discount came from a percentage.
    pub discount_percentage: Option<Rate>,
    pub tax_applied: bool,
    /// Present only when tax was applied.
    pub tax_rate: Option<Rate>,
    pub tax_amount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub created_by: i64,
    pub created_by_username: String,
    pub status: SaleStatus,
    pub cancellation: Option<Cancellation>,
}

impl Sale {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }
}

// =============================================================================
// Cash Session
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Money paid out of the business during the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseEntry {
    pub concept: String,
    pub value: Money,
    pub recipient: Option<String>,
    #[ts(as = "String")]
    pub expense_date: NaiveDate,
    /// Only cash expenses leave the drawer.
    pub payment_method: PaymentMethod,
}

impl ExpenseEntry {
    #[inline]
    pub fn is_cash(&self) -> bool {
        self.payment_method == PaymentMethod::Cash
    }
}

/// Aggregates computed at close. Kept on reopen until the next close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionTotals {
    pub cash_sales: Money,
    pub card_sales: Money,
    pub transfer_sales: Money,
    pub total_income: Money,
    pub total_expenses: Money,
    pub profit: Money,
    pub expected_cash: Money,
    pub amount_to_bank: Money,
}

/// One day's custody of the cash drawer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashSession {
    pub id: i64,
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    pub opened_by: i64,
    pub opened_by_username: String,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    pub initial_balance: Money,
    pub status: SessionStatus,
    /// `None` until the session has been closed at least once.
    pub totals: Option<SessionTotals>,
    pub expenses: Vec<ExpenseEntry>,
    pub counted_cash: Option<Money>,
    /// `counted_cash − expected_cash`; negative means a shortfall.
    pub difference: Option<Money>,
    pub notes: Option<String>,
    pub closed_by: Option<i64>,
    pub closed_by_username: Option<String>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl CashSession {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

// =============================================================================
// Inventory Movement
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Sale,
    SaleCancellation,
    Adjustment,
    Creation,
}

/// Append-only audit record of a stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryMovement {
    pub id: i64,
    pub product_id: i64,
    pub product_code: String,
    /// Signed: negative for sales, positive for releases.
    pub quantity_delta: i64,
    pub resulting_quantity: i64,
    pub kind: MovementKind,
    pub actor_id: i64,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Store Settings
// =============================================================================

/// Global store settings (singleton).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StoreSettings {
    pub store_name: String,
    pub invoice_prefix: String,
    /// Number the next invoice will carry.
    pub next_invoice_number: i64,
    pub tax_rate: Rate,
    pub apply_tax_by_default: bool,
    /// Opening float of a cash session.
    pub initial_cash_balance: Money,
    /// Stock at or below this level raises a low-stock alert.
    pub low_stock_threshold: i64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            store_name: "Till Store".to_string(),
            invoice_prefix: "INV-".to_string(),
            next_invoice_number: 1,
            tax_rate: Rate::from_bps(1900),
            apply_tax_by_default: false,
            initial_cash_balance: Money::zero(),
            low_stock_threshold: 5,
        }
    }
}

// =============================================================================
// Catalog Records
// =============================================================================

/// A stock-tracked product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: i64,
    /// Business identifier, unique.
    pub code: String,
    pub description: String,
    pub quantity: i64,
    pub cost_price: Money,
    pub sale_price: Money,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` units can be taken from stock right now.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && self.quantity >= quantity
    }
}

/// A catalog service (no stock).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Service {
    pub id: i64,
    pub description: String,
    pub value: Money,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub full_name: String,
    pub document_type: String,
    pub document_number: String,
    pub is_active: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_parses_case_insensitively() {
        assert_eq!("Cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!(" CARD ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!(
            "Transferencia".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Transfer
        );
        assert_eq!("efectivo".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_payment_method_serializes_lowercase() {
        let json = serde_json::to_string(&PaymentMethod::Transfer).unwrap();
        assert_eq!(json, "\"transfer\"");
    }

    #[test]
    fn test_role_privileges() {
        assert!(Role::Admin.is_elevated());
        assert!(Role::Support.is_elevated());
        assert!(!Role::Cashier.is_elevated());
        assert!(Role::Cashier.can_bill_ad_hoc());
        assert!(!Role::Clerk.can_bill_ad_hoc());
        assert!(!Role::Clerk.can_open_session());
    }

    #[test]
    fn test_sale_item_line_total() {
        let item = SaleItem::new(4, ItemKind::Product, 3, Money::from_cents(299), "Cable").unwrap();
        assert_eq!(item.line_total.cents(), 897);
        assert!(item.is_stock_tracked());

        let service = SaleItem::new(0, ItemKind::AdHocService, 1, Money::from_cents(100), "x").unwrap();
        assert!(!service.is_stock_tracked());

        let err = SaleItem::new(0, ItemKind::AdHocService, 3, Money::from_cents(i64::MAX / 2), "x")
            .unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
    }

    #[test]
    fn test_store_settings_defaults() {
        let settings = StoreSettings::default();
        assert_eq!(settings.invoice_prefix, "INV-");
        assert_eq!(settings.tax_rate.bps(), 1900);
        assert!(!settings.apply_tax_by_default);
        assert_eq!(settings.low_stock_threshold, 5);
    }
}
