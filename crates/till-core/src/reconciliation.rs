//! # Cash Reconciliation
//!
//! Arithmetic of closing a cash session.
//!
//! ## Formulas
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  total_income   = cash + card + transfer     (completed sales only)     │
//! │  total_expenses = Σ expenses                 (every method)             │
//! │  cash_expenses  = Σ expenses paid in cash                               │
//! │  profit         = total_income − total_expenses                         │
//! │                                                                         │
//! │  expected_cash  = initial_balance + cash − cash_expenses                │
//! │  difference     = counted_cash − expected_cash                          │
//! │  amount_to_bank = max(0, cash − cash_expenses)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Card and transfer sales never touch the drawer, and neither do
//! non-cash expenses; all of them still count towards profit.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{ExpenseEntry, PaymentMethod, SessionTotals};

/// Completed-sale totals of one day, split by payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SalesByMethod {
    pub cash: Money,
    pub card: Money,
    pub transfer: Money,
}

impl SalesByMethod {
    pub fn add(&mut self, method: PaymentMethod, amount: Money) {
        match method {
            PaymentMethod::Cash => self.cash += amount,
            PaymentMethod::Card => self.card += amount,
            PaymentMethod::Transfer => self.transfer += amount,
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        self.cash + self.card + self.transfer
    }
}

impl FromIterator<(PaymentMethod, Money)> for SalesByMethod {
    fn from_iter<I: IntoIterator<Item = (PaymentMethod, Money)>>(iter: I) -> Self {
        let mut sales = SalesByMethod::default();
        for (method, amount) in iter {
            sales.add(method, amount);
        }
        sales
    }
}

/// Full result of a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub sales: SalesByMethod,
    pub total_income: Money,
    pub total_expenses: Money,
    pub cash_expenses: Money,
    pub profit: Money,
    pub expected_cash: Money,
    pub counted_cash: Money,
    pub difference: Money,
    pub amount_to_bank: Money,
}

impl Reconciliation {
    /// The aggregates persisted on the session row.
    pub fn totals(&self) -> SessionTotals {
        SessionTotals {
            cash_sales: self.sales.cash,
            card_sales: self.sales.card,
            transfer_sales: self.sales.transfer,
            total_income: self.total_income,
            total_expenses: self.total_expenses,
            profit: self.profit,
            expected_cash: self.expected_cash,
            amount_to_bank: self.amount_to_bank,
        }
    }

    /// True when the drawer holds exactly what it should.
    #[inline]
    pub fn is_balanced(&self) -> bool {
        self.difference.is_zero()
    }
}

/// Reconciles a drawer.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::reconciliation::{reconcile, SalesByMethod};
///
/// let sales = SalesByMethod { cash: Money::from_cents(1000), ..Default::default() };
/// let rec = reconcile(Money::from_cents(500), sales, &[], Money::from_cents(1500));
/// assert_eq!(rec.expected_cash.cents(), 1500);
/// assert!(rec.is_balanced());
/// ```
pub fn reconcile(
    initial_balance: Money,
    sales: SalesByMethod,
    expenses: &[ExpenseEntry],
    counted_cash: Money,
) -> Reconciliation {
    let total_expenses: Money = expenses.iter().map(|e| e.value).sum();
    let cash_expenses: Money = expenses
        .iter()
        .filter(|e| e.is_cash())
        .map(|e| e.value)
        .sum();

    let total_income = sales.total();
    let expected_cash = initial_balance + sales.cash - cash_expenses;

    Reconciliation {
        sales,
        total_income,
        total_expenses,
        cash_expenses,
        profit: total_income - total_expenses,
        expected_cash,
        counted_cash,
        difference: counted_cash - expected_cash,
        amount_to_bank: (sales.cash - cash_expenses).max(Money::zero()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
