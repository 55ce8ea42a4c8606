//! # Cash Session Manager
//!
//! Daily custody of the cash drawer and its reconciliation.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   (none) ──open_session──► OPEN ──close_session──► CLOSED               │
//! │                              ▲                        │                 │
//! │                              └────reopen_session──────┘                 │
//! │                                                                         │
//! │  open_session refuses when:                                             │
//! │    • today already has an open session                                  │
//! │    • today already has a closed session (reopen it instead)             │
//! │    • an earlier day is still open (close it with close_session_on)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The arithmetic of a close lives in [`till_core::reconcile`]; this module
//! gathers its inputs (the day's completed sales and the declared expenses)
//! and persists the result.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use ts_rs::TS;

use crate::error::{LedgerError, LedgerResult};
use crate::Shared;
use till_core::validation::{validate_expense_concept, validate_non_negative};
use till_core::{reconcile, Actor, CashSession, CoreError, ExpenseEntry, Money, PaymentMethod};
use till_db::{
    CashSessionRepository, CloseRecord, DbError, NewSession, SaleRepository, SessionFilter,
};

// =============================================================================
// Requests
// =============================================================================

/// An expense declared at close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseRequest {
    pub concept: String,
    pub value: Money,
    #[serde(default)]
    pub recipient: Option<String>,
    /// Defaults to the session date.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expense_date: Option<NaiveDate>,
    /// Defaults to cash.
    #[serde(default, deserialize_with = "PaymentMethod::deserialize_lenient_opt")]
    pub payment_method: Option<PaymentMethod>,
}

impl ExpenseRequest {
    pub fn cash(concept: impl Into<String>, value: Money) -> Self {
        ExpenseRequest {
            concept: concept.into(),
            value,
            recipient: None,
            expense_date: None,
            payment_method: None,
        }
    }

    fn into_entry(self, session_date: NaiveDate) -> ExpenseEntry {
        ExpenseEntry {
            concept: self.concept.trim().to_string(),
            value: self.value,
            recipient: self
                .recipient
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            expense_date: self.expense_date.unwrap_or(session_date),
            payment_method: self.payment_method.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CloseRequest {
    /// Cash physically counted in the drawer.
    pub counted_cash: Money,
    #[serde(default)]
    pub expenses: Vec<ExpenseRequest>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CloseRequest {
    fn validate(&self) -> LedgerResult<()> {
        validate_non_negative("counted_cash", self.counted_cash)?;
        for expense in &self.expenses {
            validate_expense_concept(&expense.concept)?;
            validate_non_negative("expense value", expense.value)?;
        }
        Ok(())
    }
}

// =============================================================================
// Manager
// =============================================================================

#[derive(Debug, Clone)]
pub struct CashSessionManager {
    shared: Shared,
}

impl CashSessionManager {
    pub(crate) fn new(shared: Shared) -> Self {
        CashSessionManager { shared }
    }

    /// Opens today's session.
    ///
    /// The opening float is the store's initial cash balance unless an
    /// elevated actor supplies `initial_balance`.
    ///
    /// ## Errors
    /// * `Forbidden` - clerk, or a non-elevated actor overriding the float
    /// * `InvalidInput` - negative override
    /// * `Conflict` - today is already open or closed, or an earlier day is still open
    pub async fn open_session(
        &self,
        actor: &Actor,
        initial_balance: Option<Money>,
    ) -> LedgerResult<CashSession> {
        if !actor.role.can_open_session() {
            return Err(CoreError::Forbidden {
                role: actor.role.to_string(),
                action: "open cash sessions",
            }
            .into());
        }
        if let Some(balance) = initial_balance {
            if !actor.role.is_elevated() {
                return Err(CoreError::Forbidden {
                    role: actor.role.to_string(),
                    action: "override the opening float",
                }
                .into());
            }
            validate_non_negative("initial_balance", balance)?;
        }

        let _guard = self.shared.lock.write().await;
        let settings = self.shared.db.settings().get().await?;
        let today = self.shared.clock.today();

        let mut tx = self.shared.db.begin().await?;

        if CashSessionRepository::find_open_for_date(&mut tx, today)
            .await?
            .is_some()
        {
            return Err(LedgerError::conflict(format!(
                "a cash session is already open for {}",
                today
            )));
        }
        if CashSessionRepository::find_latest_closed_for_date(&mut tx, today)
            .await?
            .is_some()
        {
            return Err(LedgerError::conflict(format!(
                "the cash session for {} is already closed; reopen it instead",
                today
            )));
        }
        if let Some(stale) = CashSessionRepository::latest_open_before(&mut tx, today).await? {
            return Err(LedgerError::conflict(format!(
                "the cash session of {} is still open; close it first",
                stale.business_date
            )));
        }

        let session = CashSessionRepository::insert_open(
            &mut tx,
            &NewSession {
                business_date: today,
                opened_by: actor.id,
                opened_by_username: actor.username.clone(),
                opened_at: self.shared.clock.now(),
                initial_balance: initial_balance.unwrap_or(settings.initial_cash_balance),
            },
        )
        .await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            session_id = session.id,
            date = %session.business_date,
            initial_balance = %session.initial_balance,
            actor = %actor.username,
            "Cash session opened"
        );

        Ok(session)
    }

    /// Closes today's open session.
    pub async fn close_session(
        &self,
        actor: &Actor,
        request: CloseRequest,
    ) -> LedgerResult<CashSession> {
        let today = self.shared.clock.today();
        self.close_session_on(today, actor, request).await
    }

    /// Closes the open session of `date`; also how a stale session from an
    /// earlier day is cleared.
    ///
    /// ## Errors
    /// * `InvalidInput` - negative count, bad expense
    /// * `NotFound` - `date` has no open session
    /// * `Forbidden` - actor neither opened the session nor is elevated
    pub async fn close_session_on(
        &self,
        date: NaiveDate,
        actor: &Actor,
        request: CloseRequest,
    ) -> LedgerResult<CashSession> {
        request.validate()?;

        let _guard = self.shared.lock.write().await;
        let now = self.shared.clock.now();

        let mut tx = self.shared.db.begin().await?;
        let session = CashSessionRepository::find_open_for_date(&mut tx, date)
            .await?
            .ok_or_else(|| LedgerError::not_found("Open cash session", date))?;

        if session.opened_by != actor.id && !actor.role.is_elevated() {
            return Err(CoreError::Forbidden {
                role: actor.role.to_string(),
                action: "close another user's cash session",
            }
            .into());
        }

        let expenses: Vec<ExpenseEntry> = request
            .expenses
            .into_iter()
            .map(|e| e.into_entry(session.business_date))
            .collect();

        let sales = SaleRepository::totals_by_method(&mut tx, session.business_date).await?;
        let reconciliation = reconcile(session.initial_balance, sales, &expenses, request.counted_cash);

        let notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let closed = CashSessionRepository::close(
            &mut tx,
            session.id,
            &CloseRecord {
                reconciliation: &reconciliation,
                expenses: &expenses,
                notes,
                closed_by: actor.id,
                closed_by_username: &actor.username,
                closed_at: now,
            },
        )
        .await?;
        tx.commit().await.map_err(DbError::from)?;

        if reconciliation.is_balanced() {
            info!(
                session_id = closed.id,
                date = %closed.business_date,
                expected = %reconciliation.expected_cash,
                to_bank = %reconciliation.amount_to_bank,
                actor = %actor.username,
                "Cash session closed"
            );
        } else {
            warn!(
                session_id = closed.id,
                date = %closed.business_date,
                expected = %reconciliation.expected_cash,
                counted = %reconciliation.counted_cash,
                difference = %reconciliation.difference,
                actor = %actor.username,
                "Cash session closed with a difference"
            );
        }

        Ok(closed)
    }

    /// Reopens today's most recently closed session. Aggregates and
    /// expenses are kept until the next close.
    ///
    /// ## Errors
    /// * `Forbidden` - actor is not admin/support
    /// * `Conflict` - today already has an open session
    /// * `NotFound` - today has no closed session
    pub async fn reopen_session(&self, actor: &Actor) -> LedgerResult<CashSession> {
        if !actor.role.is_elevated() {
            return Err(CoreError::Forbidden {
                role: actor.role.to_string(),
                action: "reopen cash sessions",
            }
            .into());
        }

        let _guard = self.shared.lock.write().await;
        let today = self.shared.clock.today();

        let mut tx = self.shared.db.begin().await?;
        if CashSessionRepository::find_open_for_date(&mut tx, today)
            .await?
            .is_some()
        {
            return Err(LedgerError::conflict(format!(
                "a cash session is already open for {}",
                today
            )));
        }

        let closed = CashSessionRepository::find_latest_closed_for_date(&mut tx, today)
            .await?
            .ok_or_else(|| LedgerError::not_found("Closed cash session", today))?;

        let reopened = CashSessionRepository::reopen(&mut tx, closed.id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            session_id = reopened.id,
            date = %reopened.business_date,
            actor = %actor.username,
            "Cash session reopened"
        );

        Ok(reopened)
    }

    /// Today's session: the open one if any, else the latest closed one.
    pub async fn today_session(&self) -> LedgerResult<Option<CashSession>> {
        let _guard = self.shared.lock.read().await;
        let today = self.shared.clock.today();
        Ok(self.shared.db.cash_sessions().today(today).await?)
    }

    /// Session history, newest date first.
    pub async fn list_sessions(&self, filter: &SessionFilter) -> LedgerResult<Vec<CashSession>> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(LedgerError::invalid_input("start_date is after end_date"));
            }
        }

        let _guard = self.shared.lock.read().await;
        Ok(self.shared.db.cash_sessions().list(filter).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
