//! # Cash Session Repository
//!
//! Persistence for daily cash sessions and the expenses recorded at close.
//!
//! ## Session States
//! ```text
//!                  insert_open()
//!                       │
//!                       ▼
//!   ┌──────────┐   close()    ┌──────────┐
//!   │   open   │ ───────────► │  closed  │
//!   └──────────┘ ◄─────────── └──────────┘
//!                  reopen()
//! ```
//!
//! A partial unique index keeps at most one `open` row per business date.
//! Aggregates survive a reopen; the count and closer fields do not.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use super::page_size;
use crate::error::{DbError, DbResult};
use till_core::{
    CashSession, ExpenseEntry, Money, PaymentMethod, Reconciliation, SessionStatus, SessionTotals,
};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct SessionRow {
    id: i64,
    business_date: NaiveDate,
    opened_by: i64,
    opened_by_username: String,
    opened_at: DateTime<Utc>,
    initial_balance_cents: Money,
    status: SessionStatus,
    cash_sales_cents: Option<Money>,
    card_sales_cents: Option<Money>,
    transfer_sales_cents: Option<Money>,
    total_income_cents: Option<Money>,
    total_expenses_cents: Option<Money>,
    profit_cents: Option<Money>,
    expected_cash_cents: Option<Money>,
    amount_to_bank_cents: Option<Money>,
    counted_cash_cents: Option<Money>,
    difference_cents: Option<Money>,
    notes: Option<String>,
    closed_by: Option<i64>,
    closed_by_username: Option<String>,
    closed_at: Option<DateTime<Utc>>,
}

impl SessionRow {
    fn totals(&self) -> Option<SessionTotals> {
        Some(SessionTotals {
            cash_sales: self.cash_sales_cents?,
            card_sales: self.card_sales_cents?,
            transfer_sales: self.transfer_sales_cents?,
            total_income: self.total_income_cents?,
            total_expenses: self.total_expenses_cents?,
            profit: self.profit_cents?,
            expected_cash: self.expected_cash_cents?,
            amount_to_bank: self.amount_to_bank_cents?,
        })
    }

    fn into_session(self, expenses: Vec<ExpenseEntry>) -> CashSession {
        let totals = self.totals();
        CashSession {
            id: self.id,
            business_date: self.business_date,
            opened_by: self.opened_by,
            opened_by_username: self.opened_by_username,
            opened_at: self.opened_at,
            initial_balance: self.initial_balance_cents,
            status: self.status,
            totals,
            expenses,
            counted_cash: self.counted_cash_cents,
            difference: self.difference_cents,
            notes: self.notes,
            closed_by: self.closed_by,
            closed_by_username: self.closed_by_username,
            closed_at: self.closed_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ExpenseRow {
    concept: String,
    value_cents: Money,
    recipient: Option<String>,
    expense_date: NaiveDate,
    payment_method: PaymentMethod,
}

impl From<ExpenseRow> for ExpenseEntry {
    fn from(row: ExpenseRow) -> Self {
        ExpenseEntry {
            concept: row.concept,
            value: row.value_cents,
            recipient: row.recipient,
            expense_date: row.expense_date,
            payment_method: row.payment_method,
        }
    }
}

const SESSION_COLUMNS: &str = r#"
    id, business_date, opened_by, opened_by_username, opened_at,
    initial_balance_cents, status,
    cash_sales_cents, card_sales_cents, transfer_sales_cents,
    total_income_cents, total_expenses_cents, profit_cents,
    expected_cash_cents, amount_to_bank_cents,
    counted_cash_cents, difference_cents, notes,
    closed_by, closed_by_username, closed_at
"#;

// =============================================================================
// Inputs
// =============================================================================

/// A session about to be opened.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub business_date: NaiveDate,
    pub opened_by: i64,
    pub opened_by_username: String,
    pub opened_at: DateTime<Utc>,
    pub initial_balance: Money,
}

/// Everything written when a session is closed.
#[derive(Debug, Clone)]
pub struct CloseRecord<'a> {
    pub reconciliation: &'a Reconciliation,
    pub expenses: &'a [ExpenseEntry],
    pub notes: Option<&'a str>,
    pub closed_by: i64,
    pub closed_by_username: &'a str,
    pub closed_at: DateTime<Utc>,
}

/// Session history query; newest business date first.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<SessionStatus>,
    pub offset: u32,
    pub limit: Option<u32>,
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct CashSessionRepository {
    pool: SqlitePool,
}

impl CashSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashSessionRepository { pool }
    }

    /// Inserts an open session.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the date already has an open session
    pub async fn insert_open(conn: &mut SqliteConnection, new: &NewSession) -> DbResult<CashSession> {
        debug!(date = %new.business_date, balance = %new.initial_balance, "Opening cash session");

        let id = sqlx::query(
            r#"
            INSERT INTO cash_sessions (
                business_date, opened_by, opened_by_username, opened_at,
                initial_balance_cents, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, 'open')
            "#,
        )
        .bind(new.business_date)
        .bind(new.opened_by)
        .bind(&new.opened_by_username)
        .bind(new.opened_at)
        .bind(new.initial_balance)
        .execute(&mut *conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("business_date", new.business_date.to_string())
            }
            other => other,
        })?
        .last_insert_rowid();

        Self::fetch(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("CashSession", id))
    }

    /// Loads a session with its expenses on an existing connection.
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<CashSession>> {
        let sql = format!("SELECT {} FROM cash_sessions WHERE id = ?1", SESSION_COLUMNS);
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Self::hydrate(conn, row).await
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<CashSession>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// The open session of `date`, if any.
    pub async fn find_open_for_date(
        conn: &mut SqliteConnection,
        date: NaiveDate,
    ) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {} FROM cash_sessions WHERE business_date = ?1 AND status = 'open'",
            SESSION_COLUMNS
        );
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(date)
            .fetch_optional(&mut *conn)
            .await?;

        Self::hydrate(conn, row).await
    }

    /// The most recently closed session of `date`, if any.
    pub async fn find_latest_closed_for_date(
        conn: &mut SqliteConnection,
        date: NaiveDate,
    ) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {} FROM cash_sessions WHERE business_date = ?1 AND status = 'closed' \
             ORDER BY closed_at DESC, id DESC LIMIT 1",
            SESSION_COLUMNS
        );
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(date)
            .fetch_optional(&mut *conn)
            .await?;

        Self::hydrate(conn, row).await
    }

    /// The newest session still open from a business date before `date`.
    pub async fn latest_open_before(
        conn: &mut SqliteConnection,
        date: NaiveDate,
    ) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {} FROM cash_sessions WHERE business_date < ?1 AND status = 'open' \
             ORDER BY business_date DESC, id DESC LIMIT 1",
            SESSION_COLUMNS
        );
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(date)
            .fetch_optional(&mut *conn)
            .await?;

        Self::hydrate(conn, row).await
    }

    /// The session to show for `date`: the open one, else the latest closed.
    pub async fn today(&self, date: NaiveDate) -> DbResult<Option<CashSession>> {
        let mut conn = self.pool.acquire().await?;
        if let Some(open) = Self::find_open_for_date(&mut conn, date).await? {
            return Ok(Some(open));
        }
        Self::find_latest_closed_for_date(&mut conn, date).await
    }

    /// Writes the close of an open session and replaces its expenses.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no open session with this id
    pub async fn close(
        conn: &mut SqliteConnection,
        id: i64,
        record: &CloseRecord<'_>,
    ) -> DbResult<CashSession> {
        let rec = record.reconciliation;
        debug!(id = id, expected = %rec.expected_cash, counted = %rec.counted_cash, "Closing cash session");

        let result = sqlx::query(
            r#"
            UPDATE cash_sessions SET
                status = 'closed',
                cash_sales_cents = ?2,
                card_sales_cents = ?3,
                transfer_sales_cents = ?4,
                total_income_cents = ?5,
                total_expenses_cents = ?6,
                profit_cents = ?7,
                expected_cash_cents = ?8,
                amount_to_bank_cents = ?9,
                counted_cash_cents = ?10,
                difference_cents = ?11,
                notes = ?12,
                closed_by = ?13,
                closed_by_username = ?14,
                closed_at = ?15
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(id)
        .bind(rec.sales.cash)
        .bind(rec.sales.card)
        .bind(rec.sales.transfer)
        .bind(rec.total_income)
        .bind(rec.total_expenses)
        .bind(rec.profit)
        .bind(rec.expected_cash)
        .bind(rec.amount_to_bank)
        .bind(rec.counted_cash)
        .bind(rec.difference)
        .bind(record.notes)
        .bind(record.closed_by)
        .bind(record.closed_by_username)
        .bind(record.closed_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CashSession (open)", id));
        }

        sqlx::query("DELETE FROM cash_session_expenses WHERE session_id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        for (position, expense) in record.expenses.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cash_session_expenses (
                    session_id, position, concept, value_cents, recipient,
                    expense_date, payment_method
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(id)
            .bind(position as i64)
            .bind(&expense.concept)
            .bind(expense.value)
            .bind(&expense.recipient)
            .bind(expense.expense_date)
            .bind(expense.payment_method)
            .execute(&mut *conn)
            .await?;
        }

        Self::fetch(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("CashSession", id))
    }

    /// Puts a closed session back into `open`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no closed session with this id
    /// * `Err(DbError::UniqueViolation)` - its date already has an open session
    pub async fn reopen(conn: &mut SqliteConnection, id: i64) -> DbResult<CashSession> {
        debug!(id = id, "Reopening cash session");

        let result = sqlx::query(
            r#"
            UPDATE cash_sessions SET
                status = 'open',
                counted_cash_cents = NULL,
                difference_cents = NULL,
                closed_by = NULL,
                closed_by_username = NULL,
                closed_at = NULL
            WHERE id = ?1 AND status = 'closed'
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CashSession (closed)", id));
        }

        Self::fetch(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("CashSession", id))
    }

    /// Lists sessions matching `filter`, newest business date first.
    pub async fn list(&self, filter: &SessionFilter) -> DbResult<Vec<CashSession>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM cash_sessions WHERE 1 = 1", SESSION_COLUMNS));

        if let Some(start) = filter.start_date {
            qb.push(" AND business_date >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            qb.push(" AND business_date <= ").push_bind(end);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }

        qb.push(" ORDER BY business_date DESC, id DESC LIMIT ")
            .push_bind(page_size(filter.limit))
            .push(" OFFSET ")
            .push_bind(filter.offset as i64);

        let mut conn = self.pool.acquire().await?;
        let rows: Vec<SessionRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let expenses = Self::fetch_expenses(&mut conn, row.id).await?;
            sessions.push(row.into_session(expenses));
        }
        Ok(sessions)
    }

    async fn hydrate(
        conn: &mut SqliteConnection,
        row: Option<SessionRow>,
    ) -> DbResult<Option<CashSession>> {
        match row {
            Some(row) => {
                let expenses = Self::fetch_expenses(conn, row.id).await?;
                Ok(Some(row.into_session(expenses)))
            }
            None => Ok(None),
        }
    }

    async fn fetch_expenses(
        conn: &mut SqliteConnection,
        session_id: i64,
    ) -> DbResult<Vec<ExpenseEntry>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT concept, value_cents, recipient, expense_date, payment_method
            FROM cash_session_expenses
            WHERE session_id = ?1
            ORDER BY position
            "#,
        )
        .bind(session_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(ExpenseEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use till_core::{reconcile, SalesByMethod};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn new_session(date: NaiveDate) -> NewSession {
        NewSession {
            business_date: date,
            opened_by: 1,
            opened_by_username: "admin".to_string(),
            opened_at: Utc::now(),
            initial_balance: Money::from_cents(10_000_000),
        }
    }

    #[tokio::test]
    async fn test_one_open_session_per_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();

        let session = CashSessionRepository::insert_open(&mut tx, &new_session(day(14)))
            .await
            .unwrap();
        assert!(session.is_open());
        assert!(session.totals.is_none());

        let err = CashSessionRepository::insert_open(&mut tx, &new_session(day(14)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "business_date"));

        // Another day is fine
        CashSessionRepository::insert_open(&mut tx, &new_session(day(15)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_close_and_reopen() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();
        let session = CashSessionRepository::insert_open(&mut tx, &new_session(day(14)))
            .await
            .unwrap();

        let expenses = vec![ExpenseEntry {
            concept: "Courier".to_string(),
            value: Money::from_cents(500_000),
            recipient: None,
            expense_date: day(14),
            payment_method: PaymentMethod::Cash,
        }];
        let sales = SalesByMethod {
            cash: Money::from_cents(5_000_000),
            ..Default::default()
        };
        let rec = reconcile(
            session.initial_balance,
            sales,
            &expenses,
            Money::from_cents(14_500_000),
        );

        let closed = CashSessionRepository::close(
            &mut tx,
            session.id,
            &CloseRecord {
                reconciliation: &rec,
                expenses: &expenses,
                notes: Some("all good"),
                closed_by: 2,
                closed_by_username: "support",
                closed_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        assert_eq!(closed.status, SessionStatus::Closed);
        assert_eq!(closed.expenses, expenses);
        assert_eq!(closed.totals, Some(rec.totals()));
        assert_eq!(closed.difference, Some(Money::zero()));

        let reopened = CashSessionRepository::reopen(&mut tx, session.id).await.unwrap();
        assert!(reopened.is_open());
        assert_eq!(reopened.totals, Some(rec.totals()));
        assert_eq!(reopened.expenses.len(), 1);
        assert!(reopened.counted_cash.is_none());
        assert!(reopened.closed_by.is_none());

        // Reopening an open session is rejected
        assert!(CashSessionRepository::reopen(&mut tx, session.id).await.is_err());
    }

    #[tokio::test]
    async fn test_latest_open_before_and_today() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();
        let stale = CashSessionRepository::insert_open(&mut tx, &new_session(day(13)))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let found = CashSessionRepository::latest_open_before(&mut conn, day(14))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, stale.id);
        assert!(CashSessionRepository::latest_open_before(&mut conn, day(13))
            .await
            .unwrap()
            .is_none());
        drop(conn);

        assert_eq!(db.cash_sessions().today(day(13)).await.unwrap().unwrap().id, stale.id);
        assert!(db.cash_sessions().today(day(14)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut tx = db.begin().await.unwrap();
        for d in [12, 13, 14] {
            CashSessionRepository::insert_open(&mut tx, &new_session(day(d)))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let sessions = db.cash_sessions().list(&SessionFilter::default()).await.unwrap();
        let dates: Vec<_> = sessions.iter().map(|s| s.business_date).collect();
        assert_eq!(dates, vec![day(14), day(13), day(12)]);

        let ranged = db
            .cash_sessions()
            .list(&SessionFilter {
                start_date: Some(day(13)),
                end_date: Some(day(13)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ranged.len(), 1);
    }
}
