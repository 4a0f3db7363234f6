//! Loan records, the loan period, and the intent log used for compensation.
//!
//! Loans are append-only: a loan is created open, closed exactly once by
//! setting `returned_at`, and never deleted. A loan with no return timestamp
//! is *active*; at most one active loan may exist per book.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BookId, BookTitle, UserId};

/// Default loan period, in days.
pub const DEFAULT_LOAN_PERIOD_DAYS: u32 = 14;

/// Store-assigned loan identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LoanId(u64);

impl LoanId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LoanId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Error returned when a loan period is not strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPeriodError;

impl fmt::Display for LoanPeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loan period must be at least one day")
    }
}

impl std::error::Error for LoanPeriodError {}

/// Whole-day interval between borrowing and the due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPeriod {
    days: u32,
}

impl LoanPeriod {
    /// Build a period of `days` days; zero is rejected.
    ///
    /// # Examples
    /// ```
    /// use lending::domain::LoanPeriod;
    ///
    /// assert_eq!(LoanPeriod::from_days(14).unwrap().days(), 14);
    /// assert!(LoanPeriod::from_days(0).is_err());
    /// ```
    pub const fn from_days(days: u32) -> Result<Self, LoanPeriodError> {
        if days == 0 {
            return Err(LoanPeriodError);
        }
        Ok(Self { days })
    }

    /// Number of days in the period.
    pub const fn days(self) -> u32 {
        self.days
    }

    /// Due timestamp for a loan starting at `borrowed_at`.
    pub fn due_from(self, borrowed_at: DateTime<Utc>) -> DateTime<Utc> {
        borrowed_at + Duration::days(i64::from(self.days))
    }
}

impl Default for LoanPeriod {
    fn default() -> Self {
        Self {
            days: DEFAULT_LOAN_PERIOD_DAYS,
        }
    }
}

/// Loan fields supplied to [`crate::domain::ports::LoanStore::insert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub user_id: UserId,
    pub book_id: BookId,
    pub book_title: BookTitle,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

impl NewLoan {
    /// Open a loan at `borrowed_at`, due one `period` later.
    pub fn open(
        user_id: UserId,
        book_id: BookId,
        book_title: BookTitle,
        borrowed_at: DateTime<Utc>,
        period: LoanPeriod,
    ) -> Self {
        Self {
            user_id,
            book_id,
            book_title,
            borrowed_at,
            due_at: period.due_from(borrowed_at),
        }
    }
}

/// Persisted loan record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    id: LoanId,
    user_id: UserId,
    book_id: BookId,
    book_title: BookTitle,
    borrowed_at: DateTime<Utc>,
    due_at: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// Materialise an open loan from its insert payload.
    pub fn new(id: LoanId, new_loan: NewLoan) -> Self {
        let NewLoan {
            user_id,
            book_id,
            book_title,
            borrowed_at,
            due_at,
        } = new_loan;
        Self {
            id,
            user_id,
            book_id,
            book_title,
            borrowed_at,
            due_at,
            returned_at: None,
        }
    }

    pub fn id(&self) -> LoanId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    /// Title captured when the loan was opened.
    pub fn book_title(&self) -> &BookTitle {
        &self.book_title
    }

    pub fn borrowed_at(&self) -> DateTime<Utc> {
        self.borrowed_at
    }

    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }

    /// Whether the loan is still open.
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Copy of this loan closed at `at`.
    pub fn closed_at(&self, at: DateTime<Utc>) -> Self {
        Self {
            returned_at: Some(at),
            ..self.clone()
        }
    }
}

/// Row of a patron's loan history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanHistoryEntry {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub book_title: BookTitle,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl From<Loan> for LoanHistoryEntry {
    fn from(loan: Loan) -> Self {
        Self {
            loan_id: loan.id,
            book_id: loan.book_id,
            book_title: loan.book_title,
            borrowed_at: loan.borrowed_at,
            due_at: loan.due_at,
            returned_at: loan.returned_at,
        }
    }
}

/// Transition an intent was recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Borrow,
    Return,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Borrow => f.write_str("borrow"),
            Self::Return => f.write_str("return"),
        }
    }
}

/// Compensation log entry written before a two-store transition.
///
/// An intent stays pending until both writes (or a clean rollback) have
/// landed. Pending intents name the books the reconciler must re-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanIntent {
    id: Uuid,
    kind: IntentKind,
    book_id: BookId,
    loan_id: Option<LoanId>,
    user_id: UserId,
    recorded_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl LoanIntent {
    /// Pending intent for borrowing `book_id`.
    pub fn borrow(id: Uuid, user_id: UserId, book_id: BookId, at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: IntentKind::Borrow,
            book_id,
            loan_id: None,
            user_id,
            recorded_at: at,
            resolved_at: None,
        }
    }

    /// Pending intent for closing `loan`.
    pub fn return_of(id: Uuid, loan: &Loan, at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind: IntentKind::Return,
            book_id: loan.book_id,
            loan_id: Some(loan.id),
            user_id: loan.user_id.clone(),
            recorded_at: at,
            resolved_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn loan_id(&self) -> Option<LoanId> {
        self.loan_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Whether the intent still awaits resolution.
    pub fn is_pending(&self) -> bool {
        self.resolved_at.is_none()
    }

    /// Copy of this intent resolved at `at`.
    pub fn resolved(&self, at: DateTime<Utc>) -> Self {
        Self {
            resolved_at: Some(at),
            ..self.clone()
        }
    }
}
