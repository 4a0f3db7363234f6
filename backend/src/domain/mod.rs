//! Domain primitives, services, and ports.
//!
//! Purpose: model books, loans, and identities as validated types and
//! implement the loan lifecycle on top of driven ports. Nothing in here knows
//! how the stores are implemented.
//!
//! Public surface:
//! - DomainError / ErrorCode: transport-agnostic failure payload.
//! - Book, Loan, LoanIntent and friends: validated records.
//! - BookQuery / LoanQuery: store-agnostic query specifications.
//! - LoanEngine: borrow, return, and read-side projections.
//! - CatalogueService: admin curation with paginated listings.
//! - Reconciler / ReconciliationWorker: availability repair.
//! - AccessGate / AccountService: identity checks and sign-up.

pub mod access;
pub mod auth;
pub mod book;
pub mod catalogue_service;
pub mod error;
pub mod lending_ports;
pub mod loan;
pub mod loan_engine;
pub mod ports;
pub mod query;
pub mod reconciliation;
pub mod store_call;
pub mod user;

pub use self::access::{AccessGate, AccountService, Landing, ensure_admin};
pub use self::auth::{PASSWORD_MIN_CHARS, SignupCredentials, SignupValidationError};
pub use self::book::{Book, BookAuthor, BookDraft, BookId, BookTitle, BookValidationError};
pub use self::catalogue_service::{
    CatalogueConfig, CatalogueListing, CatalogueService, DEFAULT_CATALOGUE_PAGE_SIZE,
};
pub use self::error::{DomainError, ErrorCode, ErrorValidationError};
pub use self::lending_ports::LendingPorts;
pub use self::loan::{
    DEFAULT_LOAN_PERIOD_DAYS, IntentKind, Loan, LoanHistoryEntry, LoanId, LoanIntent, LoanPeriod,
    LoanPeriodError, NewLoan,
};
pub use self::loan_engine::{AvailableBooks, LoanEngine, LoanEngineConfig};
pub use self::query::{
    BookCursor, BookQuery, BookSort, LoanOrder, LoanQuery, QueryRange, SortDirection, SortKey,
};
pub use self::reconciliation::{
    BookReconciliation, ReconciliationConfig, ReconciliationReport, ReconciliationWorker,
    Reconciler,
};
pub use self::store_call::{DEFAULT_STORE_TIMEOUT, StoreDeadline};
pub use self::user::{CurrentUser, Role, UserId, UserValidationError};

/// Convenient domain result alias.
///
/// # Examples
/// ```
/// use lending::domain::{DomainError, DomainResult};
///
/// fn refuse() -> DomainResult<()> {
///     Err(DomainError::forbidden("nope"))
/// }
/// assert!(refuse().is_err());
/// ```
pub type DomainResult<T> = Result<T, DomainError>;
