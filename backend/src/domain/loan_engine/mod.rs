//! Loan lifecycle engine.
//!
//! The engine moves the catalogue and the loan ledger between consistent
//! states. Neither store offers a transaction spanning both, so each
//! transition is bracketed by an intent record:
//!
//! - **borrow** claims the book with a conditional availability write
//!   (`true -> false`) before inserting the loan, and releases the claim if the
//!   insert fails;
//! - **return** closes the loan with a conditional write (open -> closed), then
//!   flips availability back (`false -> true`).
//!
//! When the compensating write itself fails the engine reports a partial
//! failure, leaves the intent pending for the [`Reconciler`], and optionally
//! runs an immediate reconciliation of the affected book.
//!
//! Store outcomes are only ambiguous after a timeout. In that case the intent
//! also stays pending so the reconciler re-checks the book.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::ports::CatalogueStoreError;
use crate::domain::reconciliation::{ReconciliationConfig, Reconciler};
use crate::domain::store_call::{
    StoreDeadline, map_catalogue_error, map_intent_error, map_loan_error,
};
use crate::domain::{
    Book, BookId, BookQuery, DomainError, ErrorCode, LendingPorts, Loan, LoanHistoryEntry, LoanId,
    LoanIntent, LoanPeriod, LoanQuery, NewLoan, UserId,
};

mod listing;

pub use listing::AvailableBooks;

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanEngineConfig {
    /// Interval between borrowing and the due date.
    pub loan_period: LoanPeriod,
    /// Upper bound for each store call.
    pub store_deadline: StoreDeadline,
    /// Books fetched per round-trip by [`AvailableBooks`].
    pub listing_batch_size: usize,
    /// Reconcile the affected book as soon as a partial failure is detected.
    pub reconcile_on_partial_failure: bool,
}

impl Default for LoanEngineConfig {
    fn default() -> Self {
        Self {
            loan_period: LoanPeriod::default(),
            store_deadline: StoreDeadline::default(),
            listing_batch_size: 50,
            reconcile_on_partial_failure: true,
        }
    }
}

/// Result of a conditional availability write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagWrite {
    Applied,
    /// The flag already held the desired value.
    AlreadyDesired,
}

/// Borrow, return, and read-side projections over the lending stores.
#[derive(Clone)]
pub struct LoanEngine {
    ports: LendingPorts,
    clock: Arc<dyn Clock>,
    config: LoanEngineConfig,
    reconciler: Reconciler,
}

impl LoanEngine {
    /// Build an engine; the embedded reconciler shares the engine's deadline.
    pub fn new(ports: LendingPorts, clock: Arc<dyn Clock>, config: LoanEngineConfig) -> Self {
        let reconciler = Reconciler::new(
            ports.clone(),
            Arc::clone(&clock),
            ReconciliationConfig {
                store_deadline: config.store_deadline,
                ..ReconciliationConfig::default()
            },
        );
        Self::with_reconciler(ports, clock, config, reconciler)
    }

    /// Build an engine with an explicitly configured reconciler.
    pub fn with_reconciler(
        ports: LendingPorts,
        clock: Arc<dyn Clock>,
        config: LoanEngineConfig,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            ports,
            clock,
            config,
            reconciler,
        }
    }

    pub fn config(&self) -> LoanEngineConfig {
        self.config
    }

    /// Lend `book_id` to `user_id`.
    ///
    /// # Errors
    /// - `NotFound` when the book does not exist.
    /// - `BookUnavailable` when the book is on loan, including when a
    ///   concurrent borrower wins the claim.
    /// - `StoreFailure` / `StoreTimeout` when a store call fails and the claim
    ///   was rolled back.
    /// - `PartialBorrowFailure` when the loan insert failed and the claim
    ///   could not be released.
    pub async fn borrow(&self, user_id: &UserId, book_id: BookId) -> Result<Loan, DomainError> {
        let book = self.load_book(book_id).await?;
        if !book.is_available() {
            debug!(%book_id, %user_id, "borrow rejected: book on loan");
            return Err(unavailable(book_id));
        }

        let borrowed_at = self.clock.utc();
        let intent = LoanIntent::borrow(Uuid::new_v4(), user_id.clone(), book_id, borrowed_at);
        self.record_intent(&intent).await?;

        match self.write_availability(book_id, true, false).await {
            Ok(FlagWrite::Applied) => {}
            Ok(FlagWrite::AlreadyDesired) => {
                debug!(%book_id, %user_id, "borrow lost the claim to a concurrent borrower");
                self.settle_intent(&intent).await;
                return Err(unavailable(book_id));
            }
            Err(err) => {
                self.settle_intent_after(&intent, &err).await;
                return Err(err);
            }
        }

        let new_loan = NewLoan::open(
            user_id.clone(),
            book_id,
            book.title().clone(),
            borrowed_at,
            self.config.loan_period,
        );
        let loan = match self.insert_loan(&new_loan).await {
            Ok(loan) => loan,
            Err(insert_error) => return Err(self.release_claim(&intent, insert_error).await),
        };

        self.settle_intent(&intent).await;
        info!(
            loan_id = %loan.id(),
            %book_id,
            %user_id,
            due_at = %loan.due_at(),
            "book borrowed"
        );
        Ok(loan)
    }

    /// Close `loan_id` and make `book_id` available again.
    ///
    /// # Errors
    /// - `NotFound` when the loan does not exist.
    /// - `InvalidRequest` when the loan belongs to a different book.
    /// - `AlreadyReturned` when the loan is closed, including when a
    ///   concurrent return wins.
    /// - `StoreFailure` / `StoreTimeout` when closing the loan fails.
    /// - `PartialReturnFailure` when the loan closed but the book could not
    ///   be made available.
    pub async fn return_loan(&self, loan_id: LoanId, book_id: BookId) -> Result<Loan, DomainError> {
        let loan = self.load_loan(loan_id).await?;
        if loan.book_id() != book_id {
            return Err(DomainError::invalid_request(format!(
                "loan {loan_id} does not belong to book {book_id}"
            ))
            .with_details(json!({
                "loanId": loan_id.get(),
                "expectedBookId": loan.book_id().get(),
                "suppliedBookId": book_id.get(),
            })));
        }
        if !loan.is_active() {
            debug!(%loan_id, "return rejected: loan already closed");
            return Err(already_returned(loan_id));
        }

        let returned_at = self.clock.utc();
        let intent = LoanIntent::return_of(Uuid::new_v4(), &loan, returned_at);
        self.record_intent(&intent).await?;

        let closed = match self.close_loan(loan_id, returned_at).await {
            Ok(closed) => closed,
            Err(err) => {
                self.settle_intent_after(&intent, &err).await;
                return Err(err);
            }
        };

        match self.write_availability(book_id, false, true).await {
            Ok(FlagWrite::Applied) => {}
            Ok(FlagWrite::AlreadyDesired) => {
                warn!(%book_id, %loan_id, "book already available when its loan closed");
            }
            Err(flag_error) => {
                error!(
                    %book_id,
                    %loan_id,
                    intent_id = %intent.id(),
                    error = %flag_error,
                    "loan closed but book could not be made available"
                );
                let reconciled = self.reconcile_after_partial_failure(book_id).await;
                return Err(DomainError::partial_return_failure(format!(
                    "loan {loan_id} was closed but book {book_id} could not be made available: {}",
                    flag_error.message()
                ))
                .with_details(json!({
                    "bookId": book_id.get(),
                    "loanId": loan_id.get(),
                    "intentId": intent.id(),
                    "reconciled": reconciled,
                })));
            }
        }

        self.settle_intent(&intent).await;
        info!(%loan_id, %book_id, "loan returned");
        Ok(closed)
    }

    /// Restartable handle over available books, optionally filtered by a
    /// case-insensitive title substring.
    pub fn list_available(&self, title_filter: Option<&str>) -> AvailableBooks {
        let query = match title_filter {
            Some(needle) => BookQuery::all().available_only().with_title_contains(needle),
            None => BookQuery::all().available_only(),
        };
        AvailableBooks::new(
            Arc::clone(&self.ports.catalogue),
            query,
            self.config.listing_batch_size,
            self.config.store_deadline,
        )
    }

    /// Every loan of `user_id`, open and returned, most recent first.
    pub async fn list_history(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LoanHistoryEntry>, DomainError> {
        let loans = self
            .config
            .store_deadline
            .run(
                "list loan history",
                self.ports.loans.find(&LoanQuery::for_user(user_id.clone())),
            )
            .await?
            .map_err(map_loan_error)?;
        Ok(loans.into_iter().map(LoanHistoryEntry::from).collect())
    }

    async fn release_claim(&self, intent: &LoanIntent, insert_error: DomainError) -> DomainError {
        let book_id = intent.book_id();
        if insert_error.code() == ErrorCode::BookUnavailable {
            // The ledger already holds an active loan, so the cleared flag is correct.
            warn!(%book_id, "loan insert refused: book already has an active loan");
            self.settle_intent(intent).await;
            return insert_error;
        }

        match self.write_availability(book_id, false, true).await {
            Ok(_) => {
                debug!(%book_id, error = %insert_error, "loan insert failed; claim released");
                self.settle_intent_after(intent, &insert_error).await;
                insert_error
            }
            Err(release_error) => {
                error!(
                    %book_id,
                    intent_id = %intent.id(),
                    insert_error = %insert_error,
                    release_error = %release_error,
                    "borrow left book claimed without a loan"
                );
                let reconciled = self.reconcile_after_partial_failure(book_id).await;
                DomainError::partial_borrow_failure(format!(
                    "loan insert for book {book_id} failed ({}) and the claim could not be released ({})",
                    insert_error.message(),
                    release_error.message()
                ))
                .with_details(json!({
                    "bookId": book_id.get(),
                    "intentId": intent.id(),
                    "reconciled": reconciled,
                }))
            }
        }
    }

    /// Returns `true` when the book was brought back in line.
    async fn reconcile_after_partial_failure(&self, book_id: BookId) -> bool {
        if !self.config.reconcile_on_partial_failure {
            return false;
        }
        match self.reconciler.reconcile_book(book_id).await {
            Ok(report) => {
                info!(%book_id, flags_repaired = report.flags_repaired, "immediate reconciliation ran");
                report.violations.is_empty() && report.books_checked == 1
            }
            Err(err) => {
                warn!(%book_id, error = %err, "immediate reconciliation failed");
                false
            }
        }
    }

    async fn load_book(&self, book_id: BookId) -> Result<Book, DomainError> {
        self.config
            .store_deadline
            .run("find book", self.ports.catalogue.find_by_id(book_id))
            .await?
            .map_err(map_catalogue_error)?
            .ok_or_else(|| DomainError::not_found(format!("book {book_id} not found")))
    }

    async fn load_loan(&self, loan_id: LoanId) -> Result<Loan, DomainError> {
        self.config
            .store_deadline
            .run("find loan", self.ports.loans.find_by_id(loan_id))
            .await?
            .map_err(map_loan_error)?
            .ok_or_else(|| DomainError::not_found(format!("loan {loan_id} not found")))
    }

    async fn insert_loan(&self, new_loan: &NewLoan) -> Result<Loan, DomainError> {
        self.config
            .store_deadline
            .run("insert loan", self.ports.loans.insert(new_loan))
            .await?
            .map_err(map_loan_error)
    }

    async fn close_loan(
        &self,
        loan_id: LoanId,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Loan, DomainError> {
        self.config
            .store_deadline
            .run("close loan", self.ports.loans.mark_returned(loan_id, at))
            .await?
            .map_err(map_loan_error)
    }

    async fn write_availability(
        &self,
        book_id: BookId,
        expected: bool,
        desired: bool,
    ) -> Result<FlagWrite, DomainError> {
        let result = self
            .config
            .store_deadline
            .run(
                "write availability",
                self.ports
                    .catalogue
                    .compare_and_set_availability(book_id, expected, desired),
            )
            .await?;
        match result {
            Ok(()) => Ok(FlagWrite::Applied),
            Err(CatalogueStoreError::AvailabilityConflict { actual, .. }) if actual == desired => {
                Ok(FlagWrite::AlreadyDesired)
            }
            Err(other) => Err(map_catalogue_error(other)),
        }
    }

    async fn record_intent(&self, intent: &LoanIntent) -> Result<(), DomainError> {
        self.config
            .store_deadline
            .run("record intent", self.ports.intents.record(intent))
            .await?
            .map_err(map_intent_error)
    }

    /// Resolve unless `cause` leaves the store outcome unknown.
    async fn settle_intent_after(&self, intent: &LoanIntent, cause: &DomainError) {
        if cause.code() == ErrorCode::StoreTimeout {
            warn!(
                intent_id = %intent.id(),
                book_id = %intent.book_id(),
                "store outcome unknown after timeout; intent left for reconciliation"
            );
            return;
        }
        self.settle_intent(intent).await;
    }

    /// A failed resolve only costs an extra reconciliation check, so it is
    /// logged rather than returned.
    async fn settle_intent(&self, intent: &LoanIntent) {
        let result = self
            .config
            .store_deadline
            .run(
                "resolve intent",
                self.ports.intents.resolve(intent.id(), self.clock.utc()),
            )
            .await
            .and_then(|inner| inner.map_err(map_intent_error));
        if let Err(err) = result {
            warn!(
                intent_id = %intent.id(),
                kind = %intent.kind(),
                error = %err,
                "failed to resolve intent"
            );
        }
    }
}

fn unavailable(book_id: BookId) -> DomainError {
    DomainError::book_unavailable(format!("book {book_id} is already on loan"))
}

fn already_returned(loan_id: LoanId) -> DomainError {
    DomainError::already_returned(format!("loan {loan_id} has already been returned"))
}
