//! Reconciliation of cached availability flags against the loan ledger.
//!
//! A book's `available` flag is a projection of "no active loan exists". When a
//! two-store transition is interrupted the projection can drift; the
//! [`Reconciler`] recomputes it from the loan ledger and overwrites the cached
//! flag. Books named by pending intents younger than the grace window are left
//! alone because their transition may still be in flight. Background passes
//! re-read intents before marking a book available again, since a borrow may
//! have claimed it after the pass started.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::ports::CatalogueStoreError;
use crate::domain::store_call::{
    StoreDeadline, map_catalogue_error, map_intent_error, map_loan_error,
};
use crate::domain::{
    Book, BookCursor, BookId, BookQuery, DomainError, LendingPorts, LoanIntent, LoanQuery,
    QueryRange,
};

mod worker;

pub use worker::ReconciliationWorker;

/// Reconciler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationConfig {
    /// Pause between background passes.
    pub interval: Duration,
    /// Minimum intent age before the reconciler touches its book.
    pub grace: Duration,
    /// Page size used when sweeping the whole catalogue.
    pub batch_size: usize,
    /// Upper bound for each store call.
    pub store_deadline: StoreDeadline,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            grace: Duration::from_secs(60),
            batch_size: 50,
            store_deadline: StoreDeadline::default(),
        }
    }
}

/// Outcome of reconciling a single book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookReconciliation {
    /// Flag already matched the ledger.
    Consistent,
    /// Flag was overwritten with `available`.
    Repaired { available: bool },
    /// More than one active loan references the book.
    Violation { active_loans: usize },
    /// The book no longer exists.
    Missing,
    /// A transition started during the pass; the flag was left alone.
    InFlight,
}

/// Totals produced by a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub books_checked: usize,
    pub flags_repaired: usize,
    /// Books with more than one active loan. These are reported, not repaired.
    pub violations: Vec<BookId>,
    pub intents_resolved: usize,
}

impl ReconciliationReport {
    fn record(&mut self, book_id: BookId, outcome: BookReconciliation) {
        match outcome {
            BookReconciliation::Missing | BookReconciliation::InFlight => return,
            BookReconciliation::Consistent => {}
            BookReconciliation::Repaired { .. } => self.flags_repaired += 1,
            BookReconciliation::Violation { .. } => self.violations.push(book_id),
        }
        self.books_checked += 1;
    }

    /// Whether the pass found nothing to do.
    pub fn is_clean(&self) -> bool {
        self.flags_repaired == 0 && self.violations.is_empty() && self.intents_resolved == 0
    }
}

/// Recomputes availability flags from the loan ledger.
#[derive(Clone)]
pub struct Reconciler {
    ports: LendingPorts,
    clock: Arc<dyn Clock>,
    config: ReconciliationConfig,
}

/// How a pass treats a repair that would mark a book available again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseCheck {
    /// Overwrite as soon as the ledger shows no active loan.
    Direct,
    /// Re-read intents and the ledger first. Borrowers record their intent
    /// before claiming, so a claim made after the pass began shows up here.
    DeferToInFlight,
}

impl Reconciler {
    pub fn new(ports: LendingPorts, clock: Arc<dyn Clock>, config: ReconciliationConfig) -> Self {
        Self {
            ports,
            clock,
            config,
        }
    }

    pub fn config(&self) -> ReconciliationConfig {
        self.config
    }

    /// Reconcile one book regardless of pending intents.
    pub async fn reconcile_book(
        &self,
        book_id: BookId,
    ) -> Result<ReconciliationReport, DomainError> {
        let mut report = ReconciliationReport::default();
        let outcome = self.check_book(book_id, ReleaseCheck::Direct).await?;
        report.record(book_id, outcome);
        Ok(report)
    }

    /// Reconcile the books named by settled pending intents, then resolve
    /// those intents.
    ///
    /// A book whose check fails keeps its intents pending for the next pass.
    pub async fn reconcile_pending(&self) -> Result<ReconciliationReport, DomainError> {
        let pending = self.pending_intents().await?;
        let cutoff = self.settled_cutoff();
        let mut by_book: BTreeMap<BookId, Vec<Uuid>> = BTreeMap::new();
        for intent in pending.iter().filter(|intent| intent.recorded_at() <= cutoff) {
            by_book
                .entry(intent.book_id())
                .or_default()
                .push(intent.id());
        }

        let mut report = ReconciliationReport::default();
        for (book_id, intent_ids) in by_book {
            match self.check_book(book_id, ReleaseCheck::DeferToInFlight).await {
                Ok(outcome) => report.record(book_id, outcome),
                Err(err) => {
                    warn!(%book_id, error = %err, "reconciliation check failed; intents stay pending");
                    continue;
                }
            }
            for intent_id in intent_ids {
                match self.resolve_intent(intent_id).await {
                    Ok(()) => report.intents_resolved += 1,
                    Err(err) => warn!(%intent_id, error = %err, "failed to resolve intent"),
                }
            }
        }

        log_report("pending", &report);
        Ok(report)
    }

    /// Sweep the whole catalogue page by page, resuming each page after the
    /// last book seen.
    ///
    /// Books with a pending intent inside the grace window are skipped.
    pub async fn reconcile_all(&self) -> Result<ReconciliationReport, DomainError> {
        let in_flight = self.in_flight_books().await?;
        let batch_size = self.config.batch_size.max(1);
        let mut report = ReconciliationReport::default();
        let mut after: Option<BookCursor> = None;
        loop {
            let mut query = BookQuery::all().with_range(QueryRange::new(0, batch_size));
            if let Some(cursor) = after.take() {
                query = query.starting_after(cursor);
            }
            let batch = self
                .config
                .store_deadline
                .run("sweep catalogue", self.ports.catalogue.find(&query))
                .await?
                .map_err(map_catalogue_error)?;
            let fetched = batch.len();
            after = batch.last().map(|book| query.sort.cursor_for(book));
            for book in batch {
                if in_flight.contains(&book.id()) {
                    debug!(book_id = %book.id(), "skipping book with in-flight intent");
                    continue;
                }
                let outcome = self
                    .check_loaded_book(&book, ReleaseCheck::DeferToInFlight)
                    .await?;
                report.record(book.id(), outcome);
            }
            if fetched < batch_size {
                break;
            }
        }

        log_report("sweep", &report);
        Ok(report)
    }

    async fn check_book(
        &self,
        book_id: BookId,
        release: ReleaseCheck,
    ) -> Result<BookReconciliation, DomainError> {
        let found = self
            .config
            .store_deadline
            .run("find book", self.ports.catalogue.find_by_id(book_id))
            .await?
            .map_err(map_catalogue_error)?;
        match found {
            Some(book) => self.check_loaded_book(&book, release).await,
            None => {
                debug!(%book_id, "book vanished before reconciliation");
                Ok(BookReconciliation::Missing)
            }
        }
    }

    async fn check_loaded_book(
        &self,
        book: &Book,
        release: ReleaseCheck,
    ) -> Result<BookReconciliation, DomainError> {
        let book_id = book.id();
        let active_loans = self.active_loans(book_id).await?;

        let should_be_available = active_loans == 0;
        if should_be_available && !book.is_available() && release == ReleaseCheck::DeferToInFlight {
            if self.in_flight_books().await?.contains(&book_id) {
                debug!(%book_id, "book claimed during the pass; leaving flag alone");
                return Ok(BookReconciliation::InFlight);
            }
            if self.active_loans(book_id).await? > 0 {
                return Ok(BookReconciliation::Consistent);
            }
        }
        let repaired = if book.is_available() == should_be_available {
            false
        } else {
            self.overwrite_flag(book, should_be_available).await?
        };

        if active_loans > 1 {
            error!(%book_id, active_loans, "book has more than one active loan");
            return Ok(BookReconciliation::Violation { active_loans });
        }
        if repaired {
            info!(%book_id, available = should_be_available, "repaired availability flag");
            return Ok(BookReconciliation::Repaired {
                available: should_be_available,
            });
        }
        Ok(BookReconciliation::Consistent)
    }

    /// Active loans on `book_id`, capped at two.
    async fn active_loans(&self, book_id: BookId) -> Result<usize, DomainError> {
        let query = LoanQuery::active_for_book(book_id).with_range(QueryRange::new(0, 2));
        Ok(self
            .config
            .store_deadline
            .run("find active loans", self.ports.loans.find(&query))
            .await?
            .map_err(map_loan_error)?
            .len())
    }

    /// Returns `true` when this call changed the flag.
    async fn overwrite_flag(&self, book: &Book, desired: bool) -> Result<bool, DomainError> {
        let result = self
            .config
            .store_deadline
            .run(
                "repair availability",
                self.ports.catalogue.compare_and_set_availability(
                    book.id(),
                    book.is_available(),
                    desired,
                ),
            )
            .await?;
        match result {
            Ok(()) => Ok(true),
            Err(CatalogueStoreError::AvailabilityConflict { .. }) => {
                debug!(book_id = %book.id(), "availability changed concurrently; already {desired}");
                Ok(false)
            }
            Err(other) => Err(map_catalogue_error(other)),
        }
    }

    async fn pending_intents(&self) -> Result<Vec<LoanIntent>, DomainError> {
        self.config
            .store_deadline
            .run("list pending intents", self.ports.intents.pending())
            .await?
            .map_err(map_intent_error)
    }

    async fn in_flight_books(&self) -> Result<BTreeSet<BookId>, DomainError> {
        let cutoff = self.settled_cutoff();
        Ok(self
            .pending_intents()
            .await?
            .into_iter()
            .filter(|intent| intent.recorded_at() > cutoff)
            .map(|intent| intent.book_id())
            .collect())
    }

    async fn resolve_intent(&self, intent_id: Uuid) -> Result<(), DomainError> {
        self.config
            .store_deadline
            .run(
                "resolve intent",
                self.ports.intents.resolve(intent_id, self.clock.utc()),
            )
            .await?
            .map_err(map_intent_error)
    }

    fn settled_cutoff(&self) -> DateTime<Utc> {
        let now = self.clock.utc();
        chrono::Duration::from_std(self.config.grace)
            .ok()
            .and_then(|grace| now.checked_sub_signed(grace))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

fn log_report(pass: &'static str, report: &ReconciliationReport) {
    if report.is_clean() {
        debug!(pass, books_checked = report.books_checked, "reconciliation pass clean");
    } else {
        info!(
            pass,
            books_checked = report.books_checked,
            flags_repaired = report.flags_repaired,
            violations = report.violations.len(),
            intents_resolved = report.intents_resolved,
            "reconciliation pass finished"
        );
    }
}
