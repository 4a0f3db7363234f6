//! Deadline wrapper and error mapping for driven-port calls.
//!
//! Every store round-trip made by the domain services goes through
//! [`StoreDeadline::run`], so a stalled adapter surfaces as
//! [`ErrorCode::StoreTimeout`](super::ErrorCode::StoreTimeout) instead of
//! blocking the caller indefinitely. Adapter errors are then translated by the
//! `map_*_error` helpers, which keep the adapter message verbatim.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::DomainError;
use super::ports::{CatalogueStoreError, LoanIntentStoreError, LoanStoreError};

/// Default upper bound for a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound applied to each individual store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreDeadline(Duration);

impl StoreDeadline {
    pub const fn new(limit: Duration) -> Self {
        Self(limit)
    }

    pub const fn limit(self) -> Duration {
        self.0
    }

    /// Await `call`, failing with a store timeout once the limit elapses.
    ///
    /// The inner result is returned untouched so callers can map adapter
    /// errors with their own `map_*_error` helpers.
    pub async fn run<F, T>(self, operation: &'static str, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(self.0, call).await.map_err(|_| {
            let timeout_ms = u64::try_from(self.0.as_millis()).unwrap_or(u64::MAX);
            warn!(operation, timeout_ms, "store call timed out");
            DomainError::store_timeout(format!(
                "{operation} did not complete within {timeout_ms} ms"
            ))
        })
    }
}

impl Default for StoreDeadline {
    fn default() -> Self {
        Self(DEFAULT_STORE_TIMEOUT)
    }
}

pub(crate) fn map_catalogue_error(error: CatalogueStoreError) -> DomainError {
    match error {
        CatalogueStoreError::Connection { .. } | CatalogueStoreError::Query { .. } => {
            DomainError::store_failure(error.to_string())
        }
        CatalogueStoreError::NotFound { book_id } => {
            DomainError::not_found(format!("book {book_id} not found"))
        }
        CatalogueStoreError::AvailabilityConflict { book_id, .. } => {
            DomainError::book_unavailable(format!("book {book_id} is already on loan"))
        }
    }
}

pub(crate) fn map_loan_error(error: LoanStoreError) -> DomainError {
    match error {
        LoanStoreError::Connection { .. } | LoanStoreError::Query { .. } => {
            DomainError::store_failure(error.to_string())
        }
        LoanStoreError::NotFound { loan_id } => {
            DomainError::not_found(format!("loan {loan_id} not found"))
        }
        LoanStoreError::ActiveLoanExists { book_id } => {
            DomainError::book_unavailable(format!("book {book_id} is already on loan"))
        }
        LoanStoreError::AlreadyClosed { loan_id } => {
            DomainError::already_returned(format!("loan {loan_id} has already been returned"))
        }
    }
}

pub(crate) fn map_intent_error(error: LoanIntentStoreError) -> DomainError {
    match error {
        LoanIntentStoreError::Connection { .. } | LoanIntentStoreError::Query { .. } => {
            DomainError::store_failure(error.to_string())
        }
        LoanIntentStoreError::NotFound { .. } => DomainError::internal(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn completed_calls_pass_through() {
        let deadline = StoreDeadline::new(Duration::from_secs(1));
        let value = deadline
            .run("find book", async { Ok::<_, ()>(7) })
            .await
            .expect("call finishes in time");
        assert_eq!(value, Ok(7));
    }

    #[rstest]
    #[tokio::test]
    async fn stalled_calls_time_out() {
        let deadline = StoreDeadline::new(Duration::from_millis(10));
        let err = deadline
            .run("insert loan", std::future::pending::<()>())
            .await
            .expect_err("pending future never completes");
        assert_eq!(err.code(), ErrorCode::StoreTimeout);
        assert!(err.message().contains("insert loan"));
        assert!(err.message().contains("10 ms"));
    }

    #[rstest]
    #[case(CatalogueStoreError::query("disk full"), ErrorCode::StoreFailure)]
    #[case(CatalogueStoreError::connection("refused"), ErrorCode::StoreFailure)]
    #[case(CatalogueStoreError::not_found(1_u64), ErrorCode::NotFound)]
    #[case(CatalogueStoreError::availability_conflict(1_u64, false), ErrorCode::BookUnavailable)]
    fn catalogue_errors_map_to_codes(
        #[case] error: CatalogueStoreError,
        #[case] expected: ErrorCode,
    ) {
        assert_eq!(map_catalogue_error(error).code(), expected);
    }

    #[rstest]
    #[case(LoanStoreError::query("disk full"), ErrorCode::StoreFailure)]
    #[case(LoanStoreError::not_found(2_u64), ErrorCode::NotFound)]
    #[case(LoanStoreError::active_loan_exists(1_u64), ErrorCode::BookUnavailable)]
    #[case(LoanStoreError::already_closed(2_u64), ErrorCode::AlreadyReturned)]
    fn loan_errors_map_to_codes(#[case] error: LoanStoreError, #[case] expected: ErrorCode) {
        assert_eq!(map_loan_error(error).code(), expected);
    }

    #[rstest]
    fn store_messages_are_kept_verbatim() {
        let err = map_loan_error(LoanStoreError::query("constraint loans_pkey violated"));
        assert!(err.message().contains("constraint loans_pkey violated"));
        let err = map_intent_error(LoanIntentStoreError::connection("socket closed"));
        assert!(err.message().contains("socket closed"));
    }
}
