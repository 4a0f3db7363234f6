//! Port for the append-only loan ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Loan, LoanId, LoanQuery, NewLoan};

use super::define_port_error;

define_port_error! {
    /// Errors raised by loan store adapters.
    pub enum LoanStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "loan store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "loan store query failed: {message}",
        /// Referenced loan does not exist.
        NotFound { loan_id: u64 } =>
            "loan {loan_id} does not exist",
        /// Insert refused because the book already has an open loan.
        ActiveLoanExists { book_id: u64 } =>
            "book {book_id} already has an active loan",
        /// Conditional close found the loan already returned.
        AlreadyClosed { loan_id: u64 } =>
            "loan {loan_id} is already returned",
    }
}

/// Port for reading and writing loans.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// Loans matching `query`, in query order and window.
    async fn find(&self, query: &LoanQuery) -> Result<Vec<Loan>, LoanStoreError>;

    /// Find a loan by id.
    async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>, LoanStoreError>;

    /// Insert an open loan.
    ///
    /// Fails with [`LoanStoreError::ActiveLoanExists`] when the book already
    /// has one.
    async fn insert(&self, new_loan: &NewLoan) -> Result<Loan, LoanStoreError>;

    /// Set `returned_at = at` only when the loan is still open.
    async fn mark_returned(&self, id: LoanId, at: DateTime<Utc>) -> Result<Loan, LoanStoreError>;
}

/// Fixture implementation for tests that do not exercise loans.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLoanStore;

#[async_trait]
impl LoanStore for FixtureLoanStore {
    async fn find(&self, _query: &LoanQuery) -> Result<Vec<Loan>, LoanStoreError> {
        Ok(Vec::new())
    }

    async fn find_by_id(&self, _id: LoanId) -> Result<Option<Loan>, LoanStoreError> {
        Ok(None)
    }

    async fn insert(&self, new_loan: &NewLoan) -> Result<Loan, LoanStoreError> {
        Ok(Loan::new(LoanId::new(1), new_loan.clone()))
    }

    async fn mark_returned(&self, id: LoanId, _at: DateTime<Utc>) -> Result<Loan, LoanStoreError> {
        Err(LoanStoreError::not_found(id.get()))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use chrono::Utc;
    use rstest::rstest;

    use super::*;
    use crate::domain::{BookId, BookTitle, LoanPeriod, UserId};

    #[rstest]
    #[tokio::test]
    async fn fixture_insert_opens_loan() {
        let store = FixtureLoanStore;
        let new_loan = NewLoan::open(
            UserId::new("u1").expect("valid user"),
            BookId::new(1),
            BookTitle::new("Moon").expect("valid title"),
            Utc::now(),
            LoanPeriod::default(),
        );
        let loan = store.insert(&new_loan).await.expect("fixture insert");
        assert!(loan.is_active());
        assert_eq!(loan.book_id(), BookId::new(1));
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_lookups_are_empty() {
        let store = FixtureLoanStore;
        assert!(store.find_by_id(LoanId::new(1)).await.expect("lookup").is_none());
        assert!(store.find(&LoanQuery::default()).await.expect("find").is_empty());
    }

    #[rstest]
    fn active_loan_error_formats_book() {
        let err = LoanStoreError::active_loan_exists(4_u64);
        assert!(err.to_string().contains("book 4"));
    }
}
