//! In-memory loan ledger.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{LoanStore, LoanStoreError};
use crate::domain::{Loan, LoanId, LoanQuery, NewLoan};

use super::poisoned;

#[derive(Debug, Default)]
struct Ledger {
    loans: BTreeMap<LoanId, Loan>,
    last_id: u64,
}

/// Append-only loan ledger enforcing one active loan per book.
#[derive(Debug, Default)]
pub struct InMemoryLoanLedger {
    ledger: Mutex<Ledger>,
}

impl InMemoryLoanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self) -> Result<MutexGuard<'_, Ledger>, LoanStoreError> {
        self.ledger
            .lock()
            .map_err(|_| LoanStoreError::query(poisoned("loan ledger")))
    }
}

#[async_trait]
impl LoanStore for InMemoryLoanLedger {
    async fn find(&self, query: &LoanQuery) -> Result<Vec<Loan>, LoanStoreError> {
        let ledger = self.ledger()?;
        let mut hits: Vec<Loan> = ledger
            .loans
            .values()
            .filter(|loan| query.matches(loan))
            .cloned()
            .collect();
        hits.sort_by(|left, right| query.order.compare(left, right));
        Ok(match query.range {
            Some(range) => range.slice(hits),
            None => hits,
        })
    }

    async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>, LoanStoreError> {
        Ok(self.ledger()?.loans.get(&id).cloned())
    }

    async fn insert(&self, new_loan: &NewLoan) -> Result<Loan, LoanStoreError> {
        let mut ledger = self.ledger()?;
        if ledger
            .loans
            .values()
            .any(|loan| loan.book_id() == new_loan.book_id && loan.is_active())
        {
            return Err(LoanStoreError::active_loan_exists(new_loan.book_id.get()));
        }
        ledger.last_id += 1;
        let loan = Loan::new(LoanId::new(ledger.last_id), new_loan.clone());
        ledger.loans.insert(loan.id(), loan.clone());
        Ok(loan)
    }

    async fn mark_returned(&self, id: LoanId, at: DateTime<Utc>) -> Result<Loan, LoanStoreError> {
        let mut ledger = self.ledger()?;
        let loan = ledger
            .loans
            .get_mut(&id)
            .ok_or_else(|| LoanStoreError::not_found(id.get()))?;
        if !loan.is_active() {
            return Err(LoanStoreError::already_closed(id.get()));
        }
        *loan = loan.closed_at(at);
        Ok(loan.clone())
    }
}
