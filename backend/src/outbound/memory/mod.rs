//! Process-local adapters.
//!
//! Each store keeps its state behind a single `std::sync::Mutex`, which makes
//! every conditional write (availability compare-and-set, conditional close,
//! single-active-loan insert) atomic with respect to other callers. A poisoned
//! lock is reported as a query error rather than propagated as a panic.

mod catalogue;
mod identity;
mod intents;
mod loans;

pub use catalogue::InMemoryCatalogue;
pub use identity::InMemoryIdentityProvider;
pub use intents::InMemoryLoanIntents;
pub use loans::InMemoryLoanLedger;

use std::sync::Arc;

use crate::domain::LendingPorts;

/// The three lending stores wired together, with typed handles kept for
/// inspection.
#[derive(Clone, Default)]
pub struct InMemoryLending {
    pub catalogue: Arc<InMemoryCatalogue>,
    pub loans: Arc<InMemoryLoanLedger>,
    pub intents: Arc<InMemoryLoanIntents>,
}

impl InMemoryLending {
    pub fn new() -> Self {
        Self::default()
    }

    /// Port bundle backed by these stores.
    pub fn ports(&self) -> LendingPorts {
        LendingPorts::new(
            self.catalogue.clone(),
            self.loans.clone(),
            self.intents.clone(),
        )
    }
}

fn poisoned(store: &str) -> String {
    format!("{store} lock poisoned")
}
