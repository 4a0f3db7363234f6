//! Port bundle shared by the loan engine, reconciler, and catalogue service.

use std::sync::Arc;

use crate::domain::ports::{CatalogueStore, LoanIntentStore, LoanStore};

/// Driven ports required by the lending services.
#[derive(Clone)]
pub struct LendingPorts {
    /// Catalogue of books and availability flags.
    pub catalogue: Arc<dyn CatalogueStore>,
    /// Append-only loan ledger.
    pub loans: Arc<dyn LoanStore>,
    /// Compensation intent log.
    pub intents: Arc<dyn LoanIntentStore>,
}

impl LendingPorts {
    /// Build a strongly-typed port bundle.
    pub fn new(
        catalogue: Arc<dyn CatalogueStore>,
        loans: Arc<dyn LoanStore>,
        intents: Arc<dyn LoanIntentStore>,
    ) -> Self {
        Self {
            catalogue,
            loans,
            intents,
        }
    }
}
