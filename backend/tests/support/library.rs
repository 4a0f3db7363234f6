//! In-memory library wiring shared by integration suites.

use std::sync::Arc;

use lending::domain::{
    Book, BookDraft, BookId, CatalogueConfig, CatalogueService, CurrentUser, LoanEngine,
    LoanEngineConfig, ReconciliationConfig, Reconciler,
};
use lending::domain::ports::CatalogueStore;
use lending::outbound::memory::InMemoryLending;
use lending::test_support::MutableClock;
use mockable::Clock;

/// Engine, reconciler, and curation service over one set of in-memory stores.
#[derive(Clone)]
pub struct Library {
    pub stores: InMemoryLending,
    pub clock: Arc<MutableClock>,
    pub engine: LoanEngine,
    pub reconciler: Reconciler,
    pub curation: CatalogueService,
}

impl Library {
    pub fn new() -> Self {
        let stores = InMemoryLending::new();
        let ports = stores.ports();
        let clock = Arc::new(MutableClock::default());
        let shared_clock: Arc<dyn Clock> = clock.clone();
        let reconciler = Reconciler::new(
            ports.clone(),
            Arc::clone(&shared_clock),
            ReconciliationConfig::default(),
        );
        let engine = LoanEngine::with_reconciler(
            ports.clone(),
            shared_clock,
            LoanEngineConfig::default(),
            reconciler.clone(),
        );
        let curation = CatalogueService::new(
            Arc::clone(&ports.catalogue),
            Arc::clone(&ports.loans),
            CatalogueConfig::default(),
        );
        Self {
            stores,
            clock,
            engine,
            reconciler,
            curation,
        }
    }

    pub fn admin() -> CurrentUser {
        CurrentUser::try_from_strings("admin-1", "admin").expect("valid admin")
    }

    /// Add an available book through the admin service.
    pub async fn shelve(&self, title: &str, author: &str) -> Book {
        let draft = BookDraft::try_from_strings(title, author).expect("valid draft");
        self.curation
            .create_book(&Self::admin(), &draft)
            .await
            .expect("book created")
    }

    /// Current availability flag as stored in the catalogue.
    pub async fn is_available(&self, id: BookId) -> bool {
        self.stores
            .catalogue
            .find_by_id(id)
            .await
            .expect("catalogue lookup")
            .expect("book exists")
            .is_available()
    }
}
