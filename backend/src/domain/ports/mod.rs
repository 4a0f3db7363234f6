//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (catalogue, loan ledger, intent log, identity provider). Each trait exposes
//! strongly typed errors so adapters map their failures into predictable
//! variants.

mod macros;
pub(crate) use macros::define_port_error;

mod catalogue_store;
mod identity_provider;
mod loan_intent_store;
mod loan_store;

#[cfg(test)]
pub use catalogue_store::MockCatalogueStore;
pub use catalogue_store::{CatalogueStore, CatalogueStoreError, FixtureCatalogueStore};
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{FixtureIdentityProvider, IdentityProvider, IdentityProviderError};
#[cfg(test)]
pub use loan_intent_store::MockLoanIntentStore;
pub use loan_intent_store::{FixtureLoanIntentStore, LoanIntentStore, LoanIntentStoreError};
#[cfg(test)]
pub use loan_store::MockLoanStore;
pub use loan_store::{FixtureLoanStore, LoanStore, LoanStoreError};
