//! Port for the loan intent log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::LoanIntent;

use super::define_port_error;

define_port_error! {
    /// Errors raised by intent store adapters.
    pub enum LoanIntentStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "intent store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "intent store query failed: {message}",
        /// Referenced intent does not exist.
        NotFound { intent_id: Uuid } =>
            "intent {intent_id} does not exist",
    }
}

/// Port for recording and resolving loan intents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanIntentStore: Send + Sync {
    /// Persist a pending intent.
    async fn record(&self, intent: &LoanIntent) -> Result<(), LoanIntentStoreError>;

    /// Mark an intent resolved. Resolving twice keeps the first timestamp.
    async fn resolve(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), LoanIntentStoreError>;

    /// Pending intents, oldest first.
    async fn pending(&self) -> Result<Vec<LoanIntent>, LoanIntentStoreError>;
}

/// Fixture implementation that accepts and forgets every intent.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLoanIntentStore;

#[async_trait]
impl LoanIntentStore for FixtureLoanIntentStore {
    async fn record(&self, _intent: &LoanIntent) -> Result<(), LoanIntentStoreError> {
        Ok(())
    }

    async fn resolve(&self, _id: Uuid, _at: DateTime<Utc>) -> Result<(), LoanIntentStoreError> {
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<LoanIntent>, LoanIntentStoreError> {
        Ok(Vec::new())
    }
}
