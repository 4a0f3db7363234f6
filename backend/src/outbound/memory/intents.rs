//! In-memory loan intent log.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::LoanIntent;
use crate::domain::ports::{LoanIntentStore, LoanIntentStoreError};

use super::poisoned;

#[derive(Debug, Default)]
pub struct InMemoryLoanIntents {
    intents: Mutex<HashMap<Uuid, LoanIntent>>,
}

impl InMemoryLoanIntents {
    pub fn new() -> Self {
        Self::default()
    }

    fn intents(&self) -> Result<MutexGuard<'_, HashMap<Uuid, LoanIntent>>, LoanIntentStoreError> {
        self.intents
            .lock()
            .map_err(|_| LoanIntentStoreError::query(poisoned("intent log")))
    }
}

#[async_trait]
impl LoanIntentStore for InMemoryLoanIntents {
    async fn record(&self, intent: &LoanIntent) -> Result<(), LoanIntentStoreError> {
        self.intents()?.insert(intent.id(), intent.clone());
        Ok(())
    }

    async fn resolve(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), LoanIntentStoreError> {
        let mut intents = self.intents()?;
        let intent = intents
            .get_mut(&id)
            .ok_or_else(|| LoanIntentStoreError::not_found(id))?;
        if intent.is_pending() {
            *intent = intent.resolved(at);
        }
        Ok(())
    }

    async fn pending(&self) -> Result<Vec<LoanIntent>, LoanIntentStoreError> {
        let mut pending: Vec<LoanIntent> = self
            .intents()?
            .values()
            .filter(|intent| intent.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|intent| (intent.recorded_at(), intent.id()));
        Ok(pending)
    }
}
