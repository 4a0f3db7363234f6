//! In-memory identity provider.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{IdentityProvider, IdentityProviderError};
use crate::domain::{CurrentUser, Role, SignupCredentials, UserId};

use super::poisoned;

#[derive(Debug, Default)]
struct Directory {
    accounts: HashMap<String, CurrentUser>,
    signed_in: Option<CurrentUser>,
}

/// Identity provider keeping accounts by e-mail and a single session slot.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    directory: Mutex<Directory>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with `user` already signed in.
    pub fn signed_in_as(user: CurrentUser) -> Self {
        let provider = Self::new();
        if let Ok(mut directory) = provider.directory.lock() {
            directory.signed_in = Some(user);
        }
        provider
    }

    /// Replace the signed-in user.
    pub fn sign_in(&self, user: CurrentUser) -> Result<(), IdentityProviderError> {
        self.directory()?.signed_in = Some(user);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), IdentityProviderError> {
        self.directory()?.signed_in = None;
        Ok(())
    }

    fn directory(&self) -> Result<MutexGuard<'_, Directory>, IdentityProviderError> {
        self.directory
            .lock()
            .map_err(|_| IdentityProviderError::connection(poisoned("identity directory")))
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn current_user(&self) -> Result<Option<CurrentUser>, IdentityProviderError> {
        Ok(self.directory()?.signed_in.clone())
    }

    async fn sign_up(
        &self,
        credentials: &SignupCredentials,
    ) -> Result<CurrentUser, IdentityProviderError> {
        let mut directory = self.directory()?;
        let email = credentials.email().to_lowercase();
        if directory.accounts.contains_key(&email) {
            return Err(IdentityProviderError::email_taken(credentials.email()));
        }
        let id = UserId::new(Uuid::new_v4().to_string())
            .map_err(|err| IdentityProviderError::rejected(err.to_string()))?;
        let user = CurrentUser::new(id, Role::User);
        directory.accounts.insert(email, user.clone());
        Ok(user)
    }
}
