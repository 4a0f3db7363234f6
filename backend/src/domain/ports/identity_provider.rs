//! Port for the external identity provider.

use async_trait::async_trait;

use crate::domain::{CurrentUser, SignupCredentials};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityProviderError {
        /// Provider could not be reached.
        Connection { message: String } =>
            "identity provider connection failed: {message}",
        /// Provider refused the request.
        Rejected { message: String } =>
            "identity provider rejected the request: {message}",
        /// An account already exists for the e-mail address.
        EmailTaken { email: String } =>
            "an account for {email} already exists",
    }
}

/// Port resolving the authenticated user and registering new accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    async fn current_user(&self) -> Result<Option<CurrentUser>, IdentityProviderError>;

    /// Register an account. New accounts always receive the patron role.
    async fn sign_up(
        &self,
        credentials: &SignupCredentials,
    ) -> Result<CurrentUser, IdentityProviderError>;
}

/// Fixture provider with nobody signed in.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIdentityProvider;

#[async_trait]
impl IdentityProvider for FixtureIdentityProvider {
    async fn current_user(&self) -> Result<Option<CurrentUser>, IdentityProviderError> {
        Ok(None)
    }

    async fn sign_up(
        &self,
        _credentials: &SignupCredentials,
    ) -> Result<CurrentUser, IdentityProviderError> {
        Err(IdentityProviderError::rejected("fixture provider does not register accounts"))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn fixture_has_no_current_user() {
        let provider = FixtureIdentityProvider;
        let user = provider.current_user().await.expect("fixture lookup");
        assert!(user.is_none());
    }

    #[rstest]
    fn email_taken_formats_address() {
        let err = IdentityProviderError::email_taken("reader@example.org");
        assert_eq!(
            err.to_string(),
            "an account for reader@example.org already exists"
        );
    }
}
