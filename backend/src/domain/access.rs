//! Identity checks, role landing, and account registration.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::ports::{IdentityProvider, IdentityProviderError};
use crate::domain::store_call::StoreDeadline;
use crate::domain::{CurrentUser, DomainError, Role, SignupCredentials};

fn map_identity_error(error: IdentityProviderError) -> DomainError {
    match error {
        IdentityProviderError::Connection { .. } => DomainError::store_failure(error.to_string()),
        IdentityProviderError::Rejected { .. } | IdentityProviderError::EmailTaken { .. } => {
            DomainError::invalid_request(error.to_string())
        }
    }
}

/// Fail with `Forbidden` unless `user` may curate the catalogue.
pub fn ensure_admin(user: &CurrentUser) -> Result<(), DomainError> {
    if user.is_admin() {
        return Ok(());
    }
    debug!(user_id = %user.id(), role = %user.role(), "administrative action refused");
    Err(DomainError::forbidden(format!(
        "user {} is not permitted to curate the catalogue",
        user.id()
    )))
}

/// Screen a signed-in user is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Landing {
    SignIn,
    AdminConsole,
    PatronDashboard,
}

impl Landing {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Admin => Self::AdminConsole,
            Role::User => Self::PatronDashboard,
        }
    }
}

/// Resolves the current user through the identity provider.
#[derive(Clone)]
pub struct AccessGate {
    identity: Arc<dyn IdentityProvider>,
    deadline: StoreDeadline,
}

impl AccessGate {
    pub fn new(identity: Arc<dyn IdentityProvider>, deadline: StoreDeadline) -> Self {
        Self { identity, deadline }
    }

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Result<Option<CurrentUser>, DomainError> {
        self.deadline
            .run("resolve current user", self.identity.current_user())
            .await?
            .map_err(map_identity_error)
    }

    /// The signed-in user, or `Unauthorized`.
    pub async fn require_user(&self) -> Result<CurrentUser, DomainError> {
        self.current_user()
            .await?
            .ok_or_else(|| DomainError::unauthorized("sign in to continue"))
    }

    /// The signed-in administrator, or `Unauthorized` / `Forbidden`.
    pub async fn require_admin(&self) -> Result<CurrentUser, DomainError> {
        let user = self.require_user().await?;
        ensure_admin(&user)?;
        Ok(user)
    }

    /// Where the current session should land.
    pub async fn landing(&self) -> Result<Landing, DomainError> {
        Ok(self
            .current_user()
            .await?
            .map_or(Landing::SignIn, |user| Landing::for_role(user.role())))
    }
}

/// Account registration.
#[derive(Clone)]
pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    deadline: StoreDeadline,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityProvider>, deadline: StoreDeadline) -> Self {
        Self { identity, deadline }
    }

    /// Validate the inputs, then register a patron account.
    ///
    /// # Errors
    /// `InvalidRequest` for a malformed e-mail, a password shorter than six
    /// characters, or a provider rejection.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<CurrentUser, DomainError> {
        let credentials = SignupCredentials::try_from_parts(email, password)
            .map_err(|err| DomainError::invalid_request(err.to_string()))?;
        let user = self
            .deadline
            .run("sign up", self.identity.sign_up(&credentials))
            .await?
            .map_err(map_identity_error)?;
        info!(user_id = %user.id(), "account registered");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{FixtureIdentityProvider, MockIdentityProvider};
    use rstest::rstest;

    fn gate_with(user: Option<CurrentUser>) -> AccessGate {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_current_user()
            .returning(move || Ok(user.clone()));
        AccessGate::new(Arc::new(identity), StoreDeadline::default())
    }

    fn admin() -> CurrentUser {
        CurrentUser::try_from_strings("a1", "admin").expect("valid admin")
    }

    fn patron() -> CurrentUser {
        CurrentUser::try_from_strings("u1", "user").expect("valid patron")
    }

    #[rstest]
    #[case(None, Landing::SignIn)]
    #[case(Some(admin()), Landing::AdminConsole)]
    #[case(Some(patron()), Landing::PatronDashboard)]
    #[tokio::test]
    async fn landing_follows_role(#[case] user: Option<CurrentUser>, #[case] expected: Landing) {
        let landing = gate_with(user).landing().await.expect("landing resolves");
        assert_eq!(landing, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn anonymous_callers_are_unauthorized() {
        let err = AccessGate::new(Arc::new(FixtureIdentityProvider), StoreDeadline::default())
            .require_user()
            .await
            .expect_err("nobody signed in");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }

    #[rstest]
    #[tokio::test]
    async fn patrons_are_forbidden_from_admin_actions() {
        let err = gate_with(Some(patron()))
            .require_admin()
            .await
            .expect_err("patron is not admin");
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let user = gate_with(Some(admin()))
            .require_admin()
            .await
            .expect("admin passes");
        assert!(user.is_admin());
    }

    #[rstest]
    #[tokio::test]
    async fn provider_outage_is_a_store_failure() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_current_user()
            .return_once(|| Err(IdentityProviderError::connection("auth down")));
        let err = AccessGate::new(Arc::new(identity), StoreDeadline::default())
            .current_user()
            .await
            .expect_err("provider unreachable");
        assert_eq!(err.code(), ErrorCode::StoreFailure);
        assert!(err.message().contains("auth down"));
    }

    #[rstest]
    #[case("not-an-email", "secret1")]
    #[case("reader@example.org", "12345")]
    #[tokio::test]
    async fn sign_up_validates_before_calling_provider(
        #[case] email: &str,
        #[case] password: &str,
    ) {
        let mut identity = MockIdentityProvider::new();
        identity.expect_sign_up().times(0);
        let err = AccountService::new(Arc::new(identity), StoreDeadline::default())
            .sign_up(email, password)
            .await
            .expect_err("invalid input");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn sign_up_registers_patron() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_up()
            .withf(|credentials| credentials.email() == "reader@example.org")
            .times(1)
            .return_once(|_| Ok(patron()));
        let user = AccountService::new(Arc::new(identity), StoreDeadline::default())
            .sign_up(" reader@example.org ", "secret1")
            .await
            .expect("sign up succeeds");
        assert_eq!(user.role(), Role::User);
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_email_is_invalid_request() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_up()
            .return_once(|credentials| {
                Err(IdentityProviderError::email_taken(credentials.email()))
            });
        let err = AccountService::new(Arc::new(identity), StoreDeadline::default())
            .sign_up("reader@example.org", "secret1")
            .await
            .expect_err("email taken");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
