//! Identity data handed to the domain by the identity provider.
//!
//! The domain never reads a "current session" on its own: callers resolve a
//! [`CurrentUser`] through the identity port and pass ids explicitly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Validation errors returned by [`UserId::new`] and [`Role::from_str`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    PaddedId,
    UnknownRole { role: String },
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::PaddedId => write!(f, "user id must not carry surrounding whitespace"),
            Self::UnknownRole { role } => write!(f, "unknown role `{role}`"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Opaque user identifier issued by the identity provider.
///
/// ## Invariants
/// - Non-empty and free of leading/trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    ///
    /// # Examples
    /// ```
    /// use lending::domain::UserId;
    ///
    /// assert!(UserId::new("u1").is_ok());
    /// assert!(UserId::new("").is_err());
    /// ```
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.trim().is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserValidationError::PaddedId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Role string stored alongside each account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Patron who browses and borrows.
    #[default]
    User,
    /// Administrator who curates the catalogue.
    Admin,
}

impl Role {
    /// Canonical role string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(UserValidationError::UnknownRole {
                role: other.to_owned(),
            }),
        }
    }
}

/// Authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "CurrentUserDto", into = "CurrentUserDto")]
pub struct CurrentUser {
    id: UserId,
    role: Role,
}

impl CurrentUser {
    /// Build a user from validated parts.
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Fallible constructor from the provider's raw id and role strings.
    pub fn try_from_strings(
        id: impl AsRef<str>,
        role: impl AsRef<str>,
    ) -> Result<Self, UserValidationError> {
        Ok(Self::new(UserId::new(id)?, role.as_ref().parse()?))
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Role granted to the user.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the user may curate the catalogue.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentUserDto {
    id: String,
    role: String,
}

impl From<CurrentUser> for CurrentUserDto {
    fn from(value: CurrentUser) -> Self {
        Self {
            id: value.id.into(),
            role: value.role.as_str().to_owned(),
        }
    }
}

impl TryFrom<CurrentUserDto> for CurrentUser {
    type Error = UserValidationError;

    fn try_from(value: CurrentUserDto) -> Result<Self, Self::Error> {
        Self::try_from_strings(value.id, value.role)
    }
}
