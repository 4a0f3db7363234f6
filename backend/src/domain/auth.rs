//! Account primitives such as sign-up credentials.
//!
//! Input is validated here, before any identity provider call, so malformed
//! e-mail addresses and short passwords never leave the domain.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use zeroize::Zeroizing;

/// Minimum accepted password length, in characters.
pub const PASSWORD_MIN_CHARS: usize = 6;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Domain error returned when sign-up values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupValidationError {
    /// E-mail was blank or not shaped like `local@domain.tld`.
    InvalidEmail,
    /// Password was shorter than [`PASSWORD_MIN_CHARS`].
    PasswordTooShort { min: usize },
}

impl fmt::Display for SignupValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail => write!(f, "a valid e-mail address is required"),
            Self::PasswordTooShort { min } => {
                write!(f, "password must be at least {min} characters")
            }
        }
    }
}

impl std::error::Error for SignupValidationError {}

/// Validated sign-up credentials passed to the identity provider.
///
/// ## Invariants
/// - `email` is trimmed and matches `^[^\s@]+@[^\s@]+\.[^\s@]+$`.
/// - `password` has at least [`PASSWORD_MIN_CHARS`] characters and keeps any
///   whitespace the caller supplied.
///
/// # Examples
/// ```
/// use lending::domain::SignupCredentials;
///
/// let creds = SignupCredentials::try_from_parts(" reader@example.org ", "hunter22").unwrap();
/// assert_eq!(creds.email(), "reader@example.org");
/// assert!(SignupCredentials::try_from_parts("reader", "hunter22").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl SignupCredentials {
    /// Construct credentials from raw e-mail/password inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, SignupValidationError> {
        let normalized = email.trim();
        if !email_regex().is_match(normalized) {
            return Err(SignupValidationError::InvalidEmail);
        }

        if password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(SignupValidationError::PasswordTooShort {
                min: PASSWORD_MIN_CHARS,
            });
        }

        Ok(Self {
            email: normalized.to_owned(),
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised e-mail address.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}
