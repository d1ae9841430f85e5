//! End-user credentials submitted for authentication.

use secrecy::{ExposeSecret, SecretString};

use crate::error::{AuthError, Result};

/// Username/password pair supplied by the person logging in.
///
/// Both halves are untrusted. The password is kept in a [`SecretString`] so that `Debug` output
/// and accidental logging never reveal it.
#[derive(Debug)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// The username exactly as it was supplied.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password, still wrapped.
    #[must_use]
    pub const fn password(&self) -> &SecretString {
        &self.password
    }

    /// Rejects empty usernames and passwords before any directory I/O.
    ///
    /// An empty password would turn the user bind into an unauthenticated bind, which many
    /// directory servers accept.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UsernameMissing`] or [`AuthError::PasswordMissing`].
    pub fn check(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(AuthError::UsernameMissing);
        }
        if self.password.expose_secret().is_empty() {
            return Err(AuthError::PasswordMissing);
        }
        Ok(())
    }
}
