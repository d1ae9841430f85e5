//! Error types for directory authentication.
//!
//! Every failure of an authentication attempt is terminal for that attempt. The variants carry
//! operator-facing diagnostics (directory result codes, base DN, filter) but never the end-user
//! password. Use [`AuthError::into_error_response`] for anything that leaves the server.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Result code and message reported by the directory for a failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryDiagnostic {
    /// LDAP result code (`49` is invalid credentials, `32` no such object, ...).
    pub code: u32,
    /// Diagnostic text returned by the server, may be empty.
    pub message: String,
}

impl DirectoryDiagnostic {
    /// Creates a diagnostic from a result code and message.
    #[must_use]
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for DirectoryDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Main error type for authentication attempts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    /// The service bind or the user bind was rejected.
    #[error("Bind failed: {0}")]
    BindFailed(String),

    /// The directory search call itself failed.
    #[error("Search failed: {0}")]
    SearchFailed(String),

    /// The search succeeded but produced no usable DN.
    #[error("No entries found: {0}")]
    NoEntriesFound(String),

    /// More than one entry matched while duplicates are rejected.
    #[error("Ambiguous entries: {0}")]
    AmbiguousEntries(String),

    /// A directory call exceeded its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// No connection to the directory could be opened.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The username was empty, before or after sanitization.
    #[error("Username missing")]
    UsernameMissing,

    /// The password was empty.
    #[error("Password missing")]
    PasswordMissing,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Specialized result type for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Structured error response for serialization.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
    /// Optional attempt ID for correlating with server-side logs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<String>,
}

/// Error detail structure.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorDetail {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable message safe to show to end users
    pub message: String,
}

impl AuthError {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BindFailed(_) => "BIND_FAILED",
            Self::SearchFailed(_) => "SEARCH_FAILED",
            Self::NoEntriesFound(_) => "NO_ENTRIES_FOUND",
            Self::AmbiguousEntries(_) => "AMBIGUOUS_ENTRIES",
            Self::Timeout(_) => "TIMEOUT",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::UsernameMissing => "USERNAME_MISSING",
            Self::PasswordMissing => "PASSWORD_MISSING",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Message that can be shown to the person who tried to log in.
    ///
    /// Directory failures collapse into one generic message so that callers cannot tell an
    /// unknown account from a wrong password, and no diagnostics leak.
    #[must_use]
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::UsernameMissing => "username is required",
            Self::PasswordMissing => "password is required",
            Self::Timeout(_) | Self::ConnectionFailed(_) => {
                "authentication service unavailable"
            }
            Self::ConfigError(_) => "authentication is misconfigured",
            Self::BindFailed(_)
            | Self::SearchFailed(_)
            | Self::NoEntriesFound(_)
            | Self::AmbiguousEntries(_) => "authentication failed",
        }
    }

    /// Converts the error into an `ErrorResponse`.
    #[must_use]
    pub fn into_error_response(self) -> ErrorResponse {
        self.into_error_response_with_id(None)
    }

    /// Converts the error into an `ErrorResponse` with an attempt ID.
    #[must_use]
    pub fn into_error_response_with_id(self, attempt_id: Option<String>) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.public_message().to_string(),
            },
            attempt_id,
        }
    }

    /// Returns true if this error points at the deployment rather than at the user's input.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_)
                | Self::ConnectionFailed(_)
                | Self::SearchFailed(_)
                | Self::AmbiguousEntries(_)
                | Self::Timeout(_)
        )
    }
}

impl From<url::ParseError> for AuthError {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid directory URL: {err}"))
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<regex::Error> for AuthError {
    fn from(err: regex::Error) -> Self {
        Self::ConfigError(format!("invalid username allow-list: {err}"))
    }
}
