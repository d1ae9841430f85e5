//! # dirauth-core
//!
//! Core types for authenticating users against an LDAP directory.
//!
//! ## Modules
//!
//! - [`error`] - Authentication error taxonomy and user-safe error responses
//! - [`config`] - Validated directory configuration
//! - [`credentials`] - End-user credentials with a redacted password
//! - [`attempt`] - Per-attempt identifiers for log correlation

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attempt;
pub mod config;
pub mod credentials;
pub mod error;

// Re-export commonly used types
pub use attempt::AttemptId;
pub use config::{DirectoryConfig, MultipleEntriesPolicy, SearchBindSettings};
pub use credentials::Credentials;
pub use error::{AuthError, DirectoryDiagnostic, ErrorResponse, Result};
