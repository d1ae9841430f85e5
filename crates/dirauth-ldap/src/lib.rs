//! LDAP search-then-bind authentication.
//!
//! [`DirectoryAuthenticator`] verifies a username/password pair by binding as a service account,
//! searching for the user's DN and binding again as that DN. When the service account is not
//! configured it falls back to a direct bind against a `%s` DN template.
//!
//! ```no_run
//! # async fn run() -> dirauth_core::Result<()> {
//! use dirauth_core::DirectoryConfig;
//! use dirauth_ldap::DirectoryAuthenticator;
//!
//! let config = DirectoryConfig::new("ldaps://ldap.example.com", "cn=svc,dc=example,dc=com")?
//!     .with_search_bind("service-password", "ou=people,dc=example,dc=com", "uid");
//! let authenticator = DirectoryAuthenticator::new(config)?;
//! let user = authenticator.authenticate("jdoe", "user-password").await?;
//! println!("{} bound as {}", user.username, user.dn);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod authenticator;
mod dn;
mod notify;
mod resolver;
mod sanitize;
mod session;
mod strategy;
mod verifier;

pub use authenticator::{AuthenticatedUser, DirectoryAuthenticator};
pub use dn::{escape_value, DnTemplate, DnTemplateError};
pub use notify::{format_login_time, login_message, FnNotifier, LoginNotifier, TracingNotifier};
pub use resolver::DnResolver;
pub use sanitize::UsernameSanitizer;
pub use session::{DirectoryConnector, DirectoryEntry, DirectoryError, DirectorySession, LdapConnector};
pub use strategy::{
    AttemptState, BindStrategy, GenericBindStrategy, SearchThenBindStrategy, StrategyKind,
};
pub use verifier::CredentialVerifier;

/// Convenient result alias that reuses the core error type.
pub type Result<T> = dirauth_core::Result<T>;
