//! Configuration for directory authentication.
//!
//! [`DirectoryConfig`] is the whole configuration surface of an authenticator. It is an explicit,
//! validated struct: unknown fields are rejected when deserializing and invalid values are
//! rejected by [`DirectoryConfig::validate_config`] before an authenticator can be built.

use crate::error::{AuthError, Result};
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

/// Default allow-list fragment for usernames: ASCII letters, digits and underscore.
pub const DEFAULT_ALLOWED_CHARS: &str = r"\w";
/// URL schemes understood by the LDAP connector.
pub const LDAP_SCHEMES: [&str; 3] = ["ldap", "ldaps", "ldapi"];
/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// What to do when the user search matches more than one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultipleEntriesPolicy {
    /// Use the DN of the first entry returned and ignore the rest.
    #[default]
    First,
    /// Fail the attempt with [`AuthError::AmbiguousEntries`].
    Reject,
}

/// Configuration for authenticating against one directory server.
///
/// When the service password, base DN and search attribute are all set, authentication resolves
/// the user's DN with a search bound as `dn_format` (the service account DN). Otherwise
/// `dn_format` is a template containing `%s` and the user is bound directly.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    /// Directory server URL (`ldap://`, `ldaps://` or `ldapi://`)
    #[validate(url)]
    pub server: String,

    /// Service account DN for search binds, or a `%s` DN template for direct binds
    #[validate(length(min = 1))]
    pub dn_format: String,

    /// Service account password
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub bind_password: Option<SecretString>,

    /// Base DN for the user search
    #[serde(default)]
    pub base_dn: Option<String>,

    /// Attribute compared against the sanitized username (e.g. `uid`)
    #[serde(default)]
    pub search_attribute: Option<String>,

    /// Regex character-class fragment listing the characters allowed in usernames
    #[validate(custom(function = "validate_allowed_chars"))]
    #[serde(default = "default_allowed_chars")]
    pub allowed_chars: String,

    /// Attributes requested by the user search; must include `dn`
    #[validate(custom(function = "validate_attributes"))]
    #[serde(default = "default_attributes")]
    pub attributes: Vec<String>,

    /// Handling of searches that match several entries
    #[serde(default)]
    pub multiple_entries: MultipleEntriesPolicy,

    /// Connection timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Timeout for each bind, search and close, in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

fn default_allowed_chars() -> String {
    DEFAULT_ALLOWED_CHARS.to_string()
}

fn default_attributes() -> Vec<String> {
    vec!["dn".to_string()]
}

const fn default_connection_timeout_secs() -> u64 {
    DEFAULT_CONNECTION_TIMEOUT_SECS
}

const fn default_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|value| value.map(SecretString::from))
}

/// Pattern matching one byte outside the allow-list `fragment`.
///
/// Classes are ASCII-only, so `\w` means `[0-9A-Za-z_]` and every byte of a non-ASCII
/// character is disallowed unless the fragment lists it.
#[must_use]
pub fn disallowed_pattern(fragment: &str) -> String {
    format!("(?-u:[^{fragment}])")
}

fn validate_allowed_chars(fragment: &str) -> std::result::Result<(), ValidationError> {
    if fragment.is_empty() {
        return Ok(());
    }
    Regex::new(&disallowed_pattern(fragment))
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_allowed_chars"))
}

fn validate_attributes(attributes: &[String]) -> std::result::Result<(), ValidationError> {
    if attributes.iter().any(|attr| attr.eq_ignore_ascii_case("dn")) {
        Ok(())
    } else {
        Err(ValidationError::new("attributes_missing_dn"))
    }
}

/// Borrowed view of the search-bind settings, present only when all of them are configured.
#[derive(Debug, Clone, Copy)]
pub struct SearchBindSettings<'a> {
    /// Service account DN.
    pub service_dn: &'a str,
    /// Service account password.
    pub service_password: &'a SecretString,
    /// Base DN for the user search.
    pub base_dn: &'a str,
    /// Attribute compared against the username.
    pub search_attribute: &'a str,
}

impl DirectoryConfig {
    /// Creates a configuration for direct binds against `server` using `dn_format`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or validation fails.
    pub fn new(server: impl Into<String>, dn_format: impl Into<String>) -> Result<Self> {
        let config = Self {
            server: server.into(),
            dn_format: dn_format.into(),
            bind_password: None,
            base_dn: None,
            search_attribute: None,
            allowed_chars: default_allowed_chars(),
            attributes: default_attributes(),
            multiple_entries: MultipleEntriesPolicy::default(),
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        };
        config.validate_config()?;
        Ok(config)
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigError`] for malformed JSON, unknown fields or invalid values.
    pub fn from_json(input: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|err| AuthError::ConfigError(format!("Invalid configuration: {err}")))?;
        config.validate_config()?;
        Ok(config)
    }

    /// Runs field validation and checks that the server URL parses with an LDAP scheme.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigError`] describing the first problem found.
    pub fn validate_config(&self) -> Result<()> {
        self.validate()?;
        let url = Url::parse(&self.server)?;
        if !LDAP_SCHEMES.contains(&url.scheme()) {
            return Err(AuthError::ConfigError(format!(
                "Unsupported server scheme '{}': expected one of {}",
                url.scheme(),
                LDAP_SCHEMES.join(", ")
            )));
        }
        Ok(())
    }

    /// Configures the service account used to search for user DNs.
    #[must_use]
    pub fn with_search_bind(
        mut self,
        bind_password: impl Into<String>,
        base_dn: impl Into<String>,
        search_attribute: impl Into<String>,
    ) -> Self {
        self.bind_password = Some(SecretString::from(bind_password.into()));
        self.base_dn = Some(base_dn.into());
        self.search_attribute = Some(search_attribute.into());
        self
    }

    /// Overrides the username allow-list fragment. An empty fragment disables stripping.
    #[must_use]
    pub fn with_allowed_chars(mut self, fragment: impl Into<String>) -> Self {
        self.allowed_chars = fragment.into();
        self
    }

    /// Overrides the attributes requested by the user search.
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the policy for searches that match several entries.
    #[must_use]
    pub const fn with_multiple_entries(mut self, policy: MultipleEntriesPolicy) -> Self {
        self.multiple_entries = policy;
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }

    /// Returns the search-bind settings when every one of them is present and non-empty.
    #[must_use]
    pub fn search_bind(&self) -> Option<SearchBindSettings<'_>> {
        let service_password = self
            .bind_password
            .as_ref()
            .filter(|secret| !secret.expose_secret().is_empty())?;
        let base_dn = non_empty(self.base_dn.as_deref())?;
        let search_attribute = non_empty(self.search_attribute.as_deref())?;

        Some(SearchBindSettings {
            service_dn: &self.dn_format,
            service_password,
            base_dn,
            search_attribute,
        })
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the operation timeout duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
