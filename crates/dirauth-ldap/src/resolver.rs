//! DN resolution through a service-account search.

use dirauth_core::{AuthError, MultipleEntriesPolicy, Result, SearchBindSettings};
use ldap3::ldap_escape;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

use crate::session::{with_deadline, DirectoryError, DirectorySession};
use crate::strategy::AttemptState;

/// Finds a user's DN by binding as the service account and searching for the sanitized username.
#[derive(Debug)]
pub struct DnResolver {
    service_dn: String,
    service_password: SecretString,
    base_dn: String,
    search_attribute: String,
    attributes: Vec<String>,
    policy: MultipleEntriesPolicy,
}

impl DnResolver {
    /// Creates a resolver from the configured search-bind settings.
    #[must_use]
    pub fn new(
        settings: SearchBindSettings<'_>,
        attributes: Vec<String>,
        policy: MultipleEntriesPolicy,
    ) -> Self {
        Self {
            service_dn: settings.service_dn.to_string(),
            service_password: SecretString::from(
                settings.service_password.expose_secret().to_string(),
            ),
            base_dn: settings.base_dn.trim().to_string(),
            search_attribute: settings.search_attribute.trim().to_string(),
            attributes,
            policy,
        }
    }

    /// Builds `(<attribute>=<value>)`, escaping the value for filter syntax.
    #[must_use]
    pub fn search_filter(&self, sanitized_username: &str) -> String {
        format!(
            "({}={})",
            self.search_attribute,
            ldap_escape(sanitized_username)
        )
    }

    /// Resolves the DN for an already sanitized username.
    ///
    /// # Errors
    ///
    /// - [`AuthError::BindFailed`] if the service bind is rejected
    /// - [`AuthError::SearchFailed`] if the search call fails
    /// - [`AuthError::NoEntriesFound`] if nothing with a DN matches
    /// - [`AuthError::AmbiguousEntries`] for several matches under [`MultipleEntriesPolicy::Reject`]
    /// - [`AuthError::Timeout`] if either call exceeds `deadline`
    pub async fn resolve(
        &self,
        session: &mut dyn DirectorySession,
        sanitized_username: &str,
        deadline: Duration,
    ) -> Result<String> {
        with_deadline(
            deadline,
            "service bind",
            session.simple_bind(&self.service_dn, self.service_password.expose_secret()),
        )
        .await
        .map_err(|err| match err {
            DirectoryError::Timeout(op) => AuthError::Timeout(op),
            other => AuthError::BindFailed(format!(
                "{other}: service bind as '{}' rejected",
                self.service_dn
            )),
        })?;
        AttemptState::ServiceBound.trace();

        let filter = self.search_filter(sanitized_username);
        let entries = with_deadline(
            deadline,
            "user search",
            session.search(&self.base_dn, &filter, &self.attributes),
        )
        .await
        .map_err(|err| match err {
            DirectoryError::Timeout(op) => AuthError::Timeout(op),
            other => AuthError::SearchFailed(format!(
                "{other}: search with base_dn '{}' and service dn '{}'",
                self.base_dn, self.service_dn
            )),
        })?;
        AttemptState::Searched.trace();
        debug!(filter = %filter, matches = entries.len(), "user search finished");

        if entries.len() > 1 && self.policy == MultipleEntriesPolicy::Reject {
            return Err(AuthError::AmbiguousEntries(format!(
                "{} entries under '{}' match filter {filter}",
                entries.len(),
                self.base_dn
            )));
        }

        let count = entries.len();
        let dn = match entries.into_iter().next() {
            Some(entry) if !entry.dn.trim().is_empty() => entry.dn,
            Some(_) => {
                return Err(AuthError::NoEntriesFound(format!(
                    "{count} entries under '{}' for filter {filter}, first entry has a blank DN",
                    self.base_dn
                )))
            }
            None => {
                return Err(AuthError::NoEntriesFound(format!(
                    "0 entries under '{}' for filter {filter}",
                    self.base_dn
                )))
            }
        };
        AttemptState::DnResolved.trace();
        Ok(dn)
    }
}
