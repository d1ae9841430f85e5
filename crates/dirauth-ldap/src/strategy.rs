//! Bind strategies.
//!
//! A [`BindStrategy`] is chosen once, from the configuration, when the authenticator is built:
//! [`SearchThenBindStrategy`] when the service-account settings are complete, otherwise
//! [`GenericBindStrategy`].

use dirauth_core::{AuthError, Credentials, DirectoryConfig, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::dn::DnTemplate;
use crate::resolver::DnResolver;
use crate::sanitize::UsernameSanitizer;
use crate::session::DirectorySession;
use crate::verifier::CredentialVerifier;

/// Progress of one authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Nothing sent to the directory yet.
    Start,
    /// Bound as the service account.
    ServiceBound,
    /// User search completed.
    Searched,
    /// The user's DN is known.
    DnResolved,
    /// Bound as the user.
    UserBound,
    /// Attempt succeeded.
    Success,
    /// Attempt failed.
    Failed,
}

impl AttemptState {
    /// Name of the state as it appears in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::ServiceBound => "SERVICE_BOUND",
            Self::Searched => "SEARCHED",
            Self::DnResolved => "DN_RESOLVED",
            Self::UserBound => "USER_BOUND",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }

    pub(crate) fn trace(self) {
        debug!(state = self.as_str(), "authentication state");
    }
}

/// Which strategy authenticated a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Direct bind as the DN template filled with the username.
    GenericBind,
    /// Service-account search for the DN, then bind as that DN.
    SearchThenBind,
}

/// Binds directly as a DN built from a template.
#[derive(Debug, Clone)]
pub struct GenericBindStrategy {
    template: DnTemplate,
}

impl GenericBindStrategy {
    /// Creates the strategy from a `%s` DN template.
    #[must_use]
    pub const fn new(template: DnTemplate) -> Self {
        Self { template }
    }

    /// DN that a prepared login binds as.
    #[must_use]
    pub fn user_dn(&self, login: &str) -> String {
        self.template.render(login)
    }
}

/// Resolves the DN with a service-account search, then binds as it.
#[derive(Debug)]
pub struct SearchThenBindStrategy {
    resolver: DnResolver,
}

impl SearchThenBindStrategy {
    /// Creates the strategy around a resolver.
    #[must_use]
    pub const fn new(resolver: DnResolver) -> Self {
        Self { resolver }
    }

    /// Returns the resolver.
    #[must_use]
    pub const fn resolver(&self) -> &DnResolver {
        &self.resolver
    }
}

/// Strategy selected from configuration.
#[derive(Debug)]
pub enum BindStrategy {
    /// Direct bind.
    Generic(GenericBindStrategy),
    /// Search, then bind.
    SearchThenBind(SearchThenBindStrategy),
}

impl BindStrategy {
    /// Selects the strategy for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigError`] when the generic strategy is selected and `dn_format` is
    /// not a template with exactly one `%s`.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self> {
        match config.search_bind() {
            Some(settings) => Ok(Self::SearchThenBind(SearchThenBindStrategy::new(
                DnResolver::new(settings, config.attributes.clone(), config.multiple_entries),
            ))),
            None => Ok(Self::Generic(GenericBindStrategy::new(DnTemplate::parse(
                &config.dn_format,
            )?))),
        }
    }

    /// Returns the kind of this strategy.
    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::Generic(_) => StrategyKind::GenericBind,
            Self::SearchThenBind(_) => StrategyKind::SearchThenBind,
        }
    }

    /// The username as it is used to reach the directory: lower-cased and stripped for searches,
    /// stripped only for direct binds.
    #[must_use]
    pub fn prepare_username(&self, sanitizer: &UsernameSanitizer, username: &str) -> String {
        match self {
            Self::Generic(_) => sanitizer.strip(username),
            Self::SearchThenBind(_) => sanitizer.sanitize(username),
        }
    }

    /// Runs the strategy on an open session and returns the DN that was bound.
    ///
    /// `login` must come from [`BindStrategy::prepare_username`].
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] produced by DN resolution or the user bind.
    pub async fn run(
        &self,
        session: &mut dyn DirectorySession,
        verifier: &CredentialVerifier,
        credentials: &Credentials,
        login: &str,
        deadline: Duration,
    ) -> Result<String> {
        AttemptState::Start.trace();
        let dn = match self {
            Self::Generic(strategy) => strategy.user_dn(login),
            Self::SearchThenBind(strategy) => {
                strategy.resolver.resolve(session, login, deadline).await?
            }
        };

        verifier
            .verify(
                session,
                credentials.username(),
                credentials.password(),
                Some(&dn),
                deadline,
            )
            .await?;
        Ok(dn)
    }
}

impl TryFrom<&DirectoryConfig> for BindStrategy {
    type Error = AuthError;

    fn try_from(config: &DirectoryConfig) -> Result<Self> {
        Self::from_config(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MockDirectorySession;

    const DEADLINE: Duration = Duration::from_secs(5);

    #[test]
    fn selects_search_then_bind_when_complete() {
        let config = DirectoryConfig::new("ldap://ldap.example.com", "cn=svc,dc=example,dc=com")
            .unwrap()
            .with_search_bind("svc-secret", "dc=example,dc=com", "uid");
        let strategy = BindStrategy::from_config(&config).unwrap();
        assert_eq!(strategy.kind(), StrategyKind::SearchThenBind);
    }

    #[test]
    fn falls_back_to_generic_bind() {
        let config =
            DirectoryConfig::new("ldap://ldap.example.com", "uid=%s,dc=example,dc=com").unwrap();
        let strategy = BindStrategy::try_from(&config).unwrap();
        assert_eq!(strategy.kind(), StrategyKind::GenericBind);
    }

    #[test]
    fn generic_bind_needs_placeholder() {
        let config = DirectoryConfig::new("ldap://ldap.example.com", "cn=svc,dc=example,dc=com")
            .unwrap()
            .with_search_bind("", "dc=example,dc=com", "uid");
        let err = BindStrategy::from_config(&config).unwrap_err();
        assert!(matches!(err, AuthError::ConfigError(_)));
    }

    #[test]
    fn prepare_username_depends_on_strategy() {
        let sanitizer = UsernameSanitizer::default();
        let generic = BindStrategy::Generic(GenericBindStrategy::new(
            DnTemplate::parse("uid=%s,dc=example,dc=com").unwrap(),
        ));
        assert_eq!(generic.prepare_username(&sanitizer, "Jo*Hn"), "JoHn");

        let config = DirectoryConfig::new("ldap://ldap.example.com", "cn=svc,dc=example,dc=com")
            .unwrap()
            .with_search_bind("svc-secret", "dc=example,dc=com", "uid");
        let search = BindStrategy::from_config(&config).unwrap();
        assert_eq!(search.prepare_username(&sanitizer, "Jo*Hn"), "john");
    }

    #[test]
    fn generic_user_dn() {
        let strategy =
            GenericBindStrategy::new(DnTemplate::parse("uid=%s,dc=example,dc=com").unwrap());
        assert_eq!(strategy.user_dn("jdoe"), "uid=jdoe,dc=example,dc=com");
        assert_eq!(strategy.user_dn("Doe,J"), "uid=Doe\\,J,dc=example,dc=com");
    }

    #[tokio::test]
    async fn generic_run_binds_without_search() {
        let strategy = BindStrategy::Generic(GenericBindStrategy::new(
            DnTemplate::parse("uid=%s,dc=example,dc=com").unwrap(),
        ));
        let mut session = MockDirectorySession::new();
        session
            .expect_simple_bind()
            .withf(|dn, pw| dn == "uid=jdoe,dc=example,dc=com" && pw == "pw")
            .times(1)
            .returning(|_, _| Ok(()));
        session.expect_search().never();

        let dn = strategy
            .run(
                &mut session,
                &CredentialVerifier::new(),
                &Credentials::new("jdoe", "pw"),
                "jdoe",
                DEADLINE,
            )
            .await
            .unwrap();
        assert_eq!(dn, "uid=jdoe,dc=example,dc=com");
    }

    #[test]
    fn state_names() {
        assert_eq!(AttemptState::ServiceBound.as_str(), "SERVICE_BOUND");
        assert_eq!(AttemptState::Failed.as_str(), "FAILED");
    }
}
