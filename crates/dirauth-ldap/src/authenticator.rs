//! The directory authenticator.

use dirauth_core::{AttemptId, AuthError, Credentials, DirectoryConfig, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::notify::LoginNotifier;
use crate::sanitize::UsernameSanitizer;
use crate::session::{
    with_deadline, DirectoryConnector, DirectoryError, DirectorySession, LdapConnector,
};
use crate::strategy::{AttemptState, BindStrategy, StrategyKind};
use crate::verifier::CredentialVerifier;

/// Outcome of a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    /// Username exactly as supplied.
    pub username: String,
    /// DN the user was bound as.
    pub dn: String,
    /// Strategy that authenticated the user.
    pub strategy: StrategyKind,
    /// Identifier of the attempt, as found in the logs.
    pub attempt_id: AttemptId,
}

/// Authenticates username/password pairs against a directory.
///
/// Each call opens its own session through the [`DirectoryConnector`], so one authenticator can
/// be shared across tasks.
pub struct DirectoryAuthenticator {
    server: String,
    connector: Box<dyn DirectoryConnector>,
    sanitizer: UsernameSanitizer,
    strategy: BindStrategy,
    verifier: CredentialVerifier,
    operation_timeout: Duration,
}

impl DirectoryAuthenticator {
    /// Creates an authenticator that uses the real LDAP connector.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigError`] if the configuration is invalid.
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        let connector = LdapConnector::new(config.server.clone(), config.connection_timeout());
        Self::with_connector(config, Box::new(connector))
    }

    /// Creates an authenticator on top of a custom connector.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigError`] if the configuration is invalid.
    pub fn with_connector(
        config: DirectoryConfig,
        connector: Box<dyn DirectoryConnector>,
    ) -> Result<Self> {
        config.validate_config()?;
        let sanitizer = UsernameSanitizer::new(&config.allowed_chars)?;
        let strategy = BindStrategy::from_config(&config)?;

        Ok(Self {
            server: config.server.clone(),
            connector,
            sanitizer,
            strategy,
            verifier: CredentialVerifier::new(),
            operation_timeout: config.operation_timeout(),
        })
    }

    /// Sets the notifier told about every successful login.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn LoginNotifier>) -> Self {
        self.verifier = self.verifier.with_notifier(notifier);
        self
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Returns the strategy chosen from the configuration.
    #[must_use]
    pub const fn strategy(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Authenticates `username` with `password`.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] describing why the attempt failed. The error carries operator
    /// diagnostics; convert it with [`AuthError::into_error_response`] before showing it to users.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<AuthenticatedUser> {
        self.authenticate_credentials(&Credentials::new(username, password))
            .await
    }

    /// Authenticates a prepared [`Credentials`] value under a fresh [`AttemptId`].
    ///
    /// # Errors
    ///
    /// See [`DirectoryAuthenticator::authenticate`].
    pub async fn authenticate_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthenticatedUser> {
        self.authenticate_with_id(credentials, AttemptId::new_v4())
            .await
    }

    /// Authenticates under a caller-chosen [`AttemptId`].
    ///
    /// Every event of the attempt is emitted inside a span carrying `attempt_id`. Callers that
    /// need the id on the failure path keep their copy and pass it to
    /// [`AuthError::into_error_response_with_id`].
    ///
    /// # Errors
    ///
    /// See [`DirectoryAuthenticator::authenticate`].
    #[instrument(
        name = "authenticate",
        skip(self, credentials, attempt_id),
        fields(username = %credentials.username(), attempt_id = %attempt_id)
    )]
    pub async fn authenticate_with_id(
        &self,
        credentials: &Credentials,
        attempt_id: AttemptId,
    ) -> Result<AuthenticatedUser> {
        let outcome = self.attempt(credentials).await;
        match outcome {
            Ok(dn) => {
                AttemptState::Success.trace();
                info!(dn = %dn, "user authenticated");
                Ok(AuthenticatedUser {
                    username: credentials.username().to_string(),
                    dn,
                    strategy: self.strategy.kind(),
                    attempt_id,
                })
            }
            Err(err) => {
                AttemptState::Failed.trace();
                if err.should_log() {
                    warn!(code = err.error_code(), "authentication failed: {err}");
                } else {
                    debug!(code = err.error_code(), "authentication failed: {err}");
                }
                Err(err)
            }
        }
    }

    async fn attempt(&self, credentials: &Credentials) -> Result<String> {
        credentials.check()?;
        let login = self
            .strategy
            .prepare_username(&self.sanitizer, credentials.username());
        if login.is_empty() {
            return Err(AuthError::UsernameMissing);
        }

        let mut session = self.connect().await?;
        let outcome = self
            .strategy
            .run(
                &mut *session,
                &self.verifier,
                credentials,
                &login,
                self.operation_timeout,
            )
            .await;
        self.close(&mut *session).await;
        outcome
    }

    async fn connect(&self) -> Result<Box<dyn DirectorySession>> {
        with_deadline(self.operation_timeout, "connect", self.connector.connect())
            .await
            .map_err(|err| match err {
                DirectoryError::Timeout(op) => AuthError::Timeout(op),
                other => AuthError::ConnectionFailed(format!("{}: {other}", self.server)),
            })
    }

    async fn close(&self, session: &mut dyn DirectorySession) {
        if let Err(err) = with_deadline(self.operation_timeout, "close", session.close()).await {
            warn!("failed to close directory session: {err}");
        }
    }
}

impl std::fmt::Debug for DirectoryAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryAuthenticator")
            .field("server", &self.server)
            .field("strategy", &self.strategy)
            .field("verifier", &self.verifier)
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}
