//! Password verification by binding as the resolved user.

use dirauth_core::{AuthError, Result};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

use crate::notify::{deliver, LoginNotifier};
use crate::session::{with_deadline, DirectoryError, DirectorySession};
use crate::strategy::AttemptState;

/// Binds as a user's DN with the supplied password and reports successful logins.
#[derive(Clone, Default)]
pub struct CredentialVerifier {
    notifier: Option<Arc<dyn LoginNotifier>>,
}

impl CredentialVerifier {
    /// Creates a verifier without a notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the notifier told about every successful login.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn LoginNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Returns true if a notifier is configured.
    #[must_use]
    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    /// Verifies `password` for `resolved_dn`.
    ///
    /// `username` is the name as supplied by the caller and only appears in the login message.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NoEntriesFound`] when there is no DN to bind as
    /// - [`AuthError::BindFailed`] when the directory rejects the bind
    /// - [`AuthError::Timeout`] when the bind exceeds `deadline`
    pub async fn verify(
        &self,
        session: &mut dyn DirectorySession,
        username: &str,
        password: &SecretString,
        resolved_dn: Option<&str>,
        deadline: Duration,
    ) -> Result<()> {
        let dn = resolved_dn
            .filter(|dn| !dn.trim().is_empty())
            .ok_or_else(|| {
                AuthError::NoEntriesFound(format!("no DN resolved for username '{username}'"))
            })?;

        with_deadline(
            deadline,
            "user bind",
            session.simple_bind(dn, password.expose_secret()),
        )
        .await
        .map_err(|err| match err {
            DirectoryError::Timeout(op) => AuthError::Timeout(op),
            other => AuthError::BindFailed(format!("{other}: bind as '{dn}' rejected")),
        })?;
        AttemptState::UserBound.trace();

        deliver(self.notifier.as_ref(), username);
        Ok(())
    }
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("notifier", &self.has_notifier())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::FnNotifier;
    use crate::session::MockDirectorySession;
    use dirauth_core::DirectoryDiagnostic;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const DEADLINE: Duration = Duration::from_secs(5);

    fn password(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn missing_dn_is_no_entries_found() {
        let mut session = MockDirectorySession::new();
        session.expect_simple_bind().never();

        let err = CredentialVerifier::new()
            .verify(&mut session, "jdoe", &password("pw"), None, DEADLINE)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NoEntriesFound(_)));
    }

    #[tokio::test]
    async fn successful_bind_notifies_with_original_username() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        let verifier = CredentialVerifier::new().with_notifier(Arc::new(FnNotifier::new(
            move |msg: &str| {
                sink.lock().unwrap().push(msg.to_string());
                Ok(())
            },
        )));

        let mut session = MockDirectorySession::new();
        session
            .expect_simple_bind()
            .withf(|dn, pw| dn == "cn=jdoe,dc=example,dc=com" && pw == "correct")
            .times(1)
            .returning(|_, _| Ok(()));

        verifier
            .verify(
                &mut session,
                "JDoe",
                &password("correct"),
                Some("cn=jdoe,dc=example,dc=com"),
                DEADLINE,
            )
            .await
            .unwrap();

        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("User 'JDoe' logged in on "));
    }

    #[tokio::test]
    async fn rejected_bind_does_not_notify() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let verifier =
            CredentialVerifier::new().with_notifier(Arc::new(FnNotifier::new(move |_: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })));

        let mut session = MockDirectorySession::new();
        session.expect_simple_bind().returning(|_, _| {
            Err(DirectoryError::Rejected(DirectoryDiagnostic::new(
                49,
                "Invalid credentials",
            )))
        });

        let err = verifier
            .verify(
                &mut session,
                "jdoe",
                &password("wrong"),
                Some("cn=jdoe,dc=example,dc=com"),
                DEADLINE,
            )
            .await
            .unwrap_err();

        match err {
            AuthError::BindFailed(msg) => {
                assert_eq!(
                    msg,
                    "49: Invalid credentials: bind as 'cn=jdoe,dc=example,dc=com' rejected"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
