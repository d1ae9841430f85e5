//! Directory session seam and its `ldap3` implementation.
//!
//! The authenticator only talks to the directory through [`DirectoryConnector`] and
//! [`DirectorySession`]. Each authentication attempt opens one session, uses it for every bind and
//! search of that attempt, and closes it.

use async_trait::async_trait;
use dirauth_core::DirectoryDiagnostic;
use ldap3::{LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::error;

/// Failure reported by a directory session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The server answered with a non-success result code.
    #[error("{0}")]
    Rejected(DirectoryDiagnostic),
    /// The named operation did not complete before its deadline.
    #[error("{0} timed out")]
    Timeout(String),
    /// The connection could not be used (I/O, protocol or TLS failure).
    #[error("transport error: {0}")]
    Transport(String),
}

/// Entry returned by a directory search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (values preserved order from server).
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Creates an entry with a DN and no attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }
}

/// One open connection to the directory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectorySession: Send {
    /// Binds the connection as `dn`.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    /// Runs a subtree search under `base_dn`.
    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    /// Unbinds and releases the connection.
    async fn close(&mut self) -> Result<(), DirectoryError>;
}

/// Opens directory sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Opens a fresh session; sessions are never shared between attempts.
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError>;
}

/// Runs a directory call with a deadline, reporting `operation` on timeout.
pub(crate) async fn with_deadline<F, T>(
    limit: Duration,
    operation: &str,
    fut: F,
) -> Result<T, DirectoryError>
where
    F: Future<Output = Result<T, DirectoryError>>,
{
    timeout(limit, fut)
        .await
        .map_err(|_| DirectoryError::Timeout(operation.to_string()))?
}

/// Real LDAP connector backed by `ldap3`.
pub struct LdapConnector {
    server: String,
    connection_timeout: Duration,
}

impl LdapConnector {
    /// Creates a connector for `server` (an `ldap://` or `ldaps://` URL).
    #[must_use]
    pub fn new(server: impl Into<String>, connection_timeout: Duration) -> Self {
        Self {
            server: server.into(),
            connection_timeout,
        }
    }
}

#[async_trait]
impl DirectoryConnector for LdapConnector {
    async fn connect(&self) -> Result<Box<dyn DirectorySession>, DirectoryError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.connection_timeout);
        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.server)
            .await
            .map_err(map_ldap_error)?;

        tokio::spawn(async move {
            if let Err(err) = conn.drive().await {
                error!("LDAP connection driver error: {err}");
            }
        });

        Ok(Box::new(LdapSession { inner: ldap }))
    }
}

struct LdapSession {
    inner: ldap3::Ldap,
}

#[async_trait]
impl DirectorySession for LdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        self.inner
            .simple_bind(dn, password)
            .await
            .map_err(map_ldap_error)?
            .success()
            .map_err(map_ldap_error)?;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let (entries, _) = self
            .inner
            .search(base_dn, Scope::Subtree, filter, attributes.to_vec())
            .await
            .map_err(map_ldap_error)?
            .success()
            .map_err(map_ldap_error)?;

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn close(&mut self) -> Result<(), DirectoryError> {
        self.inner.unbind().await.map_err(map_ldap_error)
    }
}

fn map_ldap_error(err: LdapError) -> DirectoryError {
    match err {
        LdapError::LdapResult { result } => {
            DirectoryError::Rejected(DirectoryDiagnostic::new(result.rc, result.text))
        }
        other => DirectoryError::Transport(other.to_string()),
    }
}
