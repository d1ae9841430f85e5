//! Identifiers for individual authentication attempts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AuthError, Result};

/// Random identifier carried by the tracing span of one attempt and returned on success; callers
/// that pre-allocate it can attach it to error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// Creates a new random attempt ID (v4).
    #[must_use]
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner [`Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parses an attempt ID from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID.
    pub fn parse_str(input: &str) -> Result<Self> {
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|_| AuthError::ConfigError(format!("invalid attempt id `{input}`")))
    }
}

impl From<Uuid> for AttemptId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for AttemptId {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_UUID: &str = "550e8400-e29b-41d4-a716-446655440000";

    #[test]
    fn new_v4_is_random_v4() {
        let first = AttemptId::new_v4();
        let second = AttemptId::new_v4();
        assert_eq!(first.as_uuid().get_version_num(), 4);
        assert_ne!(first, second);
    }

    #[test]
    fn parse_round_trips_display() {
        let id: AttemptId = VALID_UUID.parse().unwrap();
        assert_eq!(id.to_string(), VALID_UUID);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            AttemptId::parse_str("not-a-uuid"),
            Err(AuthError::ConfigError(_))
        ));
    }
}
