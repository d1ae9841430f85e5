//! Username sanitization for search filters.
//!
//! Usernames are ASCII lower-cased and every byte outside a configurable allow-list is removed.
//! The allow-list is a regex character-class fragment (`\w` by default) matched in ASCII mode:
//! `\w` is `[0-9A-Za-z_]`, so accented letters are stripped rather than kept. This is coarser
//! than RFC 4515 escaping, so the filter builder escapes the sanitized value as well.

use dirauth_core::config::{disallowed_pattern, DEFAULT_ALLOWED_CHARS};
use dirauth_core::Result;
use regex::bytes::Regex;

/// Strips characters outside an allow-list from untrusted usernames.
#[derive(Debug, Clone)]
pub struct UsernameSanitizer {
    disallowed: Option<Regex>,
}

impl UsernameSanitizer {
    /// Builds a sanitizer from an allow-list fragment such as `\w` or `a-z0-9._-`.
    ///
    /// An empty fragment disables stripping.
    ///
    /// # Errors
    ///
    /// Returns [`dirauth_core::AuthError::ConfigError`] if `[^fragment]` is not a valid regex.
    pub fn new(allowed: &str) -> Result<Self> {
        let disallowed = if allowed.is_empty() {
            None
        } else {
            Some(Regex::new(&disallowed_pattern(allowed))?)
        };
        Ok(Self { disallowed })
    }

    /// ASCII lower-cases `input` and removes every character outside the allow-list.
    #[must_use]
    pub fn sanitize(&self, input: &str) -> String {
        self.strip(&input.to_ascii_lowercase())
    }

    /// Removes every character outside the allow-list, keeping case.
    #[must_use]
    pub fn strip(&self, input: &str) -> String {
        match &self.disallowed {
            Some(regex) => {
                String::from_utf8_lossy(&regex.replace_all(input.as_bytes(), &b""[..])).into_owned()
            }
            None => input.to_string(),
        }
    }

    /// Returns true if `value` contains only allowed characters.
    #[must_use]
    pub fn is_clean(&self, value: &str) -> bool {
        self.disallowed
            .as_ref()
            .map_or(true, |regex| !regex.is_match(value.as_bytes()))
    }
}

impl Default for UsernameSanitizer {
    fn default() -> Self {
        Self {
            disallowed: Regex::new(&disallowed_pattern(DEFAULT_ALLOWED_CHARS)).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_wildcard() {
        let sanitizer = UsernameSanitizer::default();
        assert_eq!(sanitizer.sanitize("Jo*Hn"), "john");
    }

    #[test]
    fn strips_filter_metacharacters() {
        let sanitizer = UsernameSanitizer::default();
        let sanitized = sanitizer.sanitize("admin)(|(uid=*))\\00");
        assert_eq!(sanitized, "adminuid00");
        assert!(sanitizer.is_clean(&sanitized));
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let sanitizer = UsernameSanitizer::new("a-z0-9._-").unwrap();
        for input in ["J.Doe", "x*(y)z", "ÅSA-1", "  spaced out  ", "", "___"] {
            let once = sanitizer.sanitize(input);
            assert_eq!(sanitizer.sanitize(&once), once, "input {input:?}");
            assert!(sanitizer.is_clean(&once));
        }
    }

    #[test]
    fn custom_allow_list_keeps_listed_characters() {
        let sanitizer = UsernameSanitizer::new(r"\w.@-").unwrap();
        assert_eq!(sanitizer.sanitize("J.Doe@Example.com"), "j.doe@example.com");
    }

    #[test]
    fn strip_keeps_case() {
        let sanitizer = UsernameSanitizer::default();
        assert_eq!(sanitizer.strip("Jo*Hn"), "JoHn");
    }

    #[test]
    fn empty_allow_list_disables_stripping() {
        let sanitizer = UsernameSanitizer::new("").unwrap();
        assert_eq!(sanitizer.sanitize("Jo*Hn"), "jo*hn");
        assert!(sanitizer.is_clean("*"));
    }

    #[test]
    fn word_class_is_ascii_only() {
        let sanitizer = UsernameSanitizer::default();
        assert_eq!(sanitizer.sanitize("Jösé"), "js");
        assert_eq!(sanitizer.sanitize("İx"), "x");
        assert_eq!(sanitizer.strip("Zoë_9"), "Zo_9");
        assert!(!sanitizer.is_clean("é"));
    }

    #[test]
    fn invalid_allow_list_is_rejected() {
        assert!(UsernameSanitizer::new(r"\w[").is_err());
    }
}
