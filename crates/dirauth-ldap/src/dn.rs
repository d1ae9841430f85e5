//! DN templates for direct binds.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use dirauth_core::AuthError;

const PLACEHOLDER: &str = "%s";

/// Errors that can occur when parsing a DN template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnTemplateError {
    /// The template was empty.
    #[error("DN template cannot be empty")]
    Empty,
    /// The template had no `%s` placeholder.
    #[error("DN template `{0}` has no %s placeholder")]
    MissingPlaceholder(String),
    /// The template had more than one `%s` placeholder.
    #[error("DN template `{0}` has more than one %s placeholder")]
    RepeatedPlaceholder(String),
}

impl From<DnTemplateError> for AuthError {
    fn from(err: DnTemplateError) -> Self {
        AuthError::ConfigError(err.to_string())
    }
}

/// A DN with a single `%s` placeholder for the username, e.g. `uid=%s,ou=people,dc=example,dc=com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnTemplate {
    prefix: String,
    suffix: String,
}

impl DnTemplate {
    /// Parses a template.
    ///
    /// # Errors
    ///
    /// Returns [`DnTemplateError`] unless the template contains exactly one `%s`.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, DnTemplateError> {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            return Err(DnTemplateError::Empty);
        }

        let (prefix, suffix) = raw
            .split_once(PLACEHOLDER)
            .ok_or_else(|| DnTemplateError::MissingPlaceholder(raw.to_string()))?;
        if suffix.contains(PLACEHOLDER) {
            return Err(DnTemplateError::RepeatedPlaceholder(raw.to_string()));
        }

        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Substitutes `value`, escaped as an RDN attribute value, into the template.
    #[must_use]
    pub fn render(&self, value: &str) -> String {
        format!("{}{}{}", self.prefix, escape_value(value), self.suffix)
    }
}

impl fmt::Display for DnTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PLACEHOLDER}{}", self.prefix, self.suffix)
    }
}

impl FromStr for DnTemplate {
    type Err = DnTemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Escapes an attribute value for use inside a DN (RFC 4514 special characters).
#[must_use]
pub fn escape_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in chars.iter().enumerate() {
        let is_first = idx == 0;
        let is_last = idx == chars.len() - 1;
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (is_first && (*ch == ' ' || *ch == '#'))
            || (is_last && *ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(*ch);
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_username() {
        let template = DnTemplate::parse("uid=%s,ou=people,dc=example,dc=com").unwrap();
        assert_eq!(
            template.render("jdoe"),
            "uid=jdoe,ou=people,dc=example,dc=com"
        );
        assert_eq!(template.to_string(), "uid=%s,ou=people,dc=example,dc=com");
    }

    #[test]
    fn render_escapes_dn_specials() {
        let template: DnTemplate = "cn=%s,dc=example,dc=com".parse().unwrap();
        assert_eq!(
            template.render("Smith, John"),
            "cn=Smith\\, John,dc=example,dc=com"
        );
        assert_eq!(template.render("#x "), "cn=\\#x\\ ,dc=example,dc=com");
    }

    #[test]
    fn placeholder_is_required_once() {
        assert_eq!(DnTemplate::parse("  "), Err(DnTemplateError::Empty));
        assert!(matches!(
            DnTemplate::parse("cn=svc,dc=example,dc=com"),
            Err(DnTemplateError::MissingPlaceholder(_))
        ));
        assert!(matches!(
            DnTemplate::parse("uid=%s,ou=%s"),
            Err(DnTemplateError::RepeatedPlaceholder(_))
        ));
    }

    #[test]
    fn converts_into_config_error() {
        let err: AuthError = DnTemplateError::Empty.into();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }
}
