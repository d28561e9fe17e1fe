//! Normalised customer email address.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why a string was rejected as an account email.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is required")]
    Empty,
    #[error("email must be at most {} characters", Email::MAX_LENGTH)]
    TooLong,
    #[error("email must look like name@domain.tld")]
    Malformed,
}

/// Account email, trimmed and lower-cased.
///
/// Accounts are unique per email, so two spellings that differ only in case
/// or surrounding whitespace must map to the same value before they reach
/// the `user.email` unique index.
///
/// ```
/// use shopfront_core::Email;
///
/// let email = Email::parse(" Shopper@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "shopper@example.com");
/// assert!(Email::parse("shopper@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Normalise and check an address.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError`] if the input is blank, too long, or not of the
    /// form `local@domain.tld` without whitespace.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong);
        }

        let (local, domain) = trimmed.split_once('@').ok_or(EmailError::Malformed)?;
        let domain_ok = domain
            .split('.')
            .all(|label| !label.is_empty())
            && domain.contains('.');
        if local.is_empty()
            || !domain_ok
            || domain.contains('@')
            || trimmed.chars().any(char::is_whitespace)
        {
            return Err(EmailError::Malformed);
        }

        Ok(Self(trimmed.to_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_signup_spellings_collapse_to_one_account() {
        let a = Email::parse("Demo@Example.com").unwrap();
        let b = Email::parse("  demo@example.COM\n").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "demo@example.com");
    }

    #[test]
    fn test_rejects_blank_and_oversized() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        let long = format!("{}@shop.example", "x".repeat(Email::MAX_LENGTH));
        assert_eq!(Email::parse(&long), Err(EmailError::TooLong));
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        for raw in [
            "shopper",
            "@example.com",
            "shopper@",
            "shopper@localhost",
            "shopper@example.",
            "shopper@.com",
            "a@b@example.com",
            "first last@example.com",
        ] {
            assert_eq!(Email::parse(raw), Err(EmailError::Malformed), "{raw}");
        }
    }

    #[test]
    fn test_request_bodies_are_validated_on_deserialize() {
        let email: Email = serde_json::from_str(r#""Buyer@Shop.IO""#).unwrap();
        assert_eq!(email.as_str(), "buyer@shop.io");
        assert_eq!(serde_json::to_string(&email).unwrap(), r#""buyer@shop.io""#);
        assert!(serde_json::from_str::<Email>(r#""not-an-email""#).is_err());
    }
}
