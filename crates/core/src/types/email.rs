//! Email address type.
//!
//! Sign-up and sign-in go through the hosted auth service, which performs
//! its own validation; this type only rejects obviously malformed input
//! before a round-trip is wasted on it. Input is trimmed, since mobile
//! keyboards love trailing whitespace.

use core::fmt;

use serde::{Deserialize, Serialize};

/// RFC 5321 upper bound on address length.
const MAX_LENGTH: usize = 254;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is empty")]
    Empty,
    #[error("email exceeds {MAX_LENGTH} characters")]
    TooLong,
    #[error("email is missing an @ or a part around it")]
    Malformed,
}

/// A structurally plausible email address: non-empty local part, `@`,
/// non-empty domain.
///
/// ```
/// use mercato_core::Email;
///
/// assert!(Email::parse("buyer@example.com").is_ok());
/// assert!(Email::parse("no-at-symbol").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Parse an address, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError`] for empty, over-long, or structurally
    /// malformed input.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Err(EmailError::Empty);
        }
        if trimmed.len() > MAX_LENGTH {
            return Err(EmailError::TooLong);
        }

        match trimmed.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Self(trimmed.to_owned()))
            }
            _ => Err(EmailError::Malformed),
        }
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

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
