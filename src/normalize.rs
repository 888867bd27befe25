//! Domain normalization: IDNA ASCII transform applied once, before any network use.

use crate::errors::WhoisError;
use idna::AsciiDenyList;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A domain already in its ASCII-compatible wire form.
///
/// Only constructible through [`Domain::parse`], so a `Domain` is never encoded twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    pub fn parse(input: &str) -> Result<Self, WhoisError> {
        normalize_domain(input).map(Domain)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the domain ends with `suffix` (plain string suffix, case-insensitive).
    pub fn ends_with(&self, suffix: &str) -> bool {
        let suffix = suffix.to_ascii_lowercase();
        self.0.ends_with(&suffix)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Domain {
    type Error = WhoisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Domain::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encode a human-readable domain into its ASCII-compatible form.
///
/// Idempotent: feeding the output back in returns it unchanged.
pub fn normalize_domain(input: &str) -> Result<String, WhoisError> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);

    if trimmed.is_empty() {
        return Err(WhoisError::InvalidDomain("Empty domain".to_string()));
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(WhoisError::Encoding {
            domain: trimmed.to_string(),
            reason: "whitespace inside domain".to_string(),
        });
    }

    let ascii = idna::domain_to_ascii_cow(trimmed.as_bytes(), AsciiDenyList::URL)
        .map_err(|e| WhoisError::Encoding {
            domain: trimmed.to_string(),
            reason: e.to_string(),
        })?;

    if !ascii.contains('.') {
        return Err(WhoisError::InvalidDomain(format!("Invalid domain format: {}", ascii)));
    }

    Ok(ascii.into_owned())
}
