//! Repository name domain model
//!
//! Registry repository names follow the ECR naming rules: lowercase
//! path components separated by `/`, each made of alphanumerics joined
//! by single `.`, `_` or `-`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Shortest name the registry accepts
pub const MIN_LENGTH: usize = 2;

/// Longest name the registry accepts
pub const MAX_LENGTH: usize = 256;

static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9]+(?:[._-][a-z0-9]+)*/)*[a-z0-9]+(?:[._-][a-z0-9]+)*$")
        .expect("repository name pattern compiles")
});

/// Reasons a declared repository name is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRepositoryName {
    #[error("repository name is empty")]
    Empty,

    #[error("repository name '{0}' is shorter than {MIN_LENGTH} characters")]
    TooShort(String),

    #[error("repository name is longer than {MAX_LENGTH} characters ({0})")]
    TooLong(usize),

    #[error("repository name '{0}' must be lowercase path components of [a-z0-9] joined by '.', '_' or '-'")]
    Malformed(String),
}

/// A repository name that satisfies the registry naming rules
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryName(String);

impl RepositoryName {
    /// Validates a declared name
    ///
    /// Surrounding whitespace is not trimmed: `" repo"` is malformed, not `"repo"`.
    pub fn parse(name: &str) -> Result<Self, InvalidRepositoryName> {
        if name.is_empty() {
            return Err(InvalidRepositoryName::Empty);
        }

        if name.len() < MIN_LENGTH {
            return Err(InvalidRepositoryName::TooShort(name.to_string()));
        }

        if name.len() > MAX_LENGTH {
            return Err(InvalidRepositoryName::TooLong(name.len()));
        }

        if !NAME_PATTERN.is_match(name) {
            return Err(InvalidRepositoryName::Malformed(name.to_string()));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RepositoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = InvalidRepositoryName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepositoryName> for String {
    fn from(name: RepositoryName) -> Self {
        name.0
    }
}
