//! Error types for the registry client
//!
//! Registry-specific error codes are mapped here into a small closed
//! taxonomy. Callers branch on [`RegistryErrorKind`], never on codes.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

pub const CODE_REPOSITORY_NOT_FOUND: &str = "RepositoryNotFoundException";
pub const CODE_REPOSITORY_ALREADY_EXISTS: &str = "RepositoryAlreadyExistsException";
pub const CODE_INVALID_PARAMETER: &str = "InvalidParameterException";
pub const CODE_INVALID_TAG_PARAMETER: &str = "InvalidTagParameterException";

/// Errors returned by a registry gateway
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The named repository does not exist
    #[error("Repository not found: {0}")]
    NotFound(String),

    /// The named repository already exists
    #[error("Repository already exists: {0}")]
    AlreadyExists(String),

    /// The registry rejected the request as malformed; retrying cannot help
    #[error("Registry rejected request ({code}): {message}")]
    Invalid { code: String, message: String },

    /// Any other failure: auth, throttling, network, unexpected faults
    #[error("Registry request failed{}: {message}", code_suffix(.code))]
    Transient {
        code: Option<String>,
        message: String,
    },

    /// The call did not complete in time
    #[error("Registry request timed out after {0:?}")]
    TimedOut(Duration),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" ({c})"))
        .unwrap_or_default()
}

/// Closed classification of registry errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorKind {
    NotFound,
    AlreadyExists,
    Invalid,
    Transient,
}

impl std::fmt::Display for RegistryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryErrorKind::NotFound => write!(f, "NotFound"),
            RegistryErrorKind::AlreadyExists => write!(f, "AlreadyExists"),
            RegistryErrorKind::Invalid => write!(f, "Invalid"),
            RegistryErrorKind::Transient => write!(f, "Transient"),
        }
    }
}

impl RegistryError {
    /// Builds an error from a registry error code
    ///
    /// Unknown or missing codes are transient.
    pub fn from_code(code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            Some(CODE_REPOSITORY_NOT_FOUND) => Self::NotFound(message),
            Some(CODE_REPOSITORY_ALREADY_EXISTS) => Self::AlreadyExists(message),
            Some(c @ (CODE_INVALID_PARAMETER | CODE_INVALID_TAG_PARAMETER)) => Self::Invalid {
                code: c.to_string(),
                message,
            },
            other => Self::Transient {
                code: other.map(str::to_string),
                message,
            },
        }
    }

    /// Create a transient error without a registry code
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            code: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> RegistryErrorKind {
        match self {
            Self::NotFound(_) => RegistryErrorKind::NotFound,
            Self::AlreadyExists(_) => RegistryErrorKind::AlreadyExists,
            Self::Invalid { .. } => RegistryErrorKind::Invalid,
            Self::Transient { .. } | Self::TimedOut(_) => RegistryErrorKind::Transient,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.kind() == RegistryErrorKind::NotFound
    }

    /// Check if this error means the repository is already there
    pub fn is_already_exists(&self) -> bool {
        self.kind() == RegistryErrorKind::AlreadyExists
    }

    /// Check if repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == RegistryErrorKind::Transient
    }
}
