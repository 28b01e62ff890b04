//! Reconciliation outcomes and errors
//!
//! Every cycle ends in either an [`Outcome`] (nothing left to do) or a
//! [`ReconcileError`] that knows whether the dispatcher should retry.

use ecr_client::RegistryError;
use ecr_core::domain::{InvalidRepositoryName, RepositoryName, ResourceRef};
use std::time::Duration;
use thiserror::Error;

use crate::store::StoreError;

/// Successful end of a reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The object was deleted before it could be processed
    ObjectGone,

    /// The repository already existed; nothing was changed
    AlreadyPresent(RepositoryName),

    /// This cycle created the repository
    Created(RepositoryName),

    /// Create lost a race with another caller; the repository exists
    CreatedConcurrently(RepositoryName),
}

impl Outcome {
    /// Repository the outcome refers to, if the object still exists
    pub fn repository(&self) -> Option<&RepositoryName> {
        match self {
            Outcome::ObjectGone => None,
            Outcome::AlreadyPresent(name)
            | Outcome::Created(name)
            | Outcome::CreatedConcurrently(name) => Some(name),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::ObjectGone => write!(f, "object no longer exists"),
            Outcome::AlreadyPresent(name) => write!(f, "repository {name} already exists"),
            Outcome::Created(name) => write!(f, "repository {name} created"),
            Outcome::CreatedConcurrently(name) => {
                write!(f, "repository {name} was created concurrently")
            }
        }
    }
}

/// Failed reconciliation cycle
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Object could not be read
    #[error("Failed to get ECR {resource}: {source}")]
    Fetch {
        resource: ResourceRef,
        #[source]
        source: StoreError,
    },

    /// Declared repository name can never be created
    #[error("Invalid repository name in ECR {resource}: {source}")]
    InvalidName {
        resource: ResourceRef,
        #[source]
        source: InvalidRepositoryName,
    },

    /// Existence check failed; absence was not confirmed
    #[error("Failed to check whether repository {repository} exists: {source}")]
    Check {
        repository: RepositoryName,
        #[source]
        source: RegistryError,
    },

    /// Create request failed
    #[error("Failed to create repository {repository}: {source}")]
    Create {
        repository: RepositoryName,
        #[source]
        source: RegistryError,
    },

    /// Cycle did not finish before the caller's deadline
    #[error("Reconciliation of ECR {resource} timed out after {timeout:?}")]
    TimedOut {
        resource: ResourceRef,
        timeout: Duration,
    },

    /// Watched object carries no namespace
    #[error("ECR {0} has no namespace")]
    MissingNamespace(String),
}

impl ReconcileError {
    /// Whether the dispatcher should run this object again
    ///
    /// Invalid declarations are surfaced instead of retried; a later edit of
    /// the object starts a new cycle.
    pub fn requeue(&self) -> bool {
        match self {
            ReconcileError::Fetch { .. } | ReconcileError::TimedOut { .. } => true,
            ReconcileError::Check { source, .. } | ReconcileError::Create { source, .. } => {
                source.is_retryable()
            }
            ReconcileError::InvalidName { .. } | ReconcileError::MissingNamespace(_) => false,
        }
    }

    /// Whether the failure is caused by the declaration itself
    pub fn is_invalid(&self) -> bool {
        !self.requeue()
    }
}

/// Finished cycle together with the generation it acted on
#[derive(Debug)]
pub struct Cycle {
    /// `metadata.generation` of the fetched object; `None` if it was never read
    pub generation: Option<i64>,
    pub result: Result<Outcome, ReconcileError>,
}

impl Cycle {
    pub(crate) fn unobserved(result: Result<Outcome, ReconcileError>) -> Self {
        Self {
            generation: None,
            result,
        }
    }
}

/// Requeue decision for a finished cycle
pub fn should_requeue(result: &Result<Outcome, ReconcileError>) -> bool {
    match result {
        Ok(_) => false,
        Err(err) => err.requeue(),
    }
}
