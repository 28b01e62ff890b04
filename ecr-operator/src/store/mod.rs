//! Object store layer
//!
//! Stores resolve a [`ResourceRef`] to the current `ECR` object. They are
//! stateless lookups without business logic; the reconciler calls them at
//! the start of every cycle so it always works from a fresh read.
//!
//! All stores are trait-based to enable testing and mocking.

mod cluster;
mod memory;

pub use cluster::KubeObjectStore;
pub use memory::InMemoryObjectStore;

use async_trait::async_trait;
use ecr_core::api::v1alpha1::ECR;
use ecr_core::domain::ResourceRef;
use thiserror::Error;

/// Errors from an object store, other than the object being absent
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API call failed
    #[error("Kubernetes API request failed: {0}")]
    Api(#[from] kube::Error),

    /// Store could not be reached
    #[error("Object store unavailable: {0}")]
    Unavailable(String),
}

/// Store trait for fetching desired-state objects
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches the object a reference points at
    ///
    /// # Returns
    /// `Ok(None)` when no such object exists. Every other failure is an error.
    async fn get(&self, resource: &ResourceRef) -> Result<Option<ECR>, StoreError>;
}
