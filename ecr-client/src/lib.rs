//! ECR Registry Client
//!
//! The boundary between the operator and the container registry. The
//! operator only ever asks two questions of the registry: does a
//! repository exist, and please create it. Both are answered through the
//! [`RegistryGateway`] trait so the reconciler never sees SDK types.
//!
//! Implementations:
//! - [`EcrRegistry`]: Amazon ECR through `aws-sdk-ecr`
//! - [`InMemoryRegistry`]: a process-local registry with call counters and
//!   fault injection, used in tests
//!
//! # Example
//!
//! ```no_run
//! use ecr_client::{EcrRegistry, EcrRegistryConfig, Presence, RegistryGateway};
//! use ecr_core::domain::RepositoryName;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = EcrRegistry::connect(EcrRegistryConfig::new("eu-west-1")).await;
//!     let name = RepositoryName::parse("svc-a-repo")?;
//!
//!     if registry.exists(&name).await? == Presence::Absent {
//!         registry.create(&name).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod ecr;
pub mod error;
pub mod memory;

pub use ecr::{EcrRegistry, EcrRegistryConfig};
pub use error::{RegistryError, RegistryErrorKind, Result};
pub use memory::InMemoryRegistry;

use async_trait::async_trait;
use ecr_core::domain::RepositoryName;

/// Region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Whether a repository was found in the registry
///
/// Only a confirmed "not found" answer from the registry yields `Absent`.
/// A failed lookup is an error, never absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

/// Result of a successful create request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// This call created the repository
    Created,

    /// The registry reported the repository already exists, typically
    /// because a concurrent caller created it first
    AlreadyExists,
}

/// Region-scoped access to repository existence and creation
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Looks up a repository by name
    ///
    /// # Returns
    /// `Presence::Absent` only when the registry reports the repository
    /// as not found. Any other failure is returned as an error.
    async fn exists(&self, name: &RepositoryName) -> Result<Presence>;

    /// Requests creation of a repository
    ///
    /// # Returns
    /// `CreateOutcome::AlreadyExists` when the repository is already there,
    /// which callers should treat as success.
    async fn create(&self, name: &RepositoryName) -> Result<CreateOutcome>;
}
