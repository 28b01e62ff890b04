//! Reconciler
//!
//! Decides, for one `ECR` reference, whether the declared repository has
//! to be created, and does so. Each cycle:
//!
//! 1. Fetches the object. Gone means done.
//! 2. Validates `spec.name`. Invalid names never reach the registry.
//! 3. Asks the registry whether the repository exists. A failed check is
//!    an error, never absence.
//! 4. Creates the repository when absent. "Already exists" on create is
//!    success: the desired state holds.
//!
//! The reconciler keeps no state between cycles and holds no locks, so it
//! is safe to run concurrently for any mix of references. Duplicate cycles
//! for the same object converge through check-then-create idempotence.

mod outcome;

pub use outcome::{Cycle, Outcome, ReconcileError, should_requeue};

use ecr_client::{CreateOutcome, Presence, RegistryGateway};
use ecr_core::api::v1alpha1::ECR;
use ecr_core::domain::{RepositoryName, ResourceRef};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, Span, error, info, info_span, warn};

use crate::store::ObjectStore;

/// Reconciles `ECR` objects against the registry
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn ObjectStore>,
    registry: Arc<dyn RegistryGateway>,
    /// Parent for the per-cycle spans
    span: Span,
}

impl Reconciler {
    /// Creates a new reconciler
    ///
    /// # Arguments
    /// * `store` - Source of the desired-state objects
    /// * `registry` - Gateway to the container registry
    /// * `span` - Span every cycle's span is attached to
    pub fn new(
        store: Arc<dyn ObjectStore>,
        registry: Arc<dyn RegistryGateway>,
        span: Span,
    ) -> Self {
        Self {
            store,
            registry,
            span,
        }
    }

    /// Runs one reconciliation cycle for `resource`
    pub async fn reconcile(&self, resource: &ResourceRef) -> Result<Outcome, ReconcileError> {
        self.observe(resource).await.result
    }

    /// Runs one cycle and reports the generation it acted on
    pub async fn observe(&self, resource: &ResourceRef) -> Cycle {
        let span = info_span!(
            parent: &self.span,
            "reconcile",
            namespace = %resource.namespace,
            name = %resource.name,
        );
        self.run(resource).instrument(span).await
    }

    /// Runs one cycle bounded by `timeout`
    ///
    /// On expiry the in-flight fetch or registry call is dropped and the
    /// cycle reports a retryable error.
    pub async fn reconcile_within(
        &self,
        resource: &ResourceRef,
        timeout: Duration,
    ) -> Cycle {
        match tokio::time::timeout(timeout, self.observe(resource)).await {
            Ok(cycle) => cycle,
            Err(_) => {
                warn!(%resource, ?timeout, "Reconciliation timed out");
                Cycle::unobserved(Err(ReconcileError::TimedOut {
                    resource: resource.clone(),
                    timeout,
                }))
            }
        }
    }

    async fn run(&self, resource: &ResourceRef) -> Cycle {
        info!("Reconciling ECR");

        let ecr = match self.store.get(resource).await {
            Ok(Some(ecr)) => ecr,
            Ok(None) => {
                info!("ECR resource not found. Ignoring since object must be deleted");
                return Cycle::unobserved(Ok(Outcome::ObjectGone));
            }
            Err(source) => {
                error!(error = %source, "Failed to get ECR");
                return Cycle::unobserved(Err(ReconcileError::Fetch {
                    resource: resource.clone(),
                    source,
                }));
            }
        };

        Cycle {
            generation: ecr.metadata.generation,
            result: self.ensure(resource, &ecr).await,
        }
    }

    async fn ensure(&self, resource: &ResourceRef, ecr: &ECR) -> Result<Outcome, ReconcileError> {
        let repository = RepositoryName::parse(&ecr.spec.name).map_err(|source| {
            warn!(declared = %ecr.spec.name, error = %source, "Rejecting invalid repository name");
            ReconcileError::InvalidName {
                resource: resource.clone(),
                source,
            }
        })?;

        match self.registry.exists(&repository).await {
            Ok(Presence::Present) => {
                info!(%repository, "Skipping reconcile: repository already exists");
                return Ok(Outcome::AlreadyPresent(repository));
            }
            Ok(Presence::Absent) => {}
            Err(source) if source.is_not_found() => {}
            Err(source) => {
                error!(%repository, error = %source, "Error checking if repository exists");
                return Err(ReconcileError::Check { repository, source });
            }
        }

        self.create(repository).await
    }

    async fn create(&self, repository: RepositoryName) -> Result<Outcome, ReconcileError> {
        info!(%repository, "Creating repository");

        match self.registry.create(&repository).await {
            Ok(CreateOutcome::Created) => {
                info!(%repository, "Repository created");
                Ok(Outcome::Created(repository))
            }
            Ok(CreateOutcome::AlreadyExists) => {
                info!(%repository, "Repository was created concurrently");
                Ok(Outcome::CreatedConcurrently(repository))
            }
            Err(source) if source.is_already_exists() => {
                info!(%repository, "Repository was created concurrently");
                Ok(Outcome::CreatedConcurrently(repository))
            }
            Err(source) => {
                error!(%repository, error = %source, "Error creating repository");
                Err(ReconcileError::Create { repository, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryObjectStore, StoreError};
    use ecr_client::{InMemoryRegistry, RegistryError};

    fn setup() -> (Arc<InMemoryObjectStore>, Arc<InMemoryRegistry>, Reconciler) {
        let store = Arc::new(InMemoryObjectStore::new());
        let registry = Arc::new(InMemoryRegistry::new());
        let reconciler = Reconciler::new(store.clone(), registry.clone(), Span::none());
        (store, registry, reconciler)
    }

    #[tokio::test]
    async fn test_fetch_failure_requeues_without_registry_calls() {
        let (store, registry, reconciler) = setup();
        let resource = store.declare("default", "svc-a", "svc-a-repo");
        store.fail_next_get(StoreError::Unavailable("apiserver down".into()));

        let result = reconciler.reconcile(&resource).await;

        assert!(matches!(result, Err(ReconcileError::Fetch { .. })));
        assert!(should_requeue(&result));
        assert_eq!(registry.exists_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_name_skips_registry() {
        let (store, registry, reconciler) = setup();
        for (name, declared) in [("empty", ""), ("upper", "Svc-A")] {
            let resource = store.declare("default", name, declared);
            let result = reconciler.reconcile(&resource).await;

            assert!(matches!(result, Err(ReconcileError::InvalidName { .. })));
            assert!(!should_requeue(&result));
        }
        assert_eq!(registry.exists_calls(), 0);
        assert_eq!(registry.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_rereads_spec_every_cycle() {
        let (store, registry, reconciler) = setup();
        let resource = store.declare("default", "svc-a", "first-repo");
        reconciler.reconcile(&resource).await.unwrap();

        store.declare("default", "svc-a", "second-repo");
        let outcome = reconciler.reconcile(&resource).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Created(RepositoryName::parse("second-repo").unwrap())
        );
        assert!(registry.contains("first-repo"));
        assert!(registry.contains("second-repo"));
    }

    #[tokio::test]
    async fn test_registry_rejection_is_not_requeued() {
        let (store, registry, reconciler) = setup();
        let resource = store.declare("default", "svc-a", "svc-a-repo");
        registry.fail_next_create(RegistryError::from_code(
            Some(ecr_client::error::CODE_INVALID_PARAMETER),
            "Invalid parameter at 'repositoryName'",
        ));

        let result = reconciler.reconcile(&resource).await;

        assert!(matches!(result, Err(ReconcileError::Create { .. })));
        assert!(!should_requeue(&result));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retryable() {
        let store = Arc::new(InMemoryObjectStore::new());
        let registry =
            Arc::new(InMemoryRegistry::new().with_latency(Duration::from_secs(60)));
        let reconciler = Reconciler::new(store.clone(), registry.clone(), Span::none());
        let resource = store.declare("default", "svc-a", "svc-a-repo");

        let cycle = reconciler
            .reconcile_within(&resource, Duration::from_secs(5))
            .await;

        assert!(matches!(cycle.result, Err(ReconcileError::TimedOut { .. })));
        assert!(should_requeue(&cycle.result));
        assert_eq!(cycle.generation, None);
        assert_eq!(registry.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_cycle_reports_fetched_generation() {
        let (store, _registry, reconciler) = setup();
        let resource = store.declare("default", "svc-a", "svc-a-repo");
        let mut ecr = store.get(&resource).await.unwrap().unwrap();
        ecr.metadata.generation = Some(7);
        store.put(ecr);

        let cycle = reconciler.observe(&resource).await;

        assert_eq!(cycle.generation, Some(7));
        assert!(cycle.result.is_ok());
    }
}
