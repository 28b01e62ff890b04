//! End-to-end reconciliation scenarios against in-memory doubles.

use ecr_client::{InMemoryRegistry, Presence, RegistryError, RegistryGateway};
use ecr_core::domain::{RepositoryName, ResourceRef};
use ecr_operator::reconciler::should_requeue;
use ecr_operator::store::InMemoryObjectStore;
use ecr_operator::{Outcome, ReconcileError, Reconciler};
use std::sync::Arc;
use std::time::Duration;
use tracing::Span;

struct Harness {
    store: Arc<InMemoryObjectStore>,
    registry: Arc<InMemoryRegistry>,
    reconciler: Reconciler,
}

impl Harness {
    fn new(registry: InMemoryRegistry) -> Self {
        let store = Arc::new(InMemoryObjectStore::new());
        let registry = Arc::new(registry);
        let reconciler = Reconciler::new(store.clone(), registry.clone(), Span::none());
        Self {
            store,
            registry,
            reconciler,
        }
    }

    fn svc_a(&self) -> ResourceRef {
        self.store.declare("default", "svc-a", "svc-a-repo")
    }
}

fn svc_a_repo() -> RepositoryName {
    RepositoryName::parse("svc-a-repo").unwrap()
}

#[tokio::test]
async fn scenario_a_creates_missing_repository() {
    let h = Harness::new(InMemoryRegistry::new());
    let resource = h.svc_a();

    let result = h.reconciler.reconcile(&resource).await;

    assert_eq!(result.as_ref().unwrap(), &Outcome::Created(svc_a_repo()));
    assert!(!should_requeue(&result));
    assert_eq!(h.registry.exists_calls(), 1);
    assert_eq!(h.registry.create_calls(), 1);
}

#[tokio::test]
async fn scenario_b_existing_repository_is_left_alone() {
    let h = Harness::new(InMemoryRegistry::with_repositories(["svc-a-repo"]));
    let resource = h.svc_a();

    let result = h.reconciler.reconcile(&resource).await;

    assert_eq!(result.as_ref().unwrap(), &Outcome::AlreadyPresent(svc_a_repo()));
    assert!(!should_requeue(&result));
    assert_eq!(h.registry.exists_calls(), 1);
    assert_eq!(h.registry.create_calls(), 0);
}

#[tokio::test]
async fn scenario_c_throttled_check_requeues_without_create() {
    let h = Harness::new(InMemoryRegistry::new());
    let resource = h.svc_a();
    h.registry.fail_next_exists(RegistryError::from_code(
        Some("ThrottlingException"),
        "Rate exceeded",
    ));

    let result = h.reconciler.reconcile(&resource).await;

    assert!(matches!(result, Err(ReconcileError::Check { .. })));
    assert!(should_requeue(&result));
    assert_eq!(h.registry.create_calls(), 0);
    assert!(!h.registry.contains("svc-a-repo"));
}

#[tokio::test]
async fn scenario_d_lost_create_race_is_success() {
    let h = Harness::new(InMemoryRegistry::new());
    let resource = h.svc_a();
    h.registry.race_next_create("svc-a-repo");

    let result = h.reconciler.reconcile(&resource).await;

    assert_eq!(
        result.as_ref().unwrap(),
        &Outcome::CreatedConcurrently(svc_a_repo())
    );
    assert!(!should_requeue(&result));
    assert_eq!(h.registry.create_calls(), 1);
}

#[tokio::test]
async fn scenario_d_already_exists_error_is_success() {
    let h = Harness::new(InMemoryRegistry::new());
    let resource = h.svc_a();
    h.registry
        .fail_next_create(RegistryError::AlreadyExists("svc-a-repo".to_string()));

    let result = h.reconciler.reconcile(&resource).await;

    assert_eq!(
        result.unwrap(),
        Outcome::CreatedConcurrently(svc_a_repo())
    );
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let h = Harness::new(InMemoryRegistry::new());
    let resource = h.svc_a();

    h.reconciler.reconcile(&resource).await.unwrap();
    let second = h.reconciler.reconcile(&resource).await;

    assert_eq!(second.unwrap(), Outcome::AlreadyPresent(svc_a_repo()));
    assert_eq!(h.registry.create_calls(), 1);
}

#[tokio::test]
async fn reconcile_converges() {
    let h = Harness::new(InMemoryRegistry::new());
    let resource = h.svc_a();

    h.reconciler.reconcile(&resource).await.unwrap();

    let presence = h.registry.exists(&svc_a_repo()).await.unwrap();
    assert_eq!(presence, Presence::Present);
}

#[tokio::test]
async fn missing_object_is_a_no_op() {
    let h = Harness::new(InMemoryRegistry::new());
    let resource = ResourceRef::new("default", "never-declared");

    let result = h.reconciler.reconcile(&resource).await;

    assert_eq!(result.as_ref().unwrap(), &Outcome::ObjectGone);
    assert!(!should_requeue(&result));
    assert_eq!(h.registry.exists_calls(), 0);
}

#[tokio::test]
async fn deleted_object_is_a_no_op() {
    let h = Harness::new(InMemoryRegistry::new());
    let resource = h.svc_a();
    h.store.delete(&resource);

    let result = h.reconciler.reconcile(&resource).await;

    assert_eq!(result.unwrap(), Outcome::ObjectGone);
}

#[tokio::test]
async fn check_failures_are_never_absence() {
    for err in [
        RegistryError::transient("connection reset by peer"),
        RegistryError::from_code(Some("AccessDeniedException"), "not authorized"),
        RegistryError::TimedOut(Duration::from_secs(10)),
    ] {
        let h = Harness::new(InMemoryRegistry::new());
        let resource = h.svc_a();
        h.registry.fail_next_exists(err);

        let result = h.reconciler.reconcile(&resource).await;

        assert!(result.is_err());
        assert!(should_requeue(&result));
        assert_eq!(h.registry.create_calls(), 0);
    }
}

#[tokio::test]
async fn failed_create_is_retried_next_cycle() {
    let h = Harness::new(InMemoryRegistry::new());
    let resource = h.svc_a();
    h.registry
        .fail_next_create(RegistryError::transient("service unavailable"));

    let first = h.reconciler.reconcile(&resource).await;
    assert!(matches!(first, Err(ReconcileError::Create { .. })));
    assert!(should_requeue(&first));

    let second = h.reconciler.reconcile(&resource).await;
    assert_eq!(second.unwrap(), Outcome::Created(svc_a_repo()));
    assert!(h.registry.contains("svc-a-repo"));
}

#[tokio::test]
async fn externally_deleted_repository_is_recreated() {
    let h = Harness::new(InMemoryRegistry::new());
    let resource = h.svc_a();

    h.reconciler.reconcile(&resource).await.unwrap();
    h.registry.remove("svc-a-repo");
    let again = h.reconciler.reconcile(&resource).await;

    assert_eq!(again.unwrap(), Outcome::Created(svc_a_repo()));
    assert_eq!(h.registry.create_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn overlapping_cycles_for_one_object_converge() {
    let h = Harness::new(InMemoryRegistry::new().with_latency(Duration::from_millis(50)));
    let resource = h.svc_a();

    let (a, b) = tokio::join!(
        h.reconciler.reconcile(&resource),
        h.reconciler.reconcile(&resource)
    );

    let mut outcomes = vec![a.unwrap(), b.unwrap()];
    outcomes.sort_by_key(|o| matches!(o, Outcome::CreatedConcurrently(_)));
    assert_eq!(
        outcomes,
        vec![
            Outcome::Created(svc_a_repo()),
            Outcome::CreatedConcurrently(svc_a_repo())
        ]
    );
    assert_eq!(h.registry.create_calls(), 2);
    assert!(h.registry.contains("svc-a-repo"));
}

#[tokio::test]
async fn duplicate_declarations_converge() {
    let h = Harness::new(InMemoryRegistry::new());
    let first = h.store.declare("team-a", "svc", "shared-repo");
    let second = h.store.declare("team-b", "svc", "shared-repo");

    let a = h.reconciler.reconcile(&first).await.unwrap();
    let b = h.reconciler.reconcile(&second).await.unwrap();

    assert!(matches!(a, Outcome::Created(_)));
    assert!(matches!(b, Outcome::AlreadyPresent(_)));
    assert_eq!(h.registry.create_calls(), 1);
}

#[tokio::test]
async fn different_objects_reconcile_concurrently() {
    let h = Harness::new(InMemoryRegistry::new());
    let refs: Vec<ResourceRef> = (0..8)
        .map(|i| h.store.declare("default", &format!("svc-{i}"), &format!("repo-{i}")))
        .collect();

    let results =
        futures::future::join_all(refs.iter().map(|r| h.reconciler.reconcile(r))).await;

    assert!(results.iter().all(|r| matches!(r, Ok(Outcome::Created(_)))));
    assert_eq!(h.registry.create_calls(), 8);
}
