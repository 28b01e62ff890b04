//! In-memory object store
//!
//! Holds `ECR` objects in a map keyed by reference. Used by tests and
//! anywhere the operator runs without a cluster.

use async_trait::async_trait;
use ecr_core::api::v1alpha1::{ECR, EcrSpec};
use ecr_core::domain::ResourceRef;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{ObjectStore, StoreError};

#[derive(Default)]
struct State {
    objects: HashMap<ResourceRef, ECR>,
    failures: VecDeque<StoreError>,
}

/// In-memory implementation of ObjectStore
#[derive(Default)]
pub struct InMemoryObjectStore {
    state: Mutex<State>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declares an object with the given repository name
    pub fn declare(&self, namespace: &str, name: &str, repository: &str) -> ResourceRef {
        let mut ecr = ECR::new(
            name,
            EcrSpec {
                name: repository.to_string(),
            },
        );
        ecr.metadata.namespace = Some(namespace.to_string());
        ecr.metadata.generation = Some(1);
        self.put(ecr)
    }

    /// Inserts or replaces an object
    ///
    /// Objects without a namespace are stored under the empty namespace.
    pub fn put(&self, ecr: ECR) -> ResourceRef {
        let resource = ResourceRef::from_object(&ecr)
            .unwrap_or_else(|| ResourceRef::new("", ecr.metadata.name.clone().unwrap_or_default()));
        self.state().objects.insert(resource.clone(), ecr);
        resource
    }

    pub fn delete(&self, resource: &ResourceRef) -> Option<ECR> {
        self.state().objects.remove(resource)
    }

    /// Makes the next `get` call fail with `err`
    pub fn fail_next_get(&self, err: StoreError) {
        self.state().failures.push_back(err);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, resource: &ResourceRef) -> Result<Option<ECR>, StoreError> {
        let mut state = self.state();
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }
        Ok(state.objects.get(resource).cloned())
    }
}
