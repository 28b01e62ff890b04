//! Kubernetes object store
//!
//! Reads `ECR` objects straight from the API server rather than from the
//! watch cache, so a cycle never acts on a spec older than its trigger.

use async_trait::async_trait;
use ecr_core::api::v1alpha1::ECR;
use ecr_core::domain::ResourceRef;
use kube::{Api, Client};
use tracing::debug;

use super::{ObjectStore, StoreError};

/// API server implementation of ObjectStore
#[derive(Clone)]
pub struct KubeObjectStore {
    client: Client,
}

impl KubeObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for KubeObjectStore {
    async fn get(&self, resource: &ResourceRef) -> Result<Option<ECR>, StoreError> {
        debug!(%resource, "Fetching ECR");

        let api: Api<ECR> = Api::namespaced(self.client.clone(), &resource.namespace);
        Ok(api.get_opt(&resource.name).await?)
    }
}
