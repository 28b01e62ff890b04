//! Status reporting
//!
//! Writes the outcome of each cycle to the object's status subresource.
//! The reconciler never reads status back; it is for humans and tooling.
//! Unchanged statuses are not written again, so a status update cannot
//! keep triggering cycles of its own.

use async_trait::async_trait;
use chrono::Utc;
use ecr_core::api::v1alpha1::{ECR, EcrStatus, RepositoryPhase};
use ecr_core::domain::{RepositoryName, ResourceRef};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;

use crate::reconciler::{Outcome, ReconcileError};

/// Field manager recorded on status patches
pub const FIELD_MANAGER: &str = "ecr-operator";

/// Writer trait for the status subresource
#[async_trait]
pub trait StatusWriter: Send + Sync {
    async fn write(&self, resource: &ResourceRef, status: &EcrStatus) -> Result<(), kube::Error>;
}

/// Kubernetes implementation of StatusWriter
#[derive(Clone)]
pub struct KubeStatusWriter {
    client: Client,
}

impl KubeStatusWriter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusWriter for KubeStatusWriter {
    async fn write(&self, resource: &ResourceRef, status: &EcrStatus) -> Result<(), kube::Error> {
        let api: Api<ECR> = Api::namespaced(self.client.clone(), &resource.namespace);
        let patch = json!({ "status": status });
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PatchParams::default()
        };
        api.patch_status(&resource.name, &params, &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

/// Status describing a finished cycle
///
/// Returns `None` when the object is gone and there is nothing to write.
pub fn status_for(
    result: &Result<Outcome, ReconcileError>,
    generation: Option<i64>,
) -> Option<EcrStatus> {
    let (phase, message) = match result {
        Ok(outcome) => match outcome.repository() {
            Some(repository) => (RepositoryPhase::Ready, ready_message(repository)),
            None => return None,
        },
        Err(err) if err.is_invalid() => (RepositoryPhase::Invalid, err.to_string()),
        Err(err) => (RepositoryPhase::Failed, err.to_string()),
    };

    Some(EcrStatus {
        phase: Some(phase),
        message: Some(message),
        observed_generation: generation,
        last_sync_time: Some(Utc::now()),
    })
}

/// Ready message shared by every successful outcome
///
/// Creating and finding the repository read the same, so the cycle after a
/// create does not rewrite the status.
fn ready_message(repository: &RepositoryName) -> String {
    format!("repository {repository} exists")
}

/// Whether `next` should replace the object's current status
pub fn needs_update(current: Option<&EcrStatus>, next: &EcrStatus) -> bool {
    current.is_none_or(|current| next.differs_from(current))
}
