//! `cache.example.com/v1alpha1` API
//!
//! An `ECR` object declares that a repository with `spec.name` should exist
//! in the registry. Deleting the object leaves the repository in place.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of an ECR repository
#[derive(CustomResource, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cache.example.com",
    version = "v1alpha1",
    kind = "ECR",
    plural = "ecrs",
    namespaced,
    status = "EcrStatus",
    printcolumn = r#"{"name":"Repository","type":"string","jsonPath":".spec.name"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
pub struct EcrSpec {
    /// Name of the repository in the registry
    pub name: String,
}

/// Observed state of an ECR repository
///
/// Written by the operator after each reconciliation. Never read back
/// when deciding what to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EcrStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<RepositoryPhase>,

    /// Human readable detail for the current phase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// `metadata.generation` of the spec this status describes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// When the operator last wrote this status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<DateTime<Utc>>,
}

impl EcrStatus {
    /// Whether two statuses differ in anything but the timestamp
    pub fn differs_from(&self, other: &EcrStatus) -> bool {
        self.phase != other.phase
            || self.message != other.message
            || self.observed_generation != other.observed_generation
    }
}

/// Coarse state of the declared repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RepositoryPhase {
    /// Repository exists in the registry
    Ready,

    /// Last attempt failed and will be retried
    Failed,

    /// Declared name can never be created; waiting for the object to change
    Invalid,
}

impl std::fmt::Display for RepositoryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryPhase::Ready => write!(f, "Ready"),
            RepositoryPhase::Failed => write!(f, "Failed"),
            RepositoryPhase::Invalid => write!(f, "Invalid"),
        }
    }
}
