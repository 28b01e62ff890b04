//! Object references
//!
//! Identifies a namespaced object independently of its contents. The
//! dispatcher hands these to the reconciler, which always re-reads the
//! object they point at.

use kube::ResourceExt;
use serde::{Deserialize, Serialize};

/// Namespace and name of a control-plane object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Builds a reference to a namespaced object
    ///
    /// Returns `None` for cluster-scoped objects.
    pub fn from_object<K: ResourceExt>(obj: &K) -> Option<Self> {
        let namespace = obj.namespace()?;
        Some(Self::new(namespace, obj.name_any()))
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
