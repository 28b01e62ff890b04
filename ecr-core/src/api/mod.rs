//! Kubernetes API types
//!
//! Versioned schemas for the custom resources the operator watches.

pub mod v1alpha1;
