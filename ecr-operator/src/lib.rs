//! ECR Operator
//!
//! Keeps Amazon ECR repositories in line with `ECR` objects declared in a
//! Kubernetes cluster: when an object names a repository that does not
//! exist, the operator creates it.
//!
//! Architecture:
//! - Configuration: settings from environment variables or defaults
//! - Stores: fresh reads of `ECR` objects by reference
//! - Reconciler: the check-then-create decision for one object
//! - Controller: watch, concurrency, requeue backoff and status reporting
//! - Health: liveness and readiness probes
//!
//! Deleting an `ECR` object never deletes its repository.

pub mod config;
pub mod controller;
pub mod health;
pub mod reconciler;
pub mod store;

pub use config::Config;
pub use reconciler::{Cycle, Outcome, ReconcileError, Reconciler};
