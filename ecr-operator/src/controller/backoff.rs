//! Per-object requeue backoff
//!
//! Delays double with every consecutive failure of the same object, from
//! `base` up to `max`, and start over once a cycle succeeds.

use ecr_core::domain::ResourceRef;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Exponential backoff tracked per object
#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<ResourceRef, u32>>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Records a failure and returns how long to wait before retrying
    pub fn next_delay(&self, resource: &ResourceRef) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let attempt = failures.entry(resource.clone()).or_insert(0);
        let delay = self
            .base
            .saturating_mul(2u32.saturating_pow(*attempt))
            .min(self.max);
        *attempt = attempt.saturating_add(1);
        delay
    }

    /// Forgets the failure history of an object
    pub fn reset(&self, resource: &ResourceRef) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(resource);
    }
}
