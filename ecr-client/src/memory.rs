//! In-memory registry
//!
//! A process-local [`RegistryGateway`] that behaves like the real
//! registry for existence and creation, counts calls, and lets callers
//! inject failures, latency and concurrent creations.

use async_trait::async_trait;
use ecr_core::domain::RepositoryName;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{RegistryError, Result};
use crate::{CreateOutcome, Presence, RegistryGateway};

#[derive(Default)]
struct State {
    repositories: HashSet<String>,
    exists_failures: VecDeque<RegistryError>,
    create_failures: VecDeque<RegistryError>,
    /// Names another caller creates just before our next create lands
    concurrent_creates: Vec<String>,
}

/// Registry held in process memory
#[derive(Default)]
pub struct InMemoryRegistry {
    state: Mutex<State>,
    exists_calls: AtomicUsize,
    create_calls: AtomicUsize,
    latency: Option<Duration>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that already holds the given repositories
    pub fn with_repositories<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new();
        for name in names {
            registry.insert(name);
        }
        registry
    }

    /// Delays every call after its lookup has been taken
    ///
    /// Two overlapping calls therefore both observe the state from before
    /// either of them slept.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, name: impl Into<String>) {
        self.state().repositories.insert(name.into());
    }

    /// Deletes a repository behind the operator's back
    pub fn remove(&self, name: &str) -> bool {
        self.state().repositories.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state().repositories.contains(name)
    }

    /// Makes the next `exists` call fail with `err`
    pub fn fail_next_exists(&self, err: RegistryError) {
        self.state().exists_failures.push_back(err);
    }

    /// Makes the next `create` call fail with `err`
    pub fn fail_next_create(&self, err: RegistryError) {
        self.state().create_failures.push_back(err);
    }

    /// Lets another caller create `name` right before the next `create`
    pub fn race_next_create(&self, name: impl Into<String>) {
        self.state().concurrent_creates.push(name.into());
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RegistryGateway for InMemoryRegistry {
    async fn exists(&self, name: &RepositoryName) -> Result<Presence> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);

        let answer = {
            let mut state = self.state();
            match state.exists_failures.pop_front() {
                Some(err) => Err(err),
                None if state.repositories.contains(name.as_str()) => Ok(Presence::Present),
                None => Ok(Presence::Absent),
            }
        };

        self.delay().await;
        answer
    }

    async fn create(&self, name: &RepositoryName) -> Result<CreateOutcome> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let answer = {
            let mut state = self.state();
            let racers = std::mem::take(&mut state.concurrent_creates);
            state.repositories.extend(racers);

            match state.create_failures.pop_front() {
                Some(err) => Err(err),
                None if !state.repositories.insert(name.to_string()) => {
                    Ok(CreateOutcome::AlreadyExists)
                }
                None => Ok(CreateOutcome::Created),
            }
        };

        self.delay().await;
        answer
    }
}
