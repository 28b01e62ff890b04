//! Controller layer
//!
//! Wires the reconciler into `kube`'s controller runtime, which acts as the
//! dispatcher: it watches `ECR` objects, debounces events, bounds
//! concurrency and schedules requeues. This module decides *when* a cycle
//! runs again; the reconciler decides *what* a cycle does.

pub mod backoff;
pub mod status;

pub use backoff::Backoff;
pub use status::{KubeStatusWriter, StatusWriter};

use anyhow::{Context as AnyhowContext, Result};
use ecr_client::RegistryGateway;
use ecr_core::api::v1alpha1::ECR;
use ecr_core::domain::ResourceRef;
use futures::{StreamExt, future};
use kube::api::ListParams;
use kube::runtime::controller::{self, Action, Config as ControllerConfig, Controller};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, warn};

use crate::config::Config;
use crate::health::Readiness;
use crate::reconciler::{Cycle, ReconcileError, Reconciler};
use crate::store::KubeObjectStore;

/// Error type of the controller's output stream
pub type ControllerError = controller::Error<ReconcileError, watcher::Error>;

/// State shared by all reconciliations
pub struct Context {
    reconciler: Reconciler,
    status: Arc<dyn StatusWriter>,
    backoff: Backoff,
    reconcile_timeout: Duration,
    resync_interval: Option<Duration>,
}

impl Context {
    pub fn new(reconciler: Reconciler, status: Arc<dyn StatusWriter>, config: &Config) -> Self {
        Self {
            reconciler,
            status,
            backoff: Backoff::new(config.requeue_base_delay, config.requeue_max_delay),
            reconcile_timeout: config.reconcile_timeout,
            resync_interval: config.resync_interval,
        }
    }

    fn settled(&self) -> Action {
        match self.resync_interval {
            Some(interval) => Action::requeue(interval),
            None => Action::await_change(),
        }
    }

    /// Writes the cycle's status, logging instead of failing
    ///
    /// The generation comes from the object the cycle read, falling back
    /// to the triggering object when the cycle never got that far.
    async fn report(&self, resource: &ResourceRef, ecr: &ECR, cycle: &Cycle) {
        let generation = cycle.generation.or(ecr.metadata.generation);
        let Some(next) = status::status_for(&cycle.result, generation) else {
            return;
        };

        if !status::needs_update(ecr.status.as_ref(), &next) {
            debug!(%resource, "Status unchanged");
            return;
        }

        if let Err(e) = self.status.write(resource, &next).await {
            warn!(%resource, error = %e, "Failed to update ECR status");
        }
    }
}

/// Reconcile entry point for the controller runtime
pub async fn reconcile(ecr: Arc<ECR>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let resource = ResourceRef::from_object(&*ecr)
        .ok_or_else(|| ReconcileError::MissingNamespace(ecr.name_any()))?;

    let cycle = ctx
        .reconciler
        .reconcile_within(&resource, ctx.reconcile_timeout)
        .await;

    ctx.report(&resource, &ecr, &cycle).await;

    cycle.result?;
    ctx.backoff.reset(&resource);
    Ok(ctx.settled())
}

/// Maps a failed cycle to the next scheduling decision
pub fn error_policy(ecr: Arc<ECR>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    if !err.requeue() {
        warn!(error = %err, "Not requeueing until the object changes");
        return Action::await_change();
    }

    let delay = match ResourceRef::from_object(&*ecr) {
        Some(resource) => ctx.backoff.next_delay(&resource),
        None => ctx.reconcile_timeout,
    };
    warn!(error = %err, ?delay, "Requeueing after failure");
    Action::requeue(delay)
}

/// Handles one item of the controller's output stream
///
/// Objects that left the watch cache are never reconciled again, so their
/// backoff history is dropped here.
pub fn record(ctx: &Context, item: Result<(ObjectRef<ECR>, Action), ControllerError>) {
    match item {
        Ok((object, action)) => debug!(%object, ?action, "Reconciled"),
        Err(controller::Error::ObjectNotFound(object)) => {
            debug!(%object, "Object left the cache; forgetting its backoff");
            let resource = ResourceRef::new(object.namespace.unwrap_or_default(), object.name);
            ctx.backoff.reset(&resource);
        }
        Err(e) => debug!(error = %e, "Reconcile did not complete"),
    }
}

/// Runs the controller until a shutdown signal arrives
pub async fn run(
    client: Client,
    config: &Config,
    registry: Arc<dyn RegistryGateway>,
    readiness: Readiness,
) -> Result<()> {
    let api: Api<ECR> = match &config.watch_namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };

    api.list(&ListParams::default().limit(1))
        .await
        .context("Failed to list ECR objects. Is the CRD installed?")?;

    let reconciler = Reconciler::new(
        Arc::new(KubeObjectStore::new(client.clone())),
        registry,
        info_span!("controller", controller = "ecr"),
    );
    let status = Arc::new(KubeStatusWriter::new(client));
    let ctx = Arc::new(Context::new(reconciler, status, config));
    let stream_ctx = ctx.clone();

    info!(
        namespace = config.watch_namespace.as_deref().unwrap_or("*"),
        concurrency = config.max_concurrent_reconciles,
        "Starting ECR controller"
    );
    readiness.set_ready();

    Controller::new(api, watcher::Config::default())
        .with_config(ControllerConfig::default().concurrency(config.max_concurrent_reconciles))
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|item| {
            record(&stream_ctx, item);
            future::ready(())
        })
        .await;

    readiness.set_not_ready();
    info!("ECR controller stopped");
    Ok(())
}
