//! Kubernetes resource watchers.
//!
//! Drives the reconciler from `kube_runtime::Controller`: events on a
//! NeutronSriovAgent, or on a ConfigMap or DaemonSet it owns, queue a pass
//! for the agent's key. The runtime serializes passes per key; retries of
//! failed passes follow a per-key Fibonacci backoff kept here.

use crate::backoff::FibonacciBackoff;
use crate::config::Settings;
use crate::error::ControllerError;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::store::ObjectKey;
use crds::NeutronSriovAgent;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Api;
use kube_runtime::{Controller, watcher, controller::{Action, Config as ControllerConfig}};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconciliation.
pub struct Context {
    reconciler: Reconciler,
    /// Retry state per resource (namespace/name -> backoff)
    backoff_states: Mutex<HashMap<ObjectKey, FibonacciBackoff>>,
    backoff_min: Duration,
    backoff_max: Duration,
}

impl Context {
    /// Creates the context.
    pub fn new(reconciler: Reconciler, settings: &Settings) -> Self {
        Self {
            reconciler,
            backoff_states: Mutex::new(HashMap::new()),
            backoff_min: settings.error_backoff_min,
            backoff_max: settings.error_backoff_max,
        }
    }

    /// Next retry delay for `key`.
    fn next_backoff(&self, key: &ObjectKey) -> Duration {
        match self.backoff_states.lock() {
            Ok(mut states) => states
                .entry(key.clone())
                .or_insert_with(|| FibonacciBackoff::new(self.backoff_min, self.backoff_max))
                .next_backoff(),
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                self.backoff_min
            }
        }
    }

    /// Forgets the retry state of `key` after a successful pass.
    fn reset_backoff(&self, key: &ObjectKey) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(backoff) = states.get_mut(key) {
                backoff.reset();
            }
        }
    }
}

async fn reconcile(agent: Arc<NeutronSriovAgent>, ctx: Arc<Context>) -> Result<Action, ControllerError> {
    let key = ObjectKey::from_meta(&agent.metadata)?;
    debug!("Reconcile requested for NeutronSriovAgent {}", key);

    let outcome = ctx.reconciler.reconcile(&key).await?;
    ctx.reset_backoff(&key);

    Ok(match outcome {
        ReconcileOutcome::Done => Action::await_change(),
        ReconcileOutcome::RequeueAfter(delay) => Action::requeue(delay),
    })
}

fn error_policy(agent: Arc<NeutronSriovAgent>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    let Ok(key) = ObjectKey::from_meta(&agent.metadata) else {
        error!("Reconciliation error for NeutronSriovAgent without name/namespace: {}", error);
        return Action::await_change();
    };
    let delay = ctx.next_backoff(&key);
    error!(
        "Reconciliation failed for NeutronSriovAgent {}: {}, retrying in {}s",
        key,
        error,
        delay.as_secs()
    );
    Action::requeue(delay)
}

/// Watches NeutronSriovAgent resources and their owned objects.
pub struct Watcher {
    context: Arc<Context>,
    agent_api: Api<NeutronSriovAgent>,
    config_map_api: Api<ConfigMap>,
    daemon_set_api: Api<DaemonSet>,
    debounce: Duration,
    concurrency: u16,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(
        context: Arc<Context>,
        agent_api: Api<NeutronSriovAgent>,
        config_map_api: Api<ConfigMap>,
        daemon_set_api: Api<DaemonSet>,
        settings: &Settings,
    ) -> Self {
        Self {
            context,
            agent_api,
            config_map_api,
            daemon_set_api,
            debounce: settings.debounce,
            concurrency: settings.concurrency,
        }
    }

    /// Runs the reconcile loop until the process is asked to shut down.
    pub async fn watch_agents(&self) -> Result<(), ControllerError> {
        info!("Starting NeutronSriovAgent watcher");

        // Debounce batches bursts of events (e.g. DaemonSet status churn during a rollout)
        let controller_config = ControllerConfig::default()
            .debounce(self.debounce)
            .concurrency(self.concurrency);

        Controller::new(self.agent_api.clone(), watcher::Config::default())
            .owns(self.config_map_api.clone(), watcher::Config::default())
            .owns(self.daemon_set_api.clone(), watcher::Config::default())
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, Arc::clone(&self.context))
            .for_each(|res| async move {
                match res {
                    Ok((object, _)) => debug!("Reconciled {}", object),
                    Err(e) => warn!("Controller error for NeutronSriovAgent: {}", e),
                }
            })
            .await;

        info!("NeutronSriovAgent watcher stopped");
        Ok(())
    }
}
