//! Reconciliation logic for NeutronSriovAgent resources.
//!
//! One pass loads the agent and the companion ConfigMap, builds the desired
//! ConfigMap and DaemonSet, converges them, and records the applied DaemonSet
//! fingerprint in the agent's status. Steps run strictly in order:
//!
//! 1. load the agent (absent: done)
//! 2. load the companion ConfigMap (absent: error)
//! 3. derive host aliases
//! 4. build the desired ConfigMap with owner reference
//! 5. converge the ConfigMap (`config_map`)
//! 6. build and fingerprint the desired DaemonSet
//! 7. converge the DaemonSet and status (`daemon_set`, `status`)
//!
//! The reconciler keeps no state between passes; everything a pass needs is
//! loaded or computed inside it.

mod config_map;
mod daemon_set;
mod status;

use crate::builder;
use crate::config::Settings;
use crate::error::ControllerError;
use crate::fingerprint::fingerprint;
use crate::hosts;
use crate::store::{ObjectKey, ObjectStore};
use kube::Resource;
use std::time::Duration;
use tracing::{debug, info};

/// Result of a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Converged; wait for the next change
    Done,
    /// Check again after the given delay
    RequeueAfter(Duration),
}

/// Reconciles NeutronSriovAgent resources.
pub struct Reconciler {
    store: Box<dyn ObjectStore>,
    common_config_name: String,
    requeue_after: Duration,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(store: impl ObjectStore + 'static, settings: &Settings) -> Self {
        Self {
            store: Box::new(store),
            common_config_name: settings.common_config_name.clone(),
            requeue_after: settings.requeue_after,
        }
    }

    /// Runs one reconciliation pass for the agent identified by `key`.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ControllerError> {
        info!("Reconciling NeutronSriovAgent {}", key);

        let Some(mut agent) = self.store.get_agent(key).await? else {
            // Owned objects are garbage collected through their owner references
            debug!("NeutronSriovAgent {} not found, assuming it was deleted", key);
            return Ok(ReconcileOutcome::Done);
        };

        let common_key = ObjectKey::new(&key.namespace, &self.common_config_name);
        debug!("Creating host entries from ConfigMap {}", common_key);
        let common_config = self
            .store
            .get_config_map(&common_key)
            .await?
            .ok_or_else(|| ControllerError::MissingDependency {
                kind: "ConfigMap",
                key: common_key.to_string(),
            })?;
        let host_aliases = hosts::host_aliases(&common_config);
        debug!("Derived {} host aliases for {}", host_aliases.len(), key);

        let owner = agent
            .controller_owner_ref(&())
            .ok_or_else(|| ControllerError::MissingOwnerIdentity(key.to_string()))?;

        let desired_config_map = builder::with_owner(builder::config_map(&agent, &key.name), owner.clone());
        let config_map = self.reconcile_config_map(desired_config_map).await?;
        let config_hash = fingerprint(&config_map)?;
        debug!("ConfigMap {} fingerprint: {}", key, config_hash);

        let desired_daemon_set = builder::daemon_set(&agent, &key.name, &config_hash, host_aliases);
        let daemon_set_hash = fingerprint(&desired_daemon_set)?;
        debug!("DaemonSet {} fingerprint: {}", key, daemon_set_hash);
        let desired_daemon_set = builder::with_owner(desired_daemon_set, owner);

        self.reconcile_daemon_set(&mut agent, desired_daemon_set, &daemon_set_hash)
            .await
    }
}
