//! DaemonSet convergence.

use super::{ReconcileOutcome, Reconciler};
use crate::error::ControllerError;
use crate::fingerprint::FingerprintError;
use crate::store::ObjectKey;
use crds::NeutronSriovAgent;
use k8s_openapi::api::apps::v1::DaemonSet;
use serde_json::Value;
use tracing::info;

impl Reconciler {
    /// Creates or updates the DaemonSet and records its fingerprint.
    ///
    /// - absent: create, record the fingerprint, done
    /// - present, fingerprint recorded and spec intact: nothing to do
    /// - otherwise: replace the spec, record the fingerprint, and requeue so
    ///   the rollout is checked again once it had time to settle
    pub(super) async fn reconcile_daemon_set(
        &self,
        agent: &mut NeutronSriovAgent,
        desired: DaemonSet,
        hash: &str,
    ) -> Result<ReconcileOutcome, ControllerError> {
        let key = ObjectKey::from_meta(&desired.metadata)?;

        let Some(observed) = self.store.get_daemon_set(&key).await? else {
            info!("Creating a new DaemonSet {}", key);
            self.store.create_daemon_set(&desired).await?;
            self.set_daemonset_hash(agent, hash).await?;
            return Ok(ReconcileOutcome::Done);
        };

        let hash_changed = agent.daemonset_hash() != hash;
        let drifted = !spec_covers(&observed, &desired)?;
        if !hash_changed && !drifted {
            info!("Skip reconcile: DaemonSet {} is up to date", key);
            return Ok(ReconcileOutcome::Done);
        }

        if hash_changed {
            info!("DaemonSet {} spec changed, updating", key);
        } else {
            info!("DaemonSet {} was modified outside the controller, restoring", key);
        }
        let mut updated = observed;
        updated.spec = desired.spec;
        updated.metadata.owner_references = desired.metadata.owner_references;
        self.store.update_daemon_set(&updated).await?;
        self.set_daemonset_hash(agent, hash).await?;

        Ok(ReconcileOutcome::RequeueAfter(self.requeue_after))
    }
}

/// Whether every field the controller sets in `desired.spec` still holds in `observed.spec`.
///
/// Fields the API server adds through defaulting are ignored.
fn spec_covers(observed: &DaemonSet, desired: &DaemonSet) -> Result<bool, FingerprintError> {
    let observed = serde_json::to_value(&observed.spec)?;
    let desired = serde_json::to_value(&desired.spec)?;
    Ok(covers(&observed, &desired))
}

fn covers(observed: &Value, desired: &Value) -> bool {
    match (observed, desired) {
        (Value::Object(observed), Value::Object(desired)) => desired.iter().all(|(key, wanted)| {
            match observed.get(key) {
                Some(actual) => covers(actual, wanted),
                // Zero values are dropped on the wire
                None => is_zero(wanted),
            }
        }),
        (Value::Array(observed), Value::Array(desired)) => {
            observed.len() == desired.len()
                && observed.iter().zip(desired).all(|(actual, wanted)| covers(actual, wanted))
        }
        (Value::Null, wanted) => is_zero(wanted),
        (actual, wanted) => actual == wanted,
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.values().all(is_zero),
    }
}
