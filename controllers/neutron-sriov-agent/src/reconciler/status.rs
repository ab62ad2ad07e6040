//! Status updates for NeutronSriovAgent resources.

use super::Reconciler;
use crate::error::ControllerError;
use crds::{NeutronSriovAgent, NeutronSriovAgentStatus};
use tracing::{debug, info};

impl Reconciler {
    /// Records `hash` as the applied DaemonSet fingerprint.
    ///
    /// Skips the write when the stored value already matches.
    pub(super) async fn set_daemonset_hash(
        &self,
        agent: &mut NeutronSriovAgent,
        hash: &str,
    ) -> Result<(), ControllerError> {
        if agent.daemonset_hash() == hash {
            debug!("DaemonSet hash already recorded, skipping status update");
            return Ok(());
        }

        agent
            .status
            .get_or_insert_with(NeutronSriovAgentStatus::default)
            .daemonset_hash = hash.to_string();
        self.store.update_agent_status(agent).await?;
        info!(
            "Updated NeutronSriovAgent {} status: daemonsetHash {}",
            agent.metadata.name.as_deref().unwrap_or("<unknown>"),
            hash
        );
        Ok(())
    }
}
