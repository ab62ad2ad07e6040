//! ConfigMap convergence.

use super::Reconciler;
use crate::error::ControllerError;
use crate::store::ObjectKey;
use k8s_openapi::api::core::v1::ConfigMap;
use tracing::info;

impl Reconciler {
    /// Creates the ConfigMap when absent and returns the effective object.
    ///
    /// An existing ConfigMap is never written; its content is merged into the
    /// desired object by [`preserve_observed_config`].
    pub(super) async fn reconcile_config_map(
        &self,
        desired: ConfigMap,
    ) -> Result<ConfigMap, ControllerError> {
        let key = ObjectKey::from_meta(&desired.metadata)?;

        match self.store.get_config_map(&key).await? {
            None => {
                info!("Creating ConfigMap {}", key);
                self.store.create_config_map(&desired).await?;
                Ok(desired)
            }
            Some(observed) => Ok(preserve_observed_config(desired, &observed)),
        }
    }
}

/// Merge policy for an existing ConfigMap: observed data wins.
///
/// The controller declares the ConfigMap but does not own its content, so
/// data seeded by another party is kept instead of being replaced with the
/// builder's empty payload.
pub fn preserve_observed_config(mut desired: ConfigMap, observed: &ConfigMap) -> ConfigMap {
    if desired.data != observed.data {
        info!(
            "ConfigMap {} content differs from desired, keeping observed data",
            observed.metadata.name.as_deref().unwrap_or("<unknown>")
        );
        desired.data = observed.data.clone();
    }
    if desired.binary_data != observed.binary_data {
        desired.binary_data = observed.binary_data.clone();
    }
    desired
}
