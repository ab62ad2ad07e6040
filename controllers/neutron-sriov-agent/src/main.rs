//! Neutron SR-IOV Agent Controller
//!
//! Converges `NeutronSriovAgent` resources into a configuration ConfigMap and
//! a node-local SR-IOV NIC agent DaemonSet, scheduled on every node labelled
//! `daemon=<spec.label>`.
//!
//! Drift is detected by fingerprinting the desired DaemonSet and comparing it
//! to the fingerprint recorded in the resource status.

mod backoff;
mod builder;
mod config;
mod controller;
mod error;
mod fingerprint;
mod hosts;
mod reconciler;
mod store;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::Settings;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting NeutronSriovAgent Controller");

    // Load configuration from environment variables
    let settings = Settings::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", settings.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Common config: {}", settings.common_config_name);
    info!("  Requeue after update: {}s", settings.requeue_after.as_secs());
    info!(
        "  Error backoff: {}s..{}s",
        settings.error_backoff_min.as_secs(),
        settings.error_backoff_max.as_secs()
    );

    // Initialize and run controller
    let controller = Controller::new(settings).await?;
    controller.run().await?;

    Ok(())
}
