//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! client, object store, reconciler and watcher together.

use crate::config::Settings;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::store::KubeStore;
use crate::watcher::{Context, Watcher};
use crds::NeutronSriovAgent;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for NeutronSriovAgent management.
pub struct Controller {
    agent_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(settings: Settings) -> Result<Self, ControllerError> {
        info!("Initializing NeutronSriovAgent Controller");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        // Create API clients
        let (agent_api, config_map_api, daemon_set_api) = match settings.namespace.as_deref() {
            Some(ns) => (
                Api::<NeutronSriovAgent>::namespaced(kube_client.clone(), ns),
                Api::<ConfigMap>::namespaced(kube_client.clone(), ns),
                Api::<DaemonSet>::namespaced(kube_client.clone(), ns),
            ),
            None => (
                Api::<NeutronSriovAgent>::all(kube_client.clone()),
                Api::<ConfigMap>::all(kube_client.clone()),
                Api::<DaemonSet>::all(kube_client.clone()),
            ),
        };

        let reconciler = Reconciler::new(KubeStore::new(kube_client), &settings);
        let context = Arc::new(Context::new(reconciler, &settings));
        let watcher = Watcher::new(context, agent_api, config_map_api, daemon_set_api, &settings);

        // Start watcher in a background task
        let agent_watcher = tokio::spawn(async move { watcher.watch_agents().await });

        Ok(Self { agent_watcher })
    }

    /// Runs the controller until shutdown.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("NeutronSriovAgent Controller running");

        self.agent_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("NeutronSriovAgent watcher panicked: {}", e)))?
            .map_err(|e| ControllerError::Watch(format!("NeutronSriovAgent watcher error: {}", e)))?;

        info!("NeutronSriovAgent Controller stopped");
        Ok(())
    }
}
