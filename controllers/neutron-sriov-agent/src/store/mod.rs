//! Object store gateway.
//!
//! Abstracts the Kubernetes API calls the reconciler makes so the reconcile
//! pass can be unit tested against an in-memory store. Every operation is
//! addressed by namespace and name. Reads report absence as `Ok(None)`;
//! retries are left to the caller.

mod kube_store;
#[cfg(test)]
pub mod mock;

pub use kube_store::KubeStore;

use crds::NeutronSriovAgent;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::fmt;
use thiserror::Error;

/// Errors returned by the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Object to write lacks a name or namespace
    #[error("object is missing {0}")]
    MissingIdentity(&'static str),

    /// Request body could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Namespace and name of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Namespace
    pub namespace: String,
    /// Name
    pub name: String,
}

impl ObjectKey {
    /// Creates a key from namespace and name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Reads the key of a namespaced object from its metadata.
    pub fn from_meta(meta: &ObjectMeta) -> Result<Self, StoreError> {
        let name = meta.name.as_deref().ok_or(StoreError::MissingIdentity("metadata.name"))?;
        let namespace = meta
            .namespace
            .as_deref()
            .ok_or(StoreError::MissingIdentity("metadata.namespace"))?;
        Ok(Self::new(namespace, name))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Operations the reconciler needs from the cluster.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches a NeutronSriovAgent.
    async fn get_agent(&self, key: &ObjectKey) -> Result<Option<NeutronSriovAgent>, StoreError>;

    /// Writes the status subresource of a NeutronSriovAgent.
    ///
    /// The write is conditional on the agent's `resourceVersion` when present.
    async fn update_agent_status(&self, agent: &NeutronSriovAgent) -> Result<(), StoreError>;

    /// Fetches a ConfigMap.
    async fn get_config_map(&self, key: &ObjectKey) -> Result<Option<ConfigMap>, StoreError>;

    /// Creates a ConfigMap. An existing object of the same name counts as success.
    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<(), StoreError>;

    /// Fetches a DaemonSet.
    async fn get_daemon_set(&self, key: &ObjectKey) -> Result<Option<DaemonSet>, StoreError>;

    /// Creates a DaemonSet. An existing object of the same name counts as success.
    async fn create_daemon_set(&self, daemon_set: &DaemonSet) -> Result<(), StoreError>;

    /// Replaces a DaemonSet.
    async fn update_daemon_set(&self, daemon_set: &DaemonSet) -> Result<(), StoreError>;
}
