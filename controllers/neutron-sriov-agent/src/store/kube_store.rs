//! Object store backed by the Kubernetes API server.

use super::{ObjectKey, ObjectStore, StoreError};
use crds::NeutronSriovAgent;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// HTTP status returned when creating an object that already exists.
const ALREADY_EXISTS: u16 = 409;

/// Object store using a `kube::Client`.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Creates a store using `client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get<K>(&self, key: &ObjectKey) -> Result<Option<K>, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        Ok(self.api::<K>(&key.namespace).get_opt(&key.name).await?)
    }

    async fn create<K>(&self, object: &K) -> Result<(), StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let key = ObjectKey::from_meta(object.meta())?;
        match self
            .api::<K>(&key.namespace)
            .create(&PostParams::default(), object)
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == ALREADY_EXISTS => {
                debug!("{} {} already exists, treating create as done", K::kind(&Default::default()), key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStore for KubeStore {
    async fn get_agent(&self, key: &ObjectKey) -> Result<Option<NeutronSriovAgent>, StoreError> {
        self.get(key).await
    }

    async fn update_agent_status(&self, agent: &NeutronSriovAgent) -> Result<(), StoreError> {
        let key = ObjectKey::from_meta(&agent.metadata)?;
        let mut status_patch = serde_json::json!({
            "status": serde_json::to_value(&agent.status)?,
        });
        // resourceVersion turns the merge patch into a conditional write
        if let Some(resource_version) = &agent.metadata.resource_version {
            status_patch["metadata"] = serde_json::json!({ "resourceVersion": resource_version });
        }
        self.api::<NeutronSriovAgent>(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await?;
        Ok(())
    }

    async fn get_config_map(&self, key: &ObjectKey) -> Result<Option<ConfigMap>, StoreError> {
        self.get(key).await
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<(), StoreError> {
        self.create(config_map).await
    }

    async fn get_daemon_set(&self, key: &ObjectKey) -> Result<Option<DaemonSet>, StoreError> {
        self.get(key).await
    }

    async fn create_daemon_set(&self, daemon_set: &DaemonSet) -> Result<(), StoreError> {
        self.create(daemon_set).await
    }

    async fn update_daemon_set(&self, daemon_set: &DaemonSet) -> Result<(), StoreError> {
        let key = ObjectKey::from_meta(&daemon_set.metadata)?;
        self.api::<DaemonSet>(&key.namespace)
            .replace(&key.name, &PostParams::default(), daemon_set)
            .await?;
        Ok(())
    }
}
