//! In-memory object store for unit testing
//!
//! Stores objects in maps keyed by namespace/name, records every write, and
//! can be told to fail the next call of a given operation.

use super::{ObjectKey, ObjectStore, StoreError};
use crds::NeutronSriovAgent;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Resource;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Store operations, used to record writes and inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetAgent,
    UpdateAgentStatus,
    GetConfigMap,
    CreateConfigMap,
    GetDaemonSet,
    CreateDaemonSet,
    UpdateDaemonSet,
}

/// Mock object store for testing
#[derive(Clone, Default)]
pub struct MockStore {
    agents: Arc<Mutex<HashMap<ObjectKey, NeutronSriovAgent>>>,
    config_maps: Arc<Mutex<HashMap<ObjectKey, ConfigMap>>>,
    daemon_sets: Arc<Mutex<HashMap<ObjectKey, DaemonSet>>>,
    writes: Arc<Mutex<Vec<(Operation, ObjectKey)>>>,
    failures: Arc<Mutex<HashSet<Operation>>>,
    next_resource_version: Arc<Mutex<u64>>,
}

impl MockStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent to the mock store (for test setup)
    pub fn add_agent(&self, mut agent: NeutronSriovAgent) {
        agent.metadata.resource_version = Some(self.bump_resource_version());
        let key = key_of(&agent);
        self.agents.lock().unwrap().insert(key, agent);
    }

    /// Add a ConfigMap to the mock store (for test setup)
    pub fn add_config_map(&self, config_map: ConfigMap) {
        let key = key_of(&config_map);
        self.config_maps.lock().unwrap().insert(key, config_map);
    }

    /// Add a DaemonSet to the mock store (for test setup)
    pub fn add_daemon_set(&self, daemon_set: DaemonSet) {
        let key = key_of(&daemon_set);
        self.daemon_sets.lock().unwrap().insert(key, daemon_set);
    }

    /// Remove an agent, as if it was deleted
    pub fn remove_agent(&self, key: &ObjectKey) {
        self.agents.lock().unwrap().remove(key);
    }

    /// Current stored agent
    pub fn agent(&self, key: &ObjectKey) -> Option<NeutronSriovAgent> {
        self.agents.lock().unwrap().get(key).cloned()
    }

    /// Current stored ConfigMap
    pub fn config_map(&self, key: &ObjectKey) -> Option<ConfigMap> {
        self.config_maps.lock().unwrap().get(key).cloned()
    }

    /// Current stored DaemonSet
    pub fn daemon_set(&self, key: &ObjectKey) -> Option<DaemonSet> {
        self.daemon_sets.lock().unwrap().get(key).cloned()
    }

    /// Write operations performed so far, in order
    pub fn writes(&self) -> Vec<(Operation, ObjectKey)> {
        self.writes.lock().unwrap().clone()
    }

    /// Forget recorded writes
    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    /// Make the next call of `operation` fail
    pub fn fail_next(&self, operation: Operation) {
        self.failures.lock().unwrap().insert(operation);
    }

    fn check(&self, operation: Operation) -> Result<(), StoreError> {
        if self.failures.lock().unwrap().remove(&operation) {
            return Err(StoreError::Kube(kube::Error::Service(
                format!("injected failure for {operation:?}").into(),
            )));
        }
        Ok(())
    }

    fn record(&self, operation: Operation, key: ObjectKey) {
        self.writes.lock().unwrap().push((operation, key));
    }

    fn bump_resource_version(&self) -> String {
        let mut next = self.next_resource_version.lock().unwrap();
        *next += 1;
        next.to_string()
    }
}

fn key_of<K: Resource>(object: &K) -> ObjectKey {
    ObjectKey::from_meta(object.meta()).unwrap()
}

#[async_trait::async_trait]
impl ObjectStore for MockStore {
    async fn get_agent(&self, key: &ObjectKey) -> Result<Option<NeutronSriovAgent>, StoreError> {
        self.check(Operation::GetAgent)?;
        Ok(self.agent(key))
    }

    async fn update_agent_status(&self, agent: &NeutronSriovAgent) -> Result<(), StoreError> {
        self.check(Operation::UpdateAgentStatus)?;
        let key = ObjectKey::from_meta(&agent.metadata)?;
        let resource_version = self.bump_resource_version();
        let mut agents = self.agents.lock().unwrap();
        let Some(stored) = agents.get_mut(&key) else {
            return Err(StoreError::Kube(kube::Error::Service(format!("{key} not found").into())));
        };
        if agent.metadata.resource_version.is_some()
            && agent.metadata.resource_version != stored.metadata.resource_version
        {
            return Err(StoreError::Kube(kube::Error::Service(
                format!("conflict updating {key}").into(),
            )));
        }
        stored.status = agent.status.clone();
        stored.metadata.resource_version = Some(resource_version);
        drop(agents);
        self.record(Operation::UpdateAgentStatus, key);
        Ok(())
    }

    async fn get_config_map(&self, key: &ObjectKey) -> Result<Option<ConfigMap>, StoreError> {
        self.check(Operation::GetConfigMap)?;
        Ok(self.config_map(key))
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<(), StoreError> {
        self.check(Operation::CreateConfigMap)?;
        let key = ObjectKey::from_meta(&config_map.metadata)?;
        self.config_maps
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_insert_with(|| config_map.clone());
        self.record(Operation::CreateConfigMap, key);
        Ok(())
    }

    async fn get_daemon_set(&self, key: &ObjectKey) -> Result<Option<DaemonSet>, StoreError> {
        self.check(Operation::GetDaemonSet)?;
        Ok(self.daemon_set(key))
    }

    async fn create_daemon_set(&self, daemon_set: &DaemonSet) -> Result<(), StoreError> {
        self.check(Operation::CreateDaemonSet)?;
        let key = ObjectKey::from_meta(&daemon_set.metadata)?;
        let mut stored = daemon_set.clone();
        stored.metadata.resource_version = Some(self.bump_resource_version());
        self.daemon_sets.lock().unwrap().entry(key.clone()).or_insert(stored);
        self.record(Operation::CreateDaemonSet, key);
        Ok(())
    }

    async fn update_daemon_set(&self, daemon_set: &DaemonSet) -> Result<(), StoreError> {
        self.check(Operation::UpdateDaemonSet)?;
        let key = ObjectKey::from_meta(&daemon_set.metadata)?;
        let mut stored = daemon_set.clone();
        stored.metadata.resource_version = Some(self.bump_resource_version());
        self.daemon_sets.lock().unwrap().insert(key.clone(), stored);
        self.record(Operation::UpdateDaemonSet, key);
        Ok(())
    }
}
