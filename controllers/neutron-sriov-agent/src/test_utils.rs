//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::config::Settings;
use crate::hosts::HOSTS_KEY;
use crate::reconciler::Reconciler;
use crate::store::mock::MockStore;
use crds::{NeutronSriovAgent, NeutronSriovAgentSpec};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Helper to create a test NeutronSriovAgent CRD
pub fn create_test_agent(name: &str, namespace: &str, label: &str, image: &str) -> NeutronSriovAgent {
    NeutronSriovAgent {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("{namespace}-{name}-uid")),
            ..Default::default()
        },
        spec: NeutronSriovAgentSpec {
            label: label.to_string(),
            image: image.to_string(),
        },
        status: None,
    }
}

/// Helper to create the companion ConfigMap with a hosts document
pub fn create_test_common_config(namespace: &str, hosts: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some("common-config".to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(HOSTS_KEY.to_string(), hosts.to_string())])),
        ..Default::default()
    }
}

/// Helper to create a reconciler over a fresh mock store
pub fn create_test_reconciler() -> (Reconciler, MockStore) {
    let store = MockStore::new();
    let reconciler = Reconciler::new(store.clone(), &Settings::default());
    (reconciler, store)
}
