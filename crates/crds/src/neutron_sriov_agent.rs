//! NeutronSriovAgent CRD
//!
//! Declares where the Neutron SR-IOV NIC agent runs and which image it uses.
//! The controller turns one of these into a ConfigMap and a DaemonSet.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[kube(
    group = "neutron.openstack.org",
    version = "v1beta1",
    kind = "NeutronSriovAgent",
    namespaced,
    status = "NeutronSriovAgentStatus",
    printcolumn = r#"{"name":"Label", "type":"string", "jsonPath":".spec.label"}"#,
    printcolumn = r#"{"name":"Hash", "type":"string", "jsonPath":".status.daemonsetHash"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NeutronSriovAgentSpec {
    /// Value of the `daemon` node label selecting the nodes that run the agent
    #[serde(default)]
    pub label: String,

    /// Container image of the SR-IOV agent
    #[serde(default, alias = "neutronSriovImage")]
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NeutronSriovAgentStatus {
    /// Fingerprint of the last DaemonSet spec applied by the controller
    #[serde(default)]
    pub daemonset_hash: String,
}

impl NeutronSriovAgent {
    /// Returns the stored DaemonSet fingerprint, or an empty string before the first apply.
    pub fn daemonset_hash(&self) -> &str {
        self.status
            .as_ref()
            .map_or("", |status| status.daemonset_hash.as_str())
    }
}
