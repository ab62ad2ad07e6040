//! Desired-state builder.
//!
//! Pure functions mapping a `NeutronSriovAgent` to the ConfigMap and DaemonSet
//! the controller keeps converged. Nothing here performs I/O; the reconciler
//! decides what to do with the returned objects.

use crds::NeutronSriovAgent;
use k8s_openapi::api::apps::v1::{DaemonSet, DaemonSetSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, EmptyDirVolumeSource, EnvVar, EnvVarSource,
    HostAlias, HostPathVolumeSource, ObjectFieldSelector, PodSpec, PodTemplateSpec,
    SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::Resource;
use std::collections::BTreeMap;

/// ConfigMap key of the main Neutron configuration file.
pub const NEUTRON_CONF_KEY: &str = "neutron.conf";
/// ConfigMap key of the SR-IOV agent plugin configuration file.
pub const SRIOV_AGENT_INI_KEY: &str = "sriov_agent.ini";
/// Environment variable carrying the configuration fingerprint.
pub const CONFIG_HASH_ENV: &str = "CONFIG_HASH";

/// Pod label key shared by the DaemonSet selector and pod template.
const DAEMONSET_LABEL: &str = "daemonset";
/// Node label key matched against `spec.label`.
const NODE_SELECTOR_KEY: &str = "daemon";

const INIT_CONTAINER_NAME: &str = "sriov-agent-config-init";
const AGENT_CONTAINER_NAME: &str = "neutron-sriov-agent";

const MACHINE_ID_VOLUME: &str = "etc-machine-id";
const RUN_VOLUME: &str = "run-volume";
const LIB_MODULES_VOLUME: &str = "lib-modules-volume";
const RUN_OPENVSWITCH_VOLUME: &str = "run-openvswitch-volume";
const LOG_VOLUME: &str = "neutron-log-volume";
const SCRATCH_VOLUME: &str = "neutron-config-vol";

const SCRATCH_MOUNT_PATH: &str = "/tmp/neutron";
const NEUTRON_CONF_PATH: &str = "/etc/neutron/neutron.conf";
const SRIOV_AGENT_INI_PATH: &str = "/etc/neutron/plugins/ml2/sriov_agent.ini";

/// Resolves the tenant address of the controller and stages the mounted
/// configuration into the scratch volume for the agent container.
const INIT_SCRIPT: &str = "export CTRL_IP_TENANT=$(getent hosts controller-0.tenant | awk '{print $1}') \
&& export POD_IP_TENANT=$(ip route get $CTRL_IP_TENANT | awk '{print $5}') \
&& cp -a /etc/neutron/* /tmp/neutron/";

/// Builds the desired ConfigMap.
///
/// Only identity is declared here; `data` is left empty. The content is owned
/// by whoever seeded the ConfigMap, see the reconciler's preservation policy.
pub fn config_map(agent: &NeutronSriovAgent, name: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: agent.metadata.namespace.clone(),
            ..Default::default()
        },
        data: None,
        ..Default::default()
    }
}

/// Builds the desired SR-IOV agent DaemonSet.
///
/// `config_hash` is exposed to the agent container as `CONFIG_HASH`, so a new
/// configuration changes the pod template and the DaemonSet rolls its pods.
/// `label` and `image` are copied verbatim, even when empty.
pub fn daemon_set(
    agent: &NeutronSriovAgent,
    config_map_name: &str,
    config_hash: &str,
    host_aliases: Vec<HostAlias>,
) -> DaemonSet {
    let agent_name = agent.metadata.name.as_deref().unwrap_or_default();
    let pod_labels = BTreeMap::from([(
        DAEMONSET_LABEL.to_string(),
        format!("{agent_name}-daemonset"),
    )]);

    DaemonSet {
        metadata: ObjectMeta {
            name: Some(config_map_name.to_string()),
            namespace: agent.metadata.namespace.clone(),
            ..Default::default()
        },
        spec: Some(DaemonSetSpec {
            selector: LabelSelector {
                match_labels: Some(pod_labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(pod_labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    node_selector: Some(BTreeMap::from([(
                        NODE_SELECTOR_KEY.to_string(),
                        agent.spec.label.clone(),
                    )])),
                    host_network: Some(true),
                    host_pid: Some(true),
                    dns_policy: Some("ClusterFirstWithHostNet".to_string()),
                    host_aliases: Some(host_aliases),
                    init_containers: Some(vec![init_container(agent, config_map_name)]),
                    containers: vec![agent_container(agent, config_map_name, config_hash)],
                    volumes: Some(volumes(config_map_name)),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Returns `object` owned and controlled by `owner`.
pub fn with_owner<K: Resource>(mut object: K, owner: OwnerReference) -> K {
    object.meta_mut().owner_references = Some(vec![owner]);
    object
}

fn init_container(agent: &NeutronSriovAgent, config_map_name: &str) -> Container {
    Container {
        name: INIT_CONTAINER_NAME.to_string(),
        image: Some(agent.spec.image.clone()),
        security_context: Some(privileged()),
        command: Some(vec![
            "/bin/bash".to_string(),
            "-c".to_string(),
            INIT_SCRIPT.to_string(),
        ]),
        env: Some(vec![EnvVar {
            name: "MY_POD_IP".to_string(),
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: "status.podIP".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]),
        volume_mounts: Some(vec![
            config_mount(config_map_name, NEUTRON_CONF_PATH, NEUTRON_CONF_KEY),
            config_mount(config_map_name, SRIOV_AGENT_INI_PATH, SRIOV_AGENT_INI_KEY),
            mount(MACHINE_ID_VOLUME, "/etc/machine-id", true, None),
            mount(SCRATCH_VOLUME, SCRATCH_MOUNT_PATH, false, None),
        ]),
        ..Default::default()
    }
}

fn agent_container(agent: &NeutronSriovAgent, config_map_name: &str, config_hash: &str) -> Container {
    Container {
        name: AGENT_CONTAINER_NAME.to_string(),
        image: Some(agent.spec.image.clone()),
        command: Some(vec![
            "neutron-sriov-nic-agent".to_string(),
            "--config-file".to_string(),
            NEUTRON_CONF_PATH.to_string(),
            "--config-file".to_string(),
            SRIOV_AGENT_INI_PATH.to_string(),
        ]),
        security_context: Some(privileged()),
        env: Some(vec![EnvVar {
            name: CONFIG_HASH_ENV.to_string(),
            value: Some(config_hash.to_string()),
            ..Default::default()
        }]),
        volume_mounts: Some(vec![
            config_mount(config_map_name, NEUTRON_CONF_PATH, NEUTRON_CONF_KEY),
            config_mount(config_map_name, SRIOV_AGENT_INI_PATH, SRIOV_AGENT_INI_KEY),
            mount(MACHINE_ID_VOLUME, "/etc/machine-id", true, None),
            mount(LIB_MODULES_VOLUME, "/lib/modules", false, Some("HostToContainer")),
            mount(RUN_OPENVSWITCH_VOLUME, "/var/run/openvswitch", false, Some("Bidirectional")),
            mount(LOG_VOLUME, "/var/log/neutron", false, Some("Bidirectional")),
            mount(SCRATCH_VOLUME, SCRATCH_MOUNT_PATH, false, None),
        ]),
        ..Default::default()
    }
}

fn volumes(config_map_name: &str) -> Vec<Volume> {
    vec![
        host_path_volume(MACHINE_ID_VOLUME, "/etc/machine-id", None),
        host_path_volume(RUN_VOLUME, "/run", None),
        host_path_volume(LIB_MODULES_VOLUME, "/lib/modules", None),
        host_path_volume(RUN_OPENVSWITCH_VOLUME, "/var/run/openvswitch", Some("DirectoryOrCreate")),
        host_path_volume(LOG_VOLUME, "/var/log/containers/neutron", Some("DirectoryOrCreate")),
        Volume {
            name: config_map_name.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map_name.to_string().into(),
                default_mode: Some(0o644),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: SCRATCH_VOLUME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        },
    ]
}

fn host_path_volume(name: &str, path: &str, type_: Option<&str>) -> Volume {
    Volume {
        name: name.to_string(),
        host_path: Some(HostPathVolumeSource {
            path: path.to_string(),
            type_: type_.map(str::to_string),
        }),
        ..Default::default()
    }
}

fn config_mount(config_map_name: &str, mount_path: &str, key: &str) -> VolumeMount {
    VolumeMount {
        name: config_map_name.to_string(),
        mount_path: mount_path.to_string(),
        sub_path: Some(key.to_string()),
        read_only: Some(true),
        ..Default::default()
    }
}

fn mount(name: &str, mount_path: &str, read_only: bool, propagation: Option<&str>) -> VolumeMount {
    VolumeMount {
        name: name.to_string(),
        mount_path: mount_path.to_string(),
        read_only: Some(read_only),
        mount_propagation: propagation.map(str::to_string),
        ..Default::default()
    }
}

fn privileged() -> SecurityContext {
    SecurityContext {
        privileged: Some(true),
        ..Default::default()
    }
}
