//! Builders for the workload descriptors of the Elasticsearch node roles
//!
//! Data nodes get a stateful per-unit template with a persistent volume claim. All other roles
//! get a stateless template which is already scaled to the requested number of replicas.

use std::collections::BTreeMap;

use super::descriptor::{
    AccessMode, ClaimTemplate, ComputeResources, ContainerDescriptor, ContainerPortDescriptor,
    InitStep, Port, Protocol, PullPolicy, SecurityPosture, VolumeDescriptor, VolumeMountDescriptor,
    VolumeSource, WorkloadDescriptor, WorkloadKind,
};
use crate::{
    constant,
    crd::NodeRole,
    framework::{
        builder::pod::container::{EnvVarName, EnvVarSet, FieldPath},
        types::kubernetes::ResourceQuantity,
    },
};

pub const TRANSPORT_PORT_NAME: &str = "transport";
pub const TRANSPORT_PORT: Port = Port(9300);
pub const HTTP_PORT_NAME: &str = "http";
pub const HTTP_PORT: Port = Port(9200);

/// Heap size in megabytes if the role profile does not set both bounds
pub const DEFAULT_HEAP_SIZE_MB: u32 = 1024;

pub const IMAGE_PULL_POLICY: PullPolicy = PullPolicy::Always;

pub const PRIVILEGED: bool = true;
// Elasticsearch locks its memory to avoid swapping
pub const ADDED_CAPABILITIES: &[&str] = &["IPC_LOCK"];

pub const INIT_STEP_NAME: &str = "sysctl";
pub const INIT_STEP_IMAGE: &str = "busybox";
pub const INIT_STEP_PULL_POLICY: PullPolicy = PullPolicy::IfNotPresent;
// Minimum required by the Elasticsearch bootstrap checks
pub const INIT_MAX_MAP_COUNT: u32 = 262144;

pub const DATA_VOLUME_NAME: &str = "es-data";
pub const SCRATCH_VOLUME_NAME: &str = "storage";
pub const DATA_MOUNT_PATH: &str = "/data";

pub const CERTS_VOLUME_NAME: &str = "es-certs";
pub const CERTS_SECRET_NAME: &str = "es-certs";
pub const CERTS_MOUNT_PATH: &str = "/elasticsearch/config/certs";

/// Headless service which governs the data node workloads
pub const DATA_SERVICE_NAME: &str = "es-data-svc";

pub const COMPONENT_LABEL_KEY: &str = "component";
pub const COMPONENT_LABEL_VALUE: &str = "elasticsearch";
pub const ROLE_LABEL_KEY: &str = "role";
pub const NAME_LABEL_KEY: &str = "name";

constant!(ENV_NAMESPACE: EnvVarName = "NAMESPACE");
constant!(ENV_CLUSTER_NAME: EnvVarName = "CLUSTER_NAME");
constant!(ENV_NODE_MASTER: EnvVarName = "NODE_MASTER");
constant!(ENV_NODE_DATA: EnvVarName = "NODE_DATA");
constant!(ENV_HTTP_ENABLE: EnvVarName = "HTTP_ENABLE");
constant!(ENV_ES_JAVA_OPTS: EnvVarName = "ES_JAVA_OPTS");

/// Builds the per-unit template of a data node workload
///
/// The replicas are always 1. The caller scales the resulting stateful workload to the number of
/// data nodes.
pub fn data_node_workload(
    base_image: &str,
    cluster_name: &str,
    workload_name: &str,
    storage_class: &str,
    heap_min: u32,
    heap_max: u32,
    volume_size: &ResourceQuantity,
) -> WorkloadDescriptor {
    let env = common_env(cluster_name)
        .with_value(&ENV_NODE_MASTER, false.to_string())
        .with_value(&ENV_HTTP_ENABLE, false.to_string())
        .with_value(&ENV_ES_JAVA_OPTS, heap_flags(heap_min, heap_max));

    WorkloadDescriptor {
        name: workload_name.to_owned(),
        kind: WorkloadKind::Stateful {
            service_name: DATA_SERVICE_NAME.to_owned(),
            volume_claim_template: ClaimTemplate {
                name: DATA_VOLUME_NAME.to_owned(),
                storage_class: storage_class.to_owned(),
                access_modes: vec![AccessMode::ReadWriteOnce],
                storage: volume_size.clone(),
            },
        },
        replicas: 1,
        labels: role_labels(&NodeRole::Data, workload_name),
        init_steps: vec![sysctl_init_step()],
        container: ContainerDescriptor {
            name: workload_name.to_owned(),
            image: base_image.to_owned(),
            image_pull_policy: IMAGE_PULL_POLICY,
            env,
            ports: vec![transport_port()],
            volume_mounts: vec![
                VolumeMountDescriptor {
                    name: DATA_VOLUME_NAME.to_owned(),
                    mount_path: DATA_MOUNT_PATH.to_owned(),
                    read_only: false,
                },
                certs_volume_mount(),
            ],
            security: security_posture(),
            resources: ComputeResources::default(),
        },
        volumes: vec![certs_volume()],
        node_selector: BTreeMap::new(),
    }
}

/// Builds a stateless workload for the master, client and ingest roles
///
/// The HTTP port is declared even if `http_enabled` is false.
pub fn node_workload(
    base_image: &str,
    deployment_name: &str,
    node_role: &NodeRole,
    is_master: bool,
    http_enabled: bool,
    cluster_name: &str,
    replicas: i32,
) -> WorkloadDescriptor {
    let env = common_env(cluster_name)
        .with_value(&ENV_NODE_MASTER, is_master.to_string())
        .with_value(&ENV_NODE_DATA, false.to_string())
        .with_value(&ENV_HTTP_ENABLE, http_enabled.to_string())
        .with_value(
            &ENV_ES_JAVA_OPTS,
            heap_flags(DEFAULT_HEAP_SIZE_MB, DEFAULT_HEAP_SIZE_MB),
        );

    WorkloadDescriptor {
        name: deployment_name.to_owned(),
        kind: WorkloadKind::Stateless,
        replicas,
        labels: role_labels(node_role, deployment_name),
        init_steps: vec![sysctl_init_step()],
        container: ContainerDescriptor {
            name: deployment_name.to_owned(),
            image: base_image.to_owned(),
            image_pull_policy: IMAGE_PULL_POLICY,
            env,
            ports: vec![transport_port(), http_port()],
            volume_mounts: vec![
                VolumeMountDescriptor {
                    name: SCRATCH_VOLUME_NAME.to_owned(),
                    mount_path: DATA_MOUNT_PATH.to_owned(),
                    read_only: false,
                },
                certs_volume_mount(),
            ],
            security: security_posture(),
            resources: ComputeResources::default(),
        },
        volumes: vec![
            VolumeDescriptor {
                name: SCRATCH_VOLUME_NAME.to_owned(),
                source: VolumeSource::EmptyDir,
            },
            certs_volume(),
        ],
        node_selector: BTreeMap::new(),
    }
}

/// JVM flags for the given heap bounds in megabytes
pub fn heap_flags(heap_min: u32, heap_max: u32) -> String {
    format!("-Xms{heap_min}m -Xmx{heap_max}m")
}

/// Labels which select the pods of a role
pub fn role_selector(node_role: &NodeRole) -> BTreeMap<String, String> {
    [
        (COMPONENT_LABEL_KEY, COMPONENT_LABEL_VALUE.to_owned()),
        (ROLE_LABEL_KEY, node_role.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value))
    .collect()
}

fn role_labels(node_role: &NodeRole, name: &str) -> BTreeMap<String, String> {
    let mut labels = role_selector(node_role);
    labels.insert(NAME_LABEL_KEY.to_owned(), name.to_owned());
    labels
}

fn common_env(cluster_name: &str) -> EnvVarSet {
    EnvVarSet::new()
        .with_field_path(&ENV_NAMESPACE, FieldPath::Namespace)
        .with_value(&ENV_CLUSTER_NAME, cluster_name)
}

fn sysctl_init_step() -> InitStep {
    InitStep {
        name: INIT_STEP_NAME.to_owned(),
        image: INIT_STEP_IMAGE.to_owned(),
        image_pull_policy: INIT_STEP_PULL_POLICY,
        command: vec![
            "sysctl".to_owned(),
            "-w".to_owned(),
            format!("vm.max_map_count={INIT_MAX_MAP_COUNT}"),
        ],
        privileged: PRIVILEGED,
    }
}

fn security_posture() -> SecurityPosture {
    SecurityPosture {
        privileged: PRIVILEGED,
        added_capabilities: ADDED_CAPABILITIES
            .iter()
            .map(|capability| capability.to_string())
            .collect(),
    }
}

fn transport_port() -> ContainerPortDescriptor {
    ContainerPortDescriptor {
        name: TRANSPORT_PORT_NAME.to_owned(),
        port: TRANSPORT_PORT,
        protocol: Protocol::Tcp,
    }
}

fn http_port() -> ContainerPortDescriptor {
    ContainerPortDescriptor {
        name: HTTP_PORT_NAME.to_owned(),
        port: HTTP_PORT,
        protocol: Protocol::Tcp,
    }
}

fn certs_volume() -> VolumeDescriptor {
    VolumeDescriptor {
        name: CERTS_VOLUME_NAME.to_owned(),
        source: VolumeSource::Secret {
            secret_name: CERTS_SECRET_NAME.to_owned(),
        },
    }
}

fn certs_volume_mount() -> VolumeMountDescriptor {
    VolumeMountDescriptor {
        name: CERTS_VOLUME_NAME.to_owned(),
        mount_path: CERTS_MOUNT_PATH.to_owned(),
        read_only: true,
    }
}
