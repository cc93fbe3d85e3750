//! Orchestrator-neutral description of an Elasticsearch workload
//!
//! The builders in [`super::workload_builder`] produce these values. They carry everything the
//! workload needs but no orchestrator SDK types, so they can be compared in tests and converted
//! by [`super::kubernetes`] afterwards.

use std::collections::BTreeMap;

use strum::Display;

use crate::framework::{builder::pod::container::EnvVarSet, types::kubernetes::ResourceQuantity};

/// A TCP or UDP port number
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Port(pub u16);

impl std::fmt::Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Port> for i32 {
    fn from(value: Port) -> Self {
        value.0.into()
    }
}

/// Policy for pulling container images
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum PullPolicy {
    Always,
    IfNotPresent,
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Protocol {
    Tcp,
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum AccessMode {
    ReadWriteOnce,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContainerPortDescriptor {
    pub name: String,
    pub port: Port,
    pub protocol: Protocol,
}

/// Privileges of a container
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecurityPosture {
    pub privileged: bool,
    pub added_capabilities: Vec<String>,
}

/// CPU and memory requests and limits
///
/// An absent value means that the constraint is not set at all.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ComputeResources {
    pub cpu_request: Option<ResourceQuantity>,
    pub memory_request: Option<ResourceQuantity>,
    pub cpu_limit: Option<ResourceQuantity>,
    pub memory_limit: Option<ResourceQuantity>,
}

/// A step which runs to completion before the main container starts
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InitStep {
    pub name: String,
    pub image: String,
    pub image_pull_policy: PullPolicy,
    pub command: Vec<String>,
    pub privileged: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeMountDescriptor {
    pub name: String,
    pub mount_path: String,
    pub read_only: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum VolumeSource {
    EmptyDir,
    Secret { secret_name: String },
}

/// A volume which is defined directly in the pod
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumeDescriptor {
    pub name: String,
    pub source: VolumeSource,
}

/// Template for a persistent volume claim which is created per workload unit
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClaimTemplate {
    pub name: String,
    pub storage_class: String,
    pub access_modes: Vec<AccessMode>,
    pub storage: ResourceQuantity,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContainerDescriptor {
    pub name: String,
    pub image: String,
    pub image_pull_policy: PullPolicy,
    pub env: EnvVarSet,
    pub ports: Vec<ContainerPortDescriptor>,
    pub volume_mounts: Vec<VolumeMountDescriptor>,
    pub security: SecurityPosture,
    pub resources: ComputeResources,
}

/// Whether the workload units have a stable identity
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WorkloadKind {
    /// Units with stable identity and their own persistent volume claim
    Stateful {
        service_name: String,
        volume_claim_template: ClaimTemplate,
    },
    Stateless,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkloadDescriptor {
    pub name: String,
    pub kind: WorkloadKind,
    pub replicas: i32,
    pub labels: BTreeMap<String, String>,
    pub init_steps: Vec<InitStep>,
    pub container: ContainerDescriptor,
    pub volumes: Vec<VolumeDescriptor>,
    pub node_selector: BTreeMap<String, String>,
}

impl WorkloadDescriptor {
    pub fn with_resources(mut self, resources: ComputeResources) -> Self {
        self.container.resources = resources;
        self
    }

    pub fn with_node_selector(mut self, node_selector: BTreeMap<String, String>) -> Self {
        self.node_selector = node_selector;
        self
    }

    /// Name of the headless service which governs a stateful workload
    pub fn service_name(&self) -> Option<&str> {
        match &self.kind {
            WorkloadKind::Stateful { service_name, .. } => Some(service_name),
            WorkloadKind::Stateless => None,
        }
    }

    pub fn volume_claim_templates(&self) -> Vec<&ClaimTemplate> {
        match &self.kind {
            WorkloadKind::Stateful {
                volume_claim_template,
                ..
            } => vec![volume_claim_template],
            WorkloadKind::Stateless => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessMode, Port, Protocol, PullPolicy};

    #[test]
    fn test_port() {
        assert_eq!("9300", Port(9300).to_string());
        assert_eq!(65535, i32::from(Port(u16::MAX)));
    }

    #[test]
    fn test_enum_names() {
        assert_eq!("Always", PullPolicy::Always.to_string());
        assert_eq!("IfNotPresent", PullPolicy::IfNotPresent.to_string());
        assert_eq!("TCP", Protocol::Tcp.to_string());
        assert_eq!("ReadWriteOnce", AccessMode::ReadWriteOnce.to_string());
    }
}
