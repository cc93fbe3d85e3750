//! Conversion of the workload descriptors into Kubernetes objects

use std::collections::BTreeMap;

use stackable_operator::{
    k8s_openapi::{
        api::{
            apps::v1::{Deployment, DeploymentSpec, StatefulSet, StatefulSetSpec},
            core::v1::{
                Capabilities, Container, ContainerPort, EmptyDirVolumeSource, EnvVar,
                PersistentVolumeClaim, PersistentVolumeClaimSpec, PodSpec, PodTemplateSpec,
                ResourceRequirements, SecretVolumeSource, SecurityContext, Service, ServicePort,
                ServiceSpec, Volume, VolumeMount, VolumeResourceRequirements,
            },
        },
        apimachinery::pkg::{
            api::resource::Quantity, apis::meta::v1::LabelSelector, util::intstr::IntOrString,
        },
    },
    kube::api::ObjectMeta,
};

use super::descriptor::{
    ClaimTemplate, ComputeResources, ContainerDescriptor, ContainerPortDescriptor, InitStep,
    SecurityPosture, VolumeDescriptor, VolumeMountDescriptor, VolumeSource, WorkloadDescriptor,
};
use crate::framework::types::kubernetes::ResourceQuantity;

/// Annotation which selects the storage class of a persistent volume claim
pub const STORAGE_CLASS_ANNOTATION: &str = "volume.beta.kubernetes.io/storage-class";

/// Builds a StatefulSet with the given number of replicas from the per-unit template
pub fn build_stateful_set(
    descriptor: &WorkloadDescriptor,
    namespace: Option<&str>,
    replicas: i32,
) -> StatefulSet {
    let volume_claim_templates = descriptor
        .volume_claim_templates()
        .into_iter()
        .map(|claim_template| build_persistent_volume_claim(claim_template, namespace))
        .collect::<Vec<_>>();

    StatefulSet {
        metadata: object_meta(&descriptor.name, namespace, &descriptor.labels),
        spec: Some(StatefulSetSpec {
            replicas: Some(replicas),
            selector: label_selector(&descriptor.labels),
            service_name: descriptor.service_name().map(str::to_owned),
            template: build_pod_template(descriptor, namespace),
            volume_claim_templates: Some(volume_claim_templates).filter(|v| !v.is_empty()),
            ..StatefulSetSpec::default()
        }),
        status: None,
    }
}

/// Builds a Deployment which is scaled to the replicas of the descriptor
pub fn build_deployment(descriptor: &WorkloadDescriptor, namespace: Option<&str>) -> Deployment {
    Deployment {
        metadata: object_meta(&descriptor.name, namespace, &descriptor.labels),
        spec: Some(DeploymentSpec {
            replicas: Some(descriptor.replicas),
            selector: label_selector(&descriptor.labels),
            template: build_pod_template(descriptor, namespace),
            ..DeploymentSpec::default()
        }),
        status: None,
    }
}

/// Builds a Service which forwards the given ports to the selected pods
///
/// A headless service gets no cluster IP.
pub fn build_service(
    name: &str,
    namespace: Option<&str>,
    selector: &BTreeMap<String, String>,
    ports: &[ContainerPortDescriptor],
    headless: bool,
) -> Service {
    let ports = ports
        .iter()
        .map(|port| ServicePort {
            name: Some(port.name.clone()),
            port: port.port.into(),
            protocol: Some(port.protocol.to_string()),
            target_port: Some(IntOrString::String(port.name.clone())),
            ..ServicePort::default()
        })
        .collect();

    Service {
        metadata: object_meta(name, namespace, selector),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_owned()),
            cluster_ip: headless.then(|| "None".to_owned()),
            ports: Some(ports),
            selector: Some(selector.clone()),
            ..ServiceSpec::default()
        }),
        status: None,
    }
}

fn build_pod_template(descriptor: &WorkloadDescriptor, namespace: Option<&str>) -> PodTemplateSpec {
    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(descriptor.labels.clone()),
            namespace: namespace.map(str::to_owned),
            ..ObjectMeta::default()
        }),
        spec: Some(PodSpec {
            init_containers: Some(descriptor.init_steps.iter().map(build_init_container).collect()),
            containers: vec![build_container(&descriptor.container)],
            volumes: Some(descriptor.volumes.iter().map(build_volume).collect()),
            node_selector: Some(descriptor.node_selector.clone())
                .filter(|node_selector| !node_selector.is_empty()),
            ..PodSpec::default()
        }),
    }
}

fn build_init_container(init_step: &InitStep) -> Container {
    Container {
        name: init_step.name.clone(),
        image: Some(init_step.image.clone()),
        image_pull_policy: Some(init_step.image_pull_policy.to_string()),
        command: Some(init_step.command.clone()),
        security_context: Some(SecurityContext {
            privileged: Some(init_step.privileged),
            ..SecurityContext::default()
        }),
        ..Container::default()
    }
}

fn build_container(container: &ContainerDescriptor) -> Container {
    Container {
        name: container.name.clone(),
        image: Some(container.image.clone()),
        image_pull_policy: Some(container.image_pull_policy.to_string()),
        env: Some(Vec::<EnvVar>::from(&container.env)),
        ports: Some(
            container
                .ports
                .iter()
                .map(|port| ContainerPort {
                    name: Some(port.name.clone()),
                    container_port: port.port.into(),
                    protocol: Some(port.protocol.to_string()),
                    ..ContainerPort::default()
                })
                .collect(),
        ),
        volume_mounts: Some(container.volume_mounts.iter().map(build_volume_mount).collect()),
        security_context: Some(build_security_context(&container.security)),
        resources: build_resource_requirements(&container.resources),
        ..Container::default()
    }
}

fn build_security_context(security: &SecurityPosture) -> SecurityContext {
    SecurityContext {
        privileged: Some(security.privileged),
        capabilities: Some(Capabilities {
            add: Some(security.added_capabilities.clone()),
            drop: None,
        }),
        ..SecurityContext::default()
    }
}

/// Returns `None` if no constraint is set at all
fn build_resource_requirements(resources: &ComputeResources) -> Option<ResourceRequirements> {
    let requests = quantities(&resources.cpu_request, &resources.memory_request);
    let limits = quantities(&resources.cpu_limit, &resources.memory_limit);

    if requests.is_none() && limits.is_none() {
        None
    } else {
        Some(ResourceRequirements {
            requests,
            limits,
            ..ResourceRequirements::default()
        })
    }
}

fn quantities(
    cpu: &Option<ResourceQuantity>,
    memory: &Option<ResourceQuantity>,
) -> Option<BTreeMap<String, Quantity>> {
    let quantities = [("cpu", cpu), ("memory", memory)]
        .into_iter()
        .filter_map(|(resource, quantity)| {
            quantity
                .as_ref()
                .map(|quantity| (resource.to_owned(), Quantity::from(quantity)))
        })
        .collect::<BTreeMap<_, _>>();

    Some(quantities).filter(|quantities| !quantities.is_empty())
}

fn build_volume_mount(volume_mount: &VolumeMountDescriptor) -> VolumeMount {
    VolumeMount {
        name: volume_mount.name.clone(),
        mount_path: volume_mount.mount_path.clone(),
        read_only: volume_mount.read_only.then_some(true),
        ..VolumeMount::default()
    }
}

fn build_volume(volume: &VolumeDescriptor) -> Volume {
    match &volume.source {
        VolumeSource::EmptyDir => Volume {
            name: volume.name.clone(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Volume::default()
        },
        VolumeSource::Secret { secret_name } => Volume {
            name: volume.name.clone(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(secret_name.clone()),
                ..SecretVolumeSource::default()
            }),
            ..Volume::default()
        },
    }
}

fn build_persistent_volume_claim(
    claim_template: &ClaimTemplate,
    namespace: Option<&str>,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(claim_template.name.clone()),
            namespace: namespace.map(str::to_owned),
            annotations: Some(BTreeMap::from([(
                STORAGE_CLASS_ANNOTATION.to_owned(),
                claim_template.storage_class.clone(),
            )])),
            ..ObjectMeta::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(
                claim_template
                    .access_modes
                    .iter()
                    .map(|access_mode| access_mode.to_string())
                    .collect(),
            ),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_owned(),
                    Quantity::from(&claim_template.storage),
                )])),
                ..VolumeResourceRequirements::default()
            }),
            ..PersistentVolumeClaimSpec::default()
        }),
        status: None,
    }
}

fn object_meta(
    name: &str,
    namespace: Option<&str>,
    labels: &BTreeMap<String, String>,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_owned()),
        namespace: namespace.map(str::to_owned),
        labels: Some(labels.clone()),
        ..ObjectMeta::default()
    }
}

fn label_selector(labels: &BTreeMap<String, String>) -> LabelSelector {
    LabelSelector {
        match_labels: Some(labels.clone()),
        ..LabelSelector::default()
    }
}
