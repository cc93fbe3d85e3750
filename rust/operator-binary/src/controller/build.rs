//! The build step in the ElasticsearchCluster controller

use snafu::{OptionExt, Snafu};
use stackable_operator::k8s_openapi::api::{
    apps::v1::{Deployment, StatefulSet},
    core::v1::Service,
};
use strum::{EnumDiscriminants, IntoStaticStr};

use super::ValidatedCluster;
use crate::{
    crd::NodeRole,
    framework::types::operator::{ClusterName, ZoneName},
};

pub mod descriptor;
pub mod kubernetes;
pub mod workload_builder;

use descriptor::{ContainerPortDescriptor, Protocol, WorkloadDescriptor, WorkloadKind};
use workload_builder::{
    DATA_SERVICE_NAME, HTTP_PORT, HTTP_PORT_NAME, TRANSPORT_PORT, TRANSPORT_PORT_NAME,
    data_node_workload, node_workload, role_selector,
};

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("the {node_role} nodes are not configured"))]
    MissingRoleConfiguration { node_role: NodeRole },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// Service which is used by the nodes to discover the master nodes
pub const DISCOVERY_SERVICE_NAME: &str = "elasticsearch-discovery";
/// Service which exposes the HTTP API of the client nodes
pub const CLIENT_SERVICE_NAME: &str = "elasticsearch";

/// Maximum length of a StatefulSet name
///
/// The StatefulSet controller appends a hash of up to 11 characters to the name in the
/// `controller-revision-hash` label, whose value must not exceed 63 characters.
pub const MAX_STATEFUL_SET_NAME_LENGTH: usize = 52;

/// The Kubernetes objects of an ElasticsearchCluster
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KubernetesResources {
    pub stateful_sets: Vec<StatefulSet>,
    pub deployments: Vec<Deployment>,
    pub services: Vec<Service>,
}

/// A workload descriptor and the number of units which the caller deploys of it
#[derive(Clone, Debug, PartialEq)]
pub struct RoleWorkload {
    pub descriptor: WorkloadDescriptor,
    pub replicas: i32,
}

/// Builds the workloads and services of all configured node roles
pub fn build(cluster: &ValidatedCluster) -> Result<KubernetesResources> {
    let namespace = cluster.namespace.as_deref();
    let mut resources = KubernetesResources::default();

    for node_role in configured_roles(cluster) {
        for role_workload in role_workloads(cluster, &node_role)? {
            let descriptor = &role_workload.descriptor;

            match descriptor.kind {
                WorkloadKind::Stateful { .. } => resources.stateful_sets.push(
                    kubernetes::build_stateful_set(descriptor, namespace, role_workload.replicas),
                ),
                WorkloadKind::Stateless => resources
                    .deployments
                    .push(kubernetes::build_deployment(descriptor, namespace)),
            }

            tracing::debug!(
                workload = descriptor.name.as_str(),
                %node_role,
                replicas = role_workload.replicas,
                "Built workload"
            );
        }

        if let Some((service_name, port, headless)) = role_service(&node_role) {
            resources.services.push(kubernetes::build_service(
                service_name,
                namespace,
                &role_selector(&node_role),
                &[port],
                headless,
            ));
        }
    }

    Ok(resources)
}

/// Returns the configured roles in the order master, client, data, ingest
pub fn configured_roles(cluster: &ValidatedCluster) -> Vec<NodeRole> {
    [
        (NodeRole::Master, cluster.master.is_some()),
        (NodeRole::Client, cluster.client.is_some()),
        (NodeRole::Data, cluster.data.is_some()),
        (NodeRole::Ingest, cluster.ingest.is_some()),
    ]
    .into_iter()
    .filter_map(|(node_role, configured)| configured.then_some(node_role))
    .collect()
}

/// Builds the workload descriptors of the given role
///
/// Data nodes get one workload per zone, or a single one if no zones are set. All other roles
/// get exactly one workload.
pub fn role_workloads(
    cluster: &ValidatedCluster,
    node_role: &NodeRole,
) -> Result<Vec<RoleWorkload>> {
    let cluster_name: &str = cluster.name.as_ref();

    let (role_config, is_master, http_enabled) = match node_role {
        NodeRole::Data => return data_node_workloads(cluster),
        NodeRole::Master => (&cluster.master, true, false),
        NodeRole::Client => (&cluster.client, false, true),
        NodeRole::Ingest => (&cluster.ingest, false, false),
    };
    let role_config = role_config.as_ref().context(MissingRoleConfigurationSnafu {
        node_role: *node_role,
    })?;

    let descriptor = node_workload(
        &cluster.image,
        &format!("es-{node_role}-{cluster_name}"),
        node_role,
        is_master,
        http_enabled,
        cluster_name,
        role_config.replicas,
    )
    .with_resources(role_config.resources.clone())
    .with_node_selector(cluster.node_selector.clone());

    Ok(vec![RoleWorkload {
        replicas: descriptor.replicas,
        descriptor,
    }])
}

fn data_node_workloads(cluster: &ValidatedCluster) -> Result<Vec<RoleWorkload>> {
    let data = cluster
        .data
        .as_ref()
        .context(MissingRoleConfigurationSnafu {
            node_role: NodeRole::Data,
        })?;
    let cluster_name: &str = cluster.name.as_ref();

    // Without zones, there is one workload which uses the configured storage class provisioner.
    // With zones, the storage classes named after the zones must exist beforehand.
    let units = if cluster.zones.is_empty() {
        vec![(
            format!("es-data-{cluster_name}"),
            data.storage_class_provisioner.clone(),
            data.replicas,
        )]
    } else {
        cluster
            .zones
            .iter()
            .zip(spread_replicas(data.replicas, cluster.zones.len()))
            .map(|(zone, replicas)| {
                (
                    zoned_data_workload_name(&cluster.name, zone),
                    format!("{cluster_name}-{zone}"),
                    replicas,
                )
            })
            .collect()
    };

    Ok(units
        .into_iter()
        .map(|(workload_name, storage_class, replicas)| RoleWorkload {
            descriptor: data_node_workload(
                &cluster.image,
                cluster_name,
                &workload_name,
                &storage_class,
                data.heap_min,
                data.heap_max,
                &data.volume_size,
            )
            .with_resources(data.resources.clone())
            .with_node_selector(cluster.node_selector.clone()),
            replicas,
        })
        .collect())
}

/// Name of the data StatefulSet in the given zone
pub fn zoned_data_workload_name(cluster_name: &ClusterName, zone: &ZoneName) -> String {
    format!("es-data-{cluster_name}-{zone}")
}

/// Distributes the replicas over the given number of zones
///
/// The first `replicas % zones` zones get one replica more than the others.
pub fn spread_replicas(replicas: i32, zones: usize) -> Vec<i32> {
    let zones_i32 = i32::try_from(zones).unwrap_or(i32::MAX);
    if zones_i32 == 0 {
        return vec![];
    }

    let (quotient, remainder) = (replicas / zones_i32, replicas % zones_i32);

    (0..zones_i32)
        .map(|zone| quotient + i32::from(zone < remainder))
        .collect()
}

/// The name, port and headlessness of the service of a role
fn role_service(node_role: &NodeRole) -> Option<(&'static str, ContainerPortDescriptor, bool)> {
    let transport_port = ContainerPortDescriptor {
        name: TRANSPORT_PORT_NAME.to_owned(),
        port: TRANSPORT_PORT,
        protocol: Protocol::Tcp,
    };

    match node_role {
        NodeRole::Master => Some((DISCOVERY_SERVICE_NAME, transport_port, false)),
        NodeRole::Client => Some((
            CLIENT_SERVICE_NAME,
            ContainerPortDescriptor {
                name: HTTP_PORT_NAME.to_owned(),
                port: HTTP_PORT,
                protocol: Protocol::Tcp,
            },
            false,
        )),
        NodeRole::Data => Some((DATA_SERVICE_NAME, transport_port, true)),
        NodeRole::Ingest => None,
    }
}
