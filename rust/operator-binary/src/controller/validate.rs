//! The validate step in the ElasticsearchCluster controller

use std::{collections::BTreeMap, str::FromStr};

use regex::Regex;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use strum::{EnumDiscriminants, IntoStaticStr};

use super::{
    DataNodeConfig, RoleConfig, ValidatedCluster,
    build::{
        MAX_STATEFUL_SET_NAME_LENGTH, descriptor::ComputeResources,
        workload_builder::DEFAULT_HEAP_SIZE_MB, zoned_data_workload_name,
    },
};
use crate::{
    constant,
    crd::{NodeRole, v1},
    framework::types::operator::{ClusterName, ZoneName},
};

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("failed to set the cluster name"))]
    ParseClusterName {
        source: crate::framework::macros::attributed_string_type::Error,
    },

    #[snafu(display("failed to set the zone {zone:?}"))]
    ParseZone {
        source: crate::framework::macros::attributed_string_type::Error,
        zone: String,
    },

    #[snafu(display(
        "the data workload name {workload_name:?} exceeds {max_length} characters, \
        use a shorter cluster name"
    ))]
    DataWorkloadNameTooLong {
        workload_name: String,
        max_length: usize,
    },

    #[snafu(display("the replicas of the {node_role} nodes must not be negative (got {replicas})"))]
    NegativeReplicas { node_role: NodeRole, replicas: i32 },

    #[snafu(display("data-volume-size must be set if data nodes are configured"))]
    MissingDataVolumeSize {},

    #[snafu(display(
        "storage.storage-class-provisioner must be set if data nodes are configured"
    ))]
    MissingStorageClassProvisioner {},

    #[snafu(display("snapshot.bucket-name must be set if the snapshot scheduler is enabled"))]
    MissingSnapshotBucket {},

    #[snafu(display(
        "snapshot.cron-schedule must consist of five or six fields or be a shorthand like \
        \"@daily\" or \"@every 2m\" (got {cron_schedule:?})"
    ))]
    InvalidCronSchedule { cron_schedule: String },
}

type Result<T, E = Error> = std::result::Result<T, E>;

pub const DEFAULT_IMAGE: &str = "upmcenterprises/docker-elasticsearch-kubernetes:5.3.1";

/// Predefined schedules which can be used instead of the cron fields
const CRON_SHORTHANDS: [&str; 7] = [
    "@yearly",
    "@annually",
    "@monthly",
    "@weekly",
    "@daily",
    "@midnight",
    "@hourly",
];

// Interval of "@every <duration>", e.g. "2m", "1h30m" or "1.5h"
constant!(CRON_INTERVAL: Regex = r"^([0-9]+(\.[0-9]+)?(ns|us|µs|ms|s|m|h))+$");

/// Validates the [`v1::ElasticsearchCluster`] and returns a [`ValidatedCluster`]
///
/// Defaults are resolved here, so that the build step does not have to deal with absent values
/// except for the node roles.
pub fn validate(cluster: &v1::ElasticsearchCluster) -> Result<ValidatedCluster> {
    let spec = &cluster.spec;

    let name = ClusterName::from_str(&spec.cluster_name).context(ParseClusterNameSnafu)?;

    let zones = spec
        .zones
        .iter()
        .map(|zone| ZoneName::from_str(zone).context(ParseZoneSnafu { zone }))
        .collect::<Result<Vec<_>>>()?;

    let image = spec
        .elastic_search_image
        .clone()
        .filter(|image| !image.is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE.to_owned());

    validate_snapshot(&spec.snapshot)?;

    let mut role_configs = BTreeMap::new();
    for (node_role, settings) in spec.node_specs.iter() {
        if node_role != NodeRole::Data {
            role_configs.insert(node_role, validate_role_config(&node_role, settings)?);
        }
    }

    let data = spec
        .node_specs
        .data
        .as_ref()
        .map(|settings| validate_data_node_config(spec, settings))
        .transpose()?;

    if data.is_some() {
        for zone in &zones {
            let workload_name = zoned_data_workload_name(&name, zone);
            ensure!(
                workload_name.len() <= MAX_STATEFUL_SET_NAME_LENGTH,
                DataWorkloadNameTooLongSnafu {
                    workload_name,
                    max_length: MAX_STATEFUL_SET_NAME_LENGTH
                }
            );
        }
    }

    Ok(ValidatedCluster {
        name,
        namespace: cluster.metadata.namespace.clone(),
        image,
        node_selector: spec.node_selector.clone(),
        zones,
        master: role_configs.remove(&NodeRole::Master),
        client: role_configs.remove(&NodeRole::Client),
        data,
        ingest: role_configs.remove(&NodeRole::Ingest),
    })
}

fn validate_role_config(
    node_role: &NodeRole,
    settings: &v1::NodeTypeSettings,
) -> Result<RoleConfig> {
    ensure!(
        settings.replicas >= 0,
        NegativeReplicasSnafu {
            node_role: *node_role,
            replicas: settings.replicas
        }
    );

    Ok(RoleConfig {
        replicas: settings.replicas,
        resources: ComputeResources {
            cpu_request: settings.cpu_request.clone(),
            memory_request: settings.memory_request.clone(),
            cpu_limit: settings.cpu_limit.clone(),
            memory_limit: settings.memory_limit.clone(),
        },
    })
}

fn validate_data_node_config(
    spec: &v1::ElasticsearchClusterSpec,
    settings: &v1::NodeTypeSettings,
) -> Result<DataNodeConfig> {
    let RoleConfig {
        replicas,
        resources,
    } = validate_role_config(&NodeRole::Data, settings)?;

    let volume_size = spec
        .data_volume_size
        .clone()
        .context(MissingDataVolumeSizeSnafu)?;

    let storage_class_provisioner = &spec.storage.storage_class_provisioner;
    ensure!(
        !storage_class_provisioner.is_empty(),
        MissingStorageClassProvisionerSnafu
    );

    // Both bounds must be given, otherwise the default applies to both.
    let (heap_min, heap_max) = match (settings.heap_min, settings.heap_max) {
        (Some(heap_min), Some(heap_max)) => (heap_min, heap_max),
        _ => (DEFAULT_HEAP_SIZE_MB, DEFAULT_HEAP_SIZE_MB),
    };

    Ok(DataNodeConfig {
        replicas,
        resources,
        heap_min,
        heap_max,
        volume_size,
        storage_class_provisioner: storage_class_provisioner.clone(),
    })
}

fn validate_snapshot(snapshot: &v1::Snapshot) -> Result<()> {
    if !snapshot.scheduler_enabled {
        return Ok(());
    }

    ensure!(!snapshot.bucket_name.is_empty(), MissingSnapshotBucketSnafu);

    ensure!(
        is_valid_cron_schedule(&snapshot.cron_schedule),
        InvalidCronScheduleSnafu {
            cron_schedule: &snapshot.cron_schedule
        }
    );

    Ok(())
}

/// Checks the shape of a cron schedule
///
/// Accepted are five or six whitespace-separated fields, one of [`CRON_SHORTHANDS`], or
/// `@every <duration>`. The fields themselves are not checked.
fn is_valid_cron_schedule(cron_schedule: &str) -> bool {
    let fields = cron_schedule.split_whitespace().collect::<Vec<_>>();
    match fields.as_slice() {
        [shorthand] if shorthand.starts_with('@') => CRON_SHORTHANDS.contains(shorthand),
        ["@every", interval] => CRON_INTERVAL.is_match(interval),
        fields => (5..=6).contains(&fields.len()) && !fields[0].starts_with('@'),
    }
}
