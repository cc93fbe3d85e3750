use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use stackable_operator::{
    kube::CustomResource,
    schemars::{self, JsonSchema},
    versioned::versioned,
};
use strum::{Display, EnumDiscriminants, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::framework::types::kubernetes::ResourceQuantity;

#[versioned(version(name = "v1"))]
pub mod versioned {

    /// An Elasticsearch cluster. The operator derives the StatefulSets for the data nodes and the
    /// Deployments for the master, client and ingest nodes from it.
    #[derive(Clone, CustomResource, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
    #[versioned(k8s(
        group = "enterprises.upmc.com",
        kind = "ElasticsearchCluster",
        plural = "elasticsearchclusters",
        shortname = "es",
        namespaced,
        crates(
            kube_core = "stackable_operator::kube::core",
            k8s_openapi = "stackable_operator::k8s_openapi",
            schemars = "stackable_operator::schemars"
        )
    ))]
    #[serde(rename_all = "kebab-case")]
    pub struct ElasticsearchClusterSpec {
        /// The name of the Elasticsearch cluster
        pub cluster_name: String,

        /// Labels which a node must have so that Elasticsearch Pods can be scheduled on it
        #[serde(
            default,
            rename = "nodeSelector",
            skip_serializing_if = "BTreeMap::is_empty"
        )]
        pub node_selector: BTreeMap<String, String>,

        /// Zones over which the persistent volumes of the data nodes are spread
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub zones: Vec<String>,

        /// Settings for each node role; a role without settings is not deployed
        #[serde(default)]
        pub node_specs: NodeSpecs,

        /// Size of the persistent volume attached to each data node, e.g. `10Gi`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub data_volume_size: Option<ResourceQuantity>,

        /// Container image overriding the default Elasticsearch image
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub elastic_search_image: Option<String>,

        #[serde(default)]
        pub snapshot: Snapshot,

        #[serde(default)]
        pub storage: Storage,
    }

    #[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct NodeSpecs {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub master: Option<NodeTypeSettings>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub client: Option<NodeTypeSettings>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub data: Option<NodeTypeSettings>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub ingest: Option<NodeTypeSettings>,
    }

    /// Sizing of the nodes of one role
    #[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct NodeTypeSettings {
        /// Number of nodes; zero is allowed and deploys the role without any Pod
        #[serde(default)]
        pub replicas: i32,

        #[serde(default, rename = "cpu-req", skip_serializing_if = "Option::is_none")]
        pub cpu_request: Option<ResourceQuantity>,

        #[serde(default, rename = "mem-req", skip_serializing_if = "Option::is_none")]
        pub memory_request: Option<ResourceQuantity>,

        #[serde(default, rename = "cpu-limit", skip_serializing_if = "Option::is_none")]
        pub cpu_limit: Option<ResourceQuantity>,

        #[serde(default, rename = "mem-limit", skip_serializing_if = "Option::is_none")]
        pub memory_limit: Option<ResourceQuantity>,

        /// Maximum JVM heap size in megabytes; only honored on data nodes together with
        /// `heap-min`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub heap_max: Option<u32>,

        /// Minimum JVM heap size in megabytes; only honored on data nodes together with
        /// `heap-max`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub heap_min: Option<u32>,
    }

    /// Schedule of the cluster snapshots
    #[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct Snapshot {
        #[serde(default)]
        pub scheduler_enabled: bool,

        /// Bucket which stores the snapshots
        #[serde(default)]
        pub bucket_name: String,

        /// Cron expression with five or six fields, e.g. `0 */2 * * * *`, or a shorthand like
        /// `@daily` or `@every 2m`
        #[serde(default)]
        pub cron_schedule: String,
    }

    /// How the persistent volumes of the data nodes are provisioned
    #[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
    #[serde(rename_all = "kebab-case")]
    pub struct Storage {
        /// Disk type of the storage backend, e.g. `pd-ssd`
        #[serde(default, rename = "type")]
        pub storage_type: String,

        /// Storage class used for the volume claims, e.g. `kubernetes.io/gce-pd`
        #[serde(default)]
        pub storage_class_provisioner: String,
    }
}

/// The node roles of an Elasticsearch cluster
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    Eq,
    Hash,
    IntoStaticStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeRole {
    /// Coordinates the cluster
    Master,
    /// Routes queries, holds no data
    Client,
    /// Stores the data and executes searches
    Data,
    /// Pre-processes documents
    Ingest,
}

impl v1::NodeSpecs {
    pub fn get(&self, node_role: &NodeRole) -> Option<&v1::NodeTypeSettings> {
        match node_role {
            NodeRole::Master => self.master.as_ref(),
            NodeRole::Client => self.client.as_ref(),
            NodeRole::Data => self.data.as_ref(),
            NodeRole::Ingest => self.ingest.as_ref(),
        }
    }

    /// Returns the configured roles in the order master, client, data, ingest
    pub fn iter(&self) -> impl Iterator<Item = (NodeRole, &v1::NodeTypeSettings)> {
        NodeRole::iter().filter_map(|node_role| {
            self.get(&node_role)
                .map(|node_type_settings| (node_role, node_type_settings))
        })
    }
}

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum DecodeError {
    #[snafu(display("failed to deserialize the ElasticsearchCluster document"))]
    DeserializeDocument { source: serde_json::Error },
}

/// Decodes an ElasticsearchCluster from its JSON representation
///
/// Only the structure is checked, i.e. the types of the fields and the format of the resource
/// quantities. Dependencies between fields are checked in the validate step.
pub fn decode(document: &str) -> Result<v1::ElasticsearchCluster, DecodeError> {
    serde_json::from_str(document).context(DeserializeDocumentSnafu)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use strum::IntoEnumIterator;

    use super::{DecodeErrorDiscriminants, ElasticsearchCluster, ElasticsearchClusterVersion};
    use crate::crd::{NodeRole, decode, v1};

    const CLUSTER: &str = r#"{
      "apiVersion": "enterprises.upmc.com/v1",
      "kind": "ElasticsearchCluster",
      "metadata": {
        "name": "es-cluster"
      },
      "spec": {
        "cluster-name": "primary",
        "zones": ["us-central1-a", "us-central1-f"],
        "node-specs": {
          "master": {
            "replicas": 3
          },
          "client": {
            "replicas": 1
          },
          "data": {
            "replicas": 3,
            "cpu-req": "8000m",
            "mem-req": "30Gi",
            "heap-max": 28000,
            "heap-min": 28000
          },
          "ingest": {}
        },
        "data-volume-size": "10Gi",
        "storage": {
          "type": "pd-ssd",
          "storage-class-provisioner": "kubernetes.io/gce-pd"
        }
      }
    }"#;

    fn cluster_with_spec(spec: serde_json::Value) -> String {
        json!({
            "apiVersion": "enterprises.upmc.com/v1",
            "kind": "ElasticsearchCluster",
            "metadata": {
                "name": "es-cluster"
            },
            "spec": spec
        })
        .to_string()
    }

    #[test]
    fn test_decode() {
        let cluster = decode(CLUSTER).expect("should be a valid ElasticsearchCluster");

        assert_eq!(Some("es-cluster".to_owned()), cluster.metadata.name);
        assert_eq!("primary", cluster.spec.cluster_name);
        assert_eq!(
            vec!["us-central1-a".to_owned(), "us-central1-f".to_owned()],
            cluster.spec.zones
        );

        let data = cluster
            .spec
            .node_specs
            .data
            .as_ref()
            .expect("should contain the data node settings");
        assert_eq!(3, data.replicas);
        assert_eq!(
            Some("8000m"),
            data.cpu_request.as_ref().map(|quantity| quantity.as_ref())
        );
        assert_eq!(Some(28000), data.heap_min);
        assert_eq!(Some(28000), data.heap_max);
        assert_eq!(None, data.cpu_limit);

        assert_eq!(
            Some(&v1::NodeTypeSettings::default()),
            cluster.spec.node_specs.ingest.as_ref()
        );
        assert_eq!(
            Some("10Gi"),
            cluster
                .spec
                .data_volume_size
                .as_ref()
                .map(|quantity| quantity.as_ref())
        );
        assert_eq!("pd-ssd", cluster.spec.storage.storage_type);
        assert_eq!(
            "kubernetes.io/gce-pd",
            cluster.spec.storage.storage_class_provisioner
        );
        assert_eq!(v1::Snapshot::default(), cluster.spec.snapshot);
        assert_eq!(None, cluster.spec.elastic_search_image);
    }

    #[test]
    fn test_decode_snapshot() {
        let cluster = decode(&cluster_with_spec(json!({
            "cluster-name": "primary",
            "snapshot": {
                "scheduler-enabled": true,
                "bucket-name": "es-snapshots",
                "cron-schedule": "@every 2m"
            }
        })))
        .expect("should be a valid ElasticsearchCluster");

        assert_eq!(
            v1::Snapshot {
                scheduler_enabled: true,
                bucket_name: "es-snapshots".to_owned(),
                cron_schedule: "@every 2m".to_owned(),
            },
            cluster.spec.snapshot
        );
        assert_eq!(v1::NodeSpecs::default(), cluster.spec.node_specs);
    }

    #[test]
    fn test_decode_rejects_structural_errors() {
        let invalid_specs = [
            // replicas given as a string
            json!({"cluster-name": "primary", "node-specs": {"master": {"replicas": "three"}}}),
            // role settings given as a scalar
            json!({"cluster-name": "primary", "node-specs": {"data": 3}}),
            // malformed quantity
            json!({"cluster-name": "primary", "data-volume-size": "10 Gi"}),
            json!({"cluster-name": "primary", "node-specs": {"client": {"mem-limit": "lots"}}}),
            // negative heap size
            json!({"cluster-name": "primary", "node-specs": {"data": {"heap-min": -1}}}),
            // missing cluster name
            json!({"node-specs": {}}),
        ];

        for spec in invalid_specs {
            assert_eq!(
                Err(DecodeErrorDiscriminants::DeserializeDocument),
                decode(&cluster_with_spec(spec.clone()))
                    .map(|_| ())
                    .map_err(DecodeErrorDiscriminants::from),
                "{spec} should not be decodable"
            );
        }
    }

    #[test]
    fn test_node_specs_iter() {
        let cluster = decode(&cluster_with_spec(json!({
            "cluster-name": "primary",
            "node-specs": {
                "ingest": {"replicas": 2},
                "master": {"replicas": 3}
            }
        })))
        .expect("should be a valid ElasticsearchCluster");

        let node_roles: Vec<_> = cluster
            .spec
            .node_specs
            .iter()
            .map(|(node_role, node_type_settings)| (node_role, node_type_settings.replicas))
            .collect();

        assert_eq!(vec![(NodeRole::Master, 3), (NodeRole::Ingest, 2)], node_roles);
        assert!(cluster.spec.node_specs.get(&NodeRole::Data).is_none());
    }

    #[test]
    fn test_node_role_names() {
        assert_eq!(
            vec!["master", "client", "data", "ingest"],
            NodeRole::iter()
                .map(|node_role| node_role.to_string())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_merged_crd() {
        let crd = ElasticsearchCluster::merged_crd(ElasticsearchClusterVersion::V1)
            .expect("should be a valid CRD");

        assert_eq!("enterprises.upmc.com", crd.spec.group);
        assert_eq!("ElasticsearchCluster", crd.spec.names.kind);
        assert_eq!("elasticsearchclusters", crd.spec.names.plural);
    }
}
