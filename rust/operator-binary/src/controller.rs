//! Turns an ElasticsearchCluster into the Kubernetes objects which run it
//!
//! The cluster passes two steps:
//! 1. validate: checks the dependencies between fields and resolves defaults
//! 2. build: derives the workloads and services of every configured node role
//!
//! Both steps are pure functions. Applying the objects to a Kubernetes cluster is left to the
//! caller.

use std::collections::BTreeMap;

use crate::framework::types::{
    kubernetes::ResourceQuantity,
    operator::{ClusterName, ZoneName},
};

pub mod build;
pub mod validate;

/// The validated [`crate::crd::v1::ElasticsearchCluster`]
///
/// A role is deployed if and only if its configuration is set.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedCluster {
    pub name: ClusterName,
    pub namespace: Option<String>,
    pub image: String,
    pub node_selector: BTreeMap<String, String>,
    pub zones: Vec<ZoneName>,
    pub master: Option<RoleConfig>,
    pub client: Option<RoleConfig>,
    pub data: Option<DataNodeConfig>,
    pub ingest: Option<RoleConfig>,
}

/// Configuration of the master, client and ingest roles
#[derive(Clone, Debug, PartialEq)]
pub struct RoleConfig {
    pub replicas: i32,
    pub resources: build::descriptor::ComputeResources,
}

/// Configuration of the data role
#[derive(Clone, Debug, PartialEq)]
pub struct DataNodeConfig {
    pub replicas: i32,
    pub resources: build::descriptor::ComputeResources,
    /// Heap bounds in megabytes
    pub heap_min: u32,
    pub heap_max: u32,
    pub volume_size: ResourceQuantity,
    pub storage_class_provisioner: String,
}
