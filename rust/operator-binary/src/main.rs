use std::path::PathBuf;

use clap::Parser as _;
use crd::{ElasticsearchCluster, ElasticsearchClusterVersion};
use serde_json::json;
use snafu::{ResultExt as _, Snafu};
use stackable_operator::{
    YamlSchema as _,
    shared::yaml::SerializeOptions,
    telemetry::{Tracing, tracing::TelemetryOptions},
};
use strum::{EnumDiscriminants, IntoStaticStr};

mod controller;
mod crd;
mod framework;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("failed to initialize tracing subscribers"))]
    InitTracing {
        source: stackable_operator::telemetry::tracing::Error,
    },

    #[snafu(display("failed to merge CRD versions"))]
    MergeCrd {
        source: stackable_operator::kube::core::crd::MergeError,
    },

    #[snafu(display("failed to serialize CRD"))]
    SerializeCrd {
        source: stackable_operator::shared::yaml::Error,
    },

    #[snafu(display("failed to read the cluster file {path:?}"))]
    ReadClusterFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to decode the cluster file"))]
    Decode { source: crd::DecodeError },

    #[snafu(display("failed to validate the cluster"))]
    Validate { source: controller::validate::Error },

    #[snafu(display("failed to build the Kubernetes resources"))]
    Build { source: controller::build::Error },

    #[snafu(display("failed to serialize the Kubernetes resources"))]
    SerializeOutput { source: serde_json::Error },
}

#[derive(clap::Parser)]
#[clap(about, author)]
struct Opts {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the CustomResourceDefinition of the ElasticsearchCluster
    Crd,

    /// Build the Kubernetes resources of an ElasticsearchCluster and print them as a List
    Build {
        /// JSON file containing the ElasticsearchCluster
        #[arg(long, value_name = "FILE")]
        cluster_file: PathBuf,

        #[command(flatten)]
        telemetry: TelemetryOptions,
    },
}

#[tokio::main]
#[snafu::report]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    match opts.cmd {
        Command::Crd => {
            ElasticsearchCluster::merged_crd(ElasticsearchClusterVersion::V1)
                .context(MergeCrdSnafu)?
                .print_yaml_schema(built_info::PKG_VERSION, SerializeOptions::default())
                .context(SerializeCrdSnafu)?;
        }
        Command::Build {
            cluster_file,
            telemetry,
        } => {
            let _tracing_guard = Tracing::pre_configured(built_info::PKG_NAME, telemetry)
                .init()
                .context(InitTracingSnafu)?;

            tracing::info!(
                built_info.pkg_version = built_info::PKG_VERSION,
                built_info.git_version = built_info::GIT_VERSION,
                built_info.target = built_info::TARGET,
                built_info.built_time_utc = built_info::BUILT_TIME_UTC,
                built_info.rustc_version = built_info::RUSTC_VERSION,
                "Starting {description}",
                description = built_info::PKG_DESCRIPTION
            );

            let document = std::fs::read_to_string(&cluster_file)
                .context(ReadClusterFileSnafu { path: &cluster_file })?;
            let cluster = crd::decode(&document).context(DecodeSnafu)?;
            let validated_cluster =
                controller::validate::validate(&cluster).context(ValidateSnafu)?;

            tracing::info!(
                cluster.name = %validated_cluster.name,
                cluster.namespace = ?validated_cluster.namespace,
                "Building the Kubernetes resources"
            );

            let resources = controller::build::build(&validated_cluster).context(BuildSnafu)?;

            let items = resources
                .stateful_sets
                .iter()
                .map(serde_json::to_value)
                .chain(resources.deployments.iter().map(serde_json::to_value))
                .chain(resources.services.iter().map(serde_json::to_value))
                .collect::<Result<Vec<_>, _>>()
                .context(SerializeOutputSnafu)?;

            let list = json!({
                "apiVersion": "v1",
                "kind": "List",
                "items": items,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&list).context(SerializeOutputSnafu)?
            );
        }
    }

    Ok(())
}
