//! Names used by the operator to produce resource names

use crate::attributed_string_type;

attributed_string_type! {
    ClusterName,
    "The name of an Elasticsearch cluster",
    "primary",
    // Prefixes and suffixes are added to produce workload names, e.g.
    // "es-client-<cluster-name>" or "es-data-<cluster-name>-<zone>".
    (max_length = 24),
    is_rfc_1123_label_name,
    is_valid_label_value
}

attributed_string_type! {
    ZoneName,
    "The name of an availability zone",
    "us-central1-a",
    // The length of the resulting workload names is checked in the validate step.
    is_rfc_1123_label_name,
    is_valid_label_value
}
