//! Kubernetes value types
use stackable_operator::k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use crate::attributed_string_type;

/// Serialized form of a Kubernetes resource quantity
///
/// see <https://github.com/kubernetes/apimachinery/blob/v0.33.0/pkg/api/resource/quantity.go#L34-L71>
pub const QUANTITY_FMT: &str =
    r"[+-]?(([0-9]+(\.[0-9]*)?)|(\.[0-9]+))(([KMGTPE]i)|[numkMGTPE]|([eE][+-]?[0-9]+))?";

attributed_string_type! {
    ResourceQuantity,
    "A Kubernetes resource quantity",
    "10Gi",
    (min_length = 1),
    (regex = QUANTITY_FMT)
}

impl From<&ResourceQuantity> for Quantity {
    fn from(value: &ResourceQuantity) -> Self {
        Quantity(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use stackable_operator::k8s_openapi::apimachinery::pkg::api::resource::Quantity;

    use super::ResourceQuantity;

    #[test]
    fn test_resource_quantity_examples() {
        ResourceQuantity::test_example();

        for valid in ["1", "8000m", "0.5", ".5", "30Gi", "10G", "1e3", "+2Ki", "100Mi"] {
            assert!(
                ResourceQuantity::from_str(valid).is_ok(),
                "{valid} should be a valid quantity"
            );
        }
    }

    #[test]
    fn test_resource_quantity_rejects_malformed_values() {
        for invalid in ["", "Gi", "10 Gi", "ten", "10gb", "1.2.3", "10Gi "] {
            assert!(
                ResourceQuantity::from_str(invalid).is_err(),
                "{invalid} should not be a valid quantity"
            );
        }
    }

    #[test]
    fn test_resource_quantity_into_quantity() {
        assert_eq!(
            Quantity("8000m".to_owned()),
            Quantity::from(&ResourceQuantity::from_str_unsafe("8000m"))
        );
    }
}
