use std::collections::BTreeMap;

use stackable_operator::k8s_openapi::api::core::v1::{EnvVar, EnvVarSource, ObjectFieldSelector};
use strum::{Display, IntoStaticStr};

use crate::attributed_string_type;

attributed_string_type! {
    EnvVarName,
    "The name of an environment variable",
    "CLUSTER_NAME",
    (min_length = 1),
    // see https://github.com/kubernetes/kubernetes/blob/v1.33.0/staging/src/k8s.io/apimachinery/pkg/util/validation/validation.go#L441-L450
    (regex = "[-._a-zA-Z][-._a-zA-Z0-9]*")
}

/// Pod fields which can be exposed to a container as environment variables
///
/// The values are resolved by Kubernetes when the Pod is admitted, not when the Pod template is
/// built.
#[derive(Clone, Copy, Debug, Display, Eq, IntoStaticStr, Ord, PartialEq, PartialOrd)]
pub enum FieldPath {
    #[strum(serialize = "metadata.namespace")]
    Namespace,
}

/// Value of an environment variable
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum EnvVarValue {
    Literal(String),
    FieldPath(FieldPath),
}

/// A set of environment variables ordered by name
///
/// The variables are iterated and emitted in alphabetical order of their names, not in the order
/// in which they were added. Adding a variable with an existing name replaces the former one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EnvVarSet(BTreeMap<EnvVarName, EnvVarValue>);

impl EnvVarSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, env_var_name: &EnvVarName) -> Option<&EnvVarValue> {
        self.0.get(env_var_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EnvVarName, &EnvVarValue)> {
        self.0.iter()
    }

    pub fn with_value(mut self, name: &EnvVarName, value: impl Into<String>) -> Self {
        self.0
            .insert(name.clone(), EnvVarValue::Literal(value.into()));

        self
    }

    pub fn with_field_path(mut self, name: &EnvVarName, field_path: FieldPath) -> Self {
        self.0
            .insert(name.clone(), EnvVarValue::FieldPath(field_path));

        self
    }
}

impl From<&EnvVarSet> for Vec<EnvVar> {
    fn from(value: &EnvVarSet) -> Self {
        value
            .iter()
            .map(|(name, value)| match value {
                EnvVarValue::Literal(literal) => EnvVar {
                    name: name.to_string(),
                    value: Some(literal.clone()),
                    value_from: None,
                },
                EnvVarValue::FieldPath(field_path) => EnvVar {
                    name: name.to_string(),
                    value: None,
                    value_from: Some(EnvVarSource {
                        field_ref: Some(ObjectFieldSelector {
                            field_path: field_path.to_string(),
                            ..ObjectFieldSelector::default()
                        }),
                        ..EnvVarSource::default()
                    }),
                },
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use stackable_operator::k8s_openapi::api::core::v1::{
        EnvVar, EnvVarSource, ObjectFieldSelector,
    };

    use super::{EnvVarName, EnvVarSet, EnvVarValue, FieldPath};

    #[test]
    fn test_env_var_name() {
        EnvVarName::test_example();

        assert!(EnvVarName::from_str("ES_JAVA_OPTS").is_ok());
        assert!(EnvVarName::from_str("cluster.name").is_ok());
        assert!(EnvVarName::from_str("").is_err());
        assert!(EnvVarName::from_str("1VAR").is_err());
        assert!(EnvVarName::from_str("MY VAR").is_err());
    }

    #[test]
    fn test_env_var_set_replaces_existing_names() {
        let name = EnvVarName::from_str_unsafe("NODE_MASTER");

        let env_var_set = EnvVarSet::new()
            .with_value(&name, "true")
            .with_value(&name, "false");

        assert_eq!(1, env_var_set.iter().count());
        assert_eq!(
            Some(&EnvVarValue::Literal("false".to_owned())),
            env_var_set.get(&name)
        );
    }

    #[test]
    fn test_env_var_set_is_ordered_by_name() {
        let env_var_set = [
            "NAMESPACE",
            "CLUSTER_NAME",
            "NODE_MASTER",
            "NODE_DATA",
            "HTTP_ENABLE",
            "ES_JAVA_OPTS",
        ]
        .into_iter()
        .fold(EnvVarSet::new(), |env_var_set, name| {
            env_var_set.with_value(&EnvVarName::from_str_unsafe(name), "")
        });

        assert_eq!(
            vec![
                "CLUSTER_NAME",
                "ES_JAVA_OPTS",
                "HTTP_ENABLE",
                "NAMESPACE",
                "NODE_DATA",
                "NODE_MASTER"
            ],
            Vec::<EnvVar>::from(&env_var_set)
                .into_iter()
                .map(|env_var| env_var.name)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_env_var_set_into_env_vars() {
        let env_var_set = EnvVarSet::new()
            .with_field_path(
                &EnvVarName::from_str_unsafe("NAMESPACE"),
                FieldPath::Namespace,
            )
            .with_value(&EnvVarName::from_str_unsafe("CLUSTER_NAME"), "primary");

        assert_eq!(
            vec![
                EnvVar {
                    name: "CLUSTER_NAME".to_owned(),
                    value: Some("primary".to_owned()),
                    value_from: None,
                },
                EnvVar {
                    name: "NAMESPACE".to_owned(),
                    value: None,
                    value_from: Some(EnvVarSource {
                        field_ref: Some(ObjectFieldSelector {
                            field_path: "metadata.namespace".to_owned(),
                            ..ObjectFieldSelector::default()
                        }),
                        ..EnvVarSource::default()
                    }),
                },
            ],
            Vec::<EnvVar>::from(&env_var_set)
        );
    }
}
