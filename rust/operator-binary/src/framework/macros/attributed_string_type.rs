use snafu::Snafu;
use strum::{EnumDiscriminants, IntoStaticStr};

/// Maximum length of label values
///
/// Duplicates the private constant [`stackable-operator::kvp::label::value::LABEL_VALUE_MAX_LEN`]
pub const MAX_LABEL_VALUE_LENGTH: usize = 63;

#[derive(Debug, EnumDiscriminants, Snafu)]
#[snafu(visibility(pub))]
#[strum_discriminants(derive(IntoStaticStr))]
pub enum Error {
    #[snafu(display("minimum length not met"))]
    MinimumLengthNotMet { length: usize, min_length: usize },

    #[snafu(display("maximum length exceeded"))]
    LengthExceeded { length: usize, max_length: usize },

    #[snafu(display("invalid regular expression"))]
    InvalidRegex { source: regex::Error },

    #[snafu(display("regular expression not matched"))]
    RegexNotMatched { value: String, regex: &'static str },

    #[snafu(display("not a valid label value"))]
    InvalidLabelValue {
        source: stackable_operator::kvp::LabelValueError,
    },

    #[snafu(display("not a valid label name as defined in RFC 1123"))]
    InvalidRfc1123LabelName {
        source: stackable_operator::validation::Errors,
    },
}

/// Helper data type to determine combined regular expressions
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Regex {
    /// There is a regular expression but it is unknown because two expressions had to be
    /// combined.
    Unknown,

    /// `MatchAll` equals `Expression(".*")`, but `MatchAll` can be pattern matched in a const
    /// context, whereas `Expression(...)` cannot.
    MatchAll,

    /// A regular expression
    Expression(&'static str),
}

impl Regex {
    /// Combine this regular expression with the given one.
    pub const fn combine(self, other: Regex) -> Regex {
        match (self, other) {
            (_, Regex::MatchAll) => self,
            (Regex::MatchAll, _) => other,
            _ => Regex::Unknown,
        }
    }
}

/// Returns `true` if the whole string matches the given regular expression.
pub fn is_full_match(regex: &str, value: &str) -> Result<bool, regex::Error> {
    regex::Regex::new(&format!("^(?:{regex})$")).map(|regex| regex.is_match(value))
}

/// Restricted string type with attributes like maximum length.
///
/// The type is validated on construction and on deserialization, so an invalid value in a
/// custom resource is rejected while it is decoded.
///
/// # Examples
///
/// ```rust
/// attributed_string_type! {
///     ZoneName,
///     "The name of an availability zone",
///     "us-central1-a",
///     (max_length = 20),
///     is_rfc_1123_label_name
/// }
/// ```
#[macro_export(local_inner_macros)]
macro_rules! attributed_string_type {
    ($name:ident, $description:literal, $example:literal $(, $attribute:tt)*) => {
        #[doc = std::concat!($description, ", e.g. \"", $example, "\"")]
        #[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $name(String);

        impl $name {
            /// The minimum length
            pub const MIN_LENGTH: usize = attributed_string_type!(@min_length $($attribute)*);

            /// The maximum length
            pub const MAX_LENGTH: usize = attributed_string_type!(@max_length $($attribute)*);

            /// The regular expression
            ///
            /// This field is not meant to be used outside of this macro.
            pub const REGEX: $crate::framework::macros::attributed_string_type::Regex = attributed_string_type!(@regex $($attribute)*);
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl From<&$name> for String {
            fn from(value: &$name) -> Self {
                value.0.clone()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::framework::macros::attributed_string_type::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                // ResultExt::context is used on most but not all usages of this macro
                #[allow(unused_imports)]
                use snafu::ResultExt;

                $(attributed_string_type!(@from_str $name, s, $attribute);)*

                Ok(Self(s.to_owned()))
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let string: String = serde::Deserialize::deserialize(deserializer)?;
                <$name as std::str::FromStr>::from_str(&string)
                    .map_err(|err| serde::de::Error::custom(&err))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.0.serialize(serializer)
            }
        }

        impl schemars::JsonSchema for $name {
            fn schema_name() -> String {
                std::stringify!($name).to_owned()
            }

            fn json_schema(_generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
                schemars::schema::SchemaObject {
                    instance_type: Some(schemars::schema::InstanceType::String.into()),
                    string: Some(std::boxed::Box::new(schemars::schema::StringValidation {
                        min_length: u32::try_from($name::MIN_LENGTH).ok(),
                        // Do not set maxLength if it is usize::MAX.
                        max_length: if $name::MAX_LENGTH != usize::MAX {
                            u32::try_from($name::MAX_LENGTH).ok()
                        } else {
                            None
                        },
                        pattern: match $name::REGEX {
                            $crate::framework::macros::attributed_string_type::Regex::Expression(regex) => Some(std::format!("^{regex}$")),
                            _ => None,
                        },
                    })),
                    ..schemars::schema::SchemaObject::default()
                }
                .into()
            }
        }

        #[cfg(test)]
        impl $name {
            #[allow(dead_code)]
            pub fn from_str_unsafe(s: &str) -> Self {
                std::str::FromStr::from_str(s).expect("should be a valid {name}")
            }

            // A dead_code warning is emitted if there is no unit test that calls this function.
            pub fn test_example() {
                Self::from_str_unsafe($example);
            }
        }
    };

    // std::str::FromStr

    (@from_str $name:ident, $s:expr, (min_length = $min_length:expr)) => {
        let length = $s.len() as usize;
        snafu::ensure!(
            length >= $name::MIN_LENGTH,
            $crate::framework::macros::attributed_string_type::MinimumLengthNotMetSnafu {
                length,
                min_length: $name::MIN_LENGTH,
            }
        );
    };
    (@from_str $name:ident, $s:expr, (max_length = $max_length:expr)) => {
        let length = $s.len() as usize;
        snafu::ensure!(
            length <= $name::MAX_LENGTH,
            $crate::framework::macros::attributed_string_type::LengthExceededSnafu {
                length,
                max_length: $name::MAX_LENGTH,
            }
        );
    };
    (@from_str $name:ident, $s:expr, (regex = $regex:expr)) => {
        let is_match = $crate::framework::macros::attributed_string_type::is_full_match($regex, $s)
            .context($crate::framework::macros::attributed_string_type::InvalidRegexSnafu)?;
        snafu::ensure!(
            is_match,
            $crate::framework::macros::attributed_string_type::RegexNotMatchedSnafu {
                value: $s,
                regex: $regex
            }
        );
    };
    (@from_str $name:ident, $s:expr, is_rfc_1123_label_name) => {
        stackable_operator::validation::is_lowercase_rfc_1123_label($s)
            .context($crate::framework::macros::attributed_string_type::InvalidRfc1123LabelNameSnafu)?;
    };
    (@from_str $name:ident, $s:expr, is_valid_label_value) => {
        <stackable_operator::kvp::LabelValue as std::str::FromStr>::from_str($s)
            .context($crate::framework::macros::attributed_string_type::InvalidLabelValueSnafu)?;
    };

    // MIN_LENGTH

    (@min_length) => {
        // The minimum String length is 0.
        0
    };
    (@min_length (min_length = $min_length:expr) $($attribute:tt)*) => {
        $crate::framework::macros::attributed_string_type::max(
            $min_length,
            attributed_string_type!(@min_length $($attribute)*)
        )
    };
    (@min_length (max_length = $max_length:expr) $($attribute:tt)*) => {
        attributed_string_type!(@min_length $($attribute)*)
    };
    (@min_length (regex = $regex:expr) $($attribute:tt)*) => {
        attributed_string_type!(@min_length $($attribute)*)
    };
    (@min_length is_rfc_1123_label_name $($attribute:tt)*) => {
        $crate::framework::macros::attributed_string_type::max(
            1,
            attributed_string_type!(@min_length $($attribute)*)
        )
    };
    (@min_length is_valid_label_value $($attribute:tt)*) => {
        $crate::framework::macros::attributed_string_type::max(
            1,
            attributed_string_type!(@min_length $($attribute)*)
        )
    };

    // MAX_LENGTH

    (@max_length) => {
        // If there is no other max_length defined, then the upper bound is usize::MAX.
        usize::MAX
    };
    (@max_length (min_length = $min_length:expr) $($attribute:tt)*) => {
        attributed_string_type!(@max_length $($attribute)*)
    };
    (@max_length (max_length = $max_length:expr) $($attribute:tt)*) => {
        $crate::framework::macros::attributed_string_type::min(
            $max_length,
            attributed_string_type!(@max_length $($attribute)*)
        )
    };
    (@max_length (regex = $regex:expr) $($attribute:tt)*) => {
        attributed_string_type!(@max_length $($attribute)*)
    };
    (@max_length is_rfc_1123_label_name $($attribute:tt)*) => {
        $crate::framework::macros::attributed_string_type::min(
            stackable_operator::validation::RFC_1123_LABEL_MAX_LENGTH,
            attributed_string_type!(@max_length $($attribute)*)
        )
    };
    (@max_length is_valid_label_value $($attribute:tt)*) => {
        $crate::framework::macros::attributed_string_type::min(
            $crate::framework::macros::attributed_string_type::MAX_LABEL_VALUE_LENGTH,
            attributed_string_type!(@max_length $($attribute)*)
        )
    };

    // REGEX

    (@regex) => {
        // Everything is allowed if there is no other regular expression.
        $crate::framework::macros::attributed_string_type::Regex::MatchAll
    };
    (@regex (min_length = $min_length:expr) $($attribute:tt)*) => {
        attributed_string_type!(@regex $($attribute)*)
    };
    (@regex (max_length = $max_length:expr) $($attribute:tt)*) => {
        attributed_string_type!(@regex $($attribute)*)
    };
    (@regex (regex = $regex:expr) $($attribute:tt)*) => {
        $crate::framework::macros::attributed_string_type::Regex::Expression($regex)
            .combine(attributed_string_type!(@regex $($attribute)*))
    };
    (@regex is_rfc_1123_label_name $($attribute:tt)*) => {
        $crate::framework::macros::attributed_string_type::Regex::Expression(
            stackable_operator::validation::LOWERCASE_RFC_1123_LABEL_FMT
        )
        .combine(attributed_string_type!(@regex $($attribute)*))
    };
    (@regex is_valid_label_value $($attribute:tt)*) => {
        // regular expression from stackable_operator::kvp::label::LABEL_VALUE_REGEX
        $crate::framework::macros::attributed_string_type::Regex::Expression("[a-z0-9A-Z]([a-z0-9A-Z-_.]*[a-z0-9A-Z]+)?")
            .combine(attributed_string_type!(@regex $($attribute)*))
    };
}

/// Returns the minimum of the given values.
///
/// As opposed to [`std::cmp::min`], this function can be used at compile-time.
pub const fn min(x: usize, y: usize) -> usize {
    if x < y { x } else { y }
}

/// Returns the maximum of the given values.
///
/// As opposed to [`std::cmp::max`], this function can be used at compile-time.
pub const fn max(x: usize, y: usize) -> usize {
    if x < y { y } else { x }
}

#[cfg(test)]
// `InvalidRegexTest` intentionally contains an invalid regular expression.
#[allow(clippy::invalid_regex)]
mod tests {
    use std::str::FromStr;

    use schemars::{JsonSchema, r#gen::SchemaGenerator};
    use serde_json::{Value, json};

    use super::{Error, ErrorDiscriminants, Regex, is_full_match};

    attributed_string_type! {
        LengthTest,
        "length test",
        "test",
        (min_length = 2),
        (max_length = 8),
        is_rfc_1123_label_name // should be overruled by the tighter bounds
    }

    #[test]
    fn test_attributed_string_type_length() {
        type T = LengthTest;

        T::test_example();
        assert_eq!(2, T::MIN_LENGTH);
        assert_eq!(8, T::MAX_LENGTH);
        assert_eq!(
            Err(ErrorDiscriminants::MinimumLengthNotMet),
            T::from_str("a").map_err(ErrorDiscriminants::from)
        );
        assert_eq!(
            Err(ErrorDiscriminants::LengthExceeded),
            T::from_str("test-12345").map_err(ErrorDiscriminants::from)
        );
    }

    attributed_string_type! {
        UnconstrainedTest,
        "test without constraints",
        ""
    }

    #[test]
    fn test_attributed_string_type_without_constraints() {
        type T = UnconstrainedTest;

        T::test_example();
        assert_eq!(0, T::MIN_LENGTH);
        assert_eq!(usize::MAX, T::MAX_LENGTH);
        assert_eq!(Regex::MatchAll, T::REGEX);
    }

    attributed_string_type! {
        RegexTest,
        "regex test",
        "test",
        (regex = "[est]{4}")
    }

    #[test]
    fn test_attributed_string_type_regex() {
        type T = RegexTest;

        T::test_example();
        assert_eq!(Regex::Expression("[est]{4}"), T::REGEX);
        assert_eq!(
            Err(ErrorDiscriminants::RegexNotMatched),
            T::from_str("t-st").map_err(ErrorDiscriminants::from)
        );
        // The expression must match the whole string.
        assert_eq!(
            Err(ErrorDiscriminants::RegexNotMatched),
            T::from_str("testtest").map_err(ErrorDiscriminants::from)
        );
    }

    attributed_string_type! {
        CombinedRegexTest,
        "regex test with multiple constraints",
        "test",
        (regex = "[est]{4}"),
        is_rfc_1123_label_name
    }

    #[test]
    fn test_attributed_string_type_combined_regex() {
        type T = CombinedRegexTest;

        T::test_example();
        assert_eq!(Regex::Unknown, T::REGEX);
        assert_eq!(
            Err(ErrorDiscriminants::RegexNotMatched),
            T::from_str("abcd").map_err(ErrorDiscriminants::from)
        );
    }

    attributed_string_type! {
        InvalidRegexTest,
        "regex test with invalid expression",
        "test",
        (regex = "{")
    }

    #[test]
    fn test_attributed_string_type_invalid_regex() {
        type T = InvalidRegexTest;

        assert_eq!(
            Err(ErrorDiscriminants::InvalidRegex),
            T::from_str("test").map_err(ErrorDiscriminants::from)
        );
    }

    attributed_string_type! {
        Rfc1123LabelNameTest,
        "is_rfc_1123_label_name test",
        "1-a",
        is_rfc_1123_label_name
    }

    #[test]
    fn test_attributed_string_type_is_rfc_1123_label_name() {
        type T = Rfc1123LabelNameTest;

        T::test_example();
        assert_eq!(
            stackable_operator::validation::RFC_1123_LABEL_MAX_LENGTH,
            T::MAX_LENGTH
        );
        assert_eq!(
            Regex::Expression(stackable_operator::validation::LOWERCASE_RFC_1123_LABEL_FMT),
            T::REGEX
        );
        let too_long = "a".repeat(64);
        for invalid in ["A", "-a", "a-", "a.b", too_long.as_str()] {
            assert_eq!(
                Err(ErrorDiscriminants::InvalidRfc1123LabelName),
                T::from_str(invalid).map_err(ErrorDiscriminants::from)
            );
        }
    }

    #[test]
    fn test_attributed_string_type_is_rfc_1123_label_name_keeps_the_validation_errors() {
        let result = Rfc1123LabelNameTest::from_str("Not_A_Label");

        let Err(Error::InvalidRfc1123LabelName { source }) = result else {
            panic!("expected InvalidRfc1123LabelName, got {result:?}");
        };
        assert!(!source.to_string().is_empty());
    }

    attributed_string_type! {
        LabelValueTest,
        "is_valid_label_value test",
        "a-_.1",
        is_valid_label_value
    }

    #[test]
    fn test_attributed_string_type_is_valid_label_value() {
        type T = LabelValueTest;

        T::test_example();
        assert_eq!(
            Err(ErrorDiscriminants::InvalidLabelValue),
            T::from_str("invalid label value").map_err(ErrorDiscriminants::from)
        );
    }

    attributed_string_type! {
        SerdeTest,
        "serde test",
        "test",
        (min_length = 2),
        (max_length = 4),
        (regex = "[est-]+")
    }

    #[test]
    fn test_attributed_string_type_serde() {
        type T = SerdeTest;

        assert_eq!(
            T::from_str_unsafe("test"),
            serde_json::from_value(json!("test")).expect("should be deserializable")
        );
        assert_eq!(
            "\"test\"".to_owned(),
            serde_json::to_string(&T::from_str_unsafe("test")).expect("should be serializable")
        );
        assert_eq!(
            Err("minimum length not met".to_owned()),
            serde_json::from_value::<T>(json!("e")).map_err(|err| err.to_string())
        );
        assert_eq!(
            Err("regular expression not matched".to_owned()),
            serde_json::from_value::<T>(json!("abc")).map_err(|err| err.to_string())
        );
        assert_eq!(
            Err("invalid type: integer `1`, expected a string".to_owned()),
            serde_json::from_value::<T>(json!(1)).map_err(|err| err.to_string())
        );
        assert_eq!(
            Err("invalid type: null, expected a string".to_owned()),
            serde_json::from_value::<T>(Value::Null).map_err(|err| err.to_string())
        );
    }

    #[test]
    fn test_attributed_string_type_display_and_string_from() {
        type T = SerdeTest;

        assert_eq!("test", format!("{}", T::from_str_unsafe("test")));
        assert_eq!("test", String::from(T::from_str_unsafe("test")));
        assert_eq!("test", String::from(&T::from_str_unsafe("test")));
    }

    #[test]
    fn test_attributed_string_type_json_schema() {
        assert_eq!("SerdeTest", SerdeTest::schema_name());
        assert_eq!(
            json!({
                "type": "string",
                "minLength": 2,
                "maxLength": 4,
                "pattern": "^[est-]+$"
            }),
            serde_json::to_value(SerdeTest::json_schema(&mut SchemaGenerator::default()))
                .expect("should be serializable")
        );
        assert_eq!(
            json!({
                "type": "string",
                "minLength": 0
            }),
            serde_json::to_value(UnconstrainedTest::json_schema(
                &mut SchemaGenerator::default()
            ))
            .expect("should be serializable")
        );
    }

    #[test]
    fn test_is_full_match() {
        assert_eq!(Ok(true), is_full_match("[a-c]+", "abc").map_err(|_| ()));
        assert_eq!(Ok(false), is_full_match("[a-c]+", "abcd").map_err(|_| ()));
        assert!(is_full_match("(", "abc").is_err());
    }
}
