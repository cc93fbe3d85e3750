//! Type-safe wrappers and builders which are not specific to Elasticsearch
//!
//! The point is to move the validation "upwards", so that the build steps work on values which
//! cannot be invalid anymore.

pub mod builder;
pub mod macros;
pub mod types;
