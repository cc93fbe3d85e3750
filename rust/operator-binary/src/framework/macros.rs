pub mod attributed_string_type;
pub mod constant;
