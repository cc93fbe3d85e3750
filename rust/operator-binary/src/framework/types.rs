pub mod kubernetes;
pub mod operator;
