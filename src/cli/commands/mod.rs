//! CLI command implementations.

pub mod models;
pub mod replay;
pub mod validate;
