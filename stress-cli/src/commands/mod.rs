//! CLI command implementations.

pub mod plan;
pub mod run;
