//! # stress-core
//!
//! Pure logic for rados-stress (no I/O, instant tests).
//!
//! This crate turns a [`WorkloadConfig`] into the positional
//! [`ArgumentVector`] the remote stress binary expects, and builds the
//! per-role [`LaunchSpec`] from a [`LaunchTemplate`].
//!
//! Nothing here spawns processes or touches the network. The actual
//! launching is done by `stress-runner`, which hands these specs to a
//! remote executor.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod args;
pub mod error;
pub mod invocation;
pub mod workload;

pub use args::{ArgumentVector, ARG_COUNT};
pub use error::ConfigError;
pub use invocation::{shell_quote, LaunchSpec, LaunchTemplate, DEFAULT_TEST_DIR};
pub use workload::{OpWeights, WorkloadConfig};
