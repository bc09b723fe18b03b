//! # stress-types
//!
//! Shared vocabulary for the rados-stress orchestrator.
//!
//! - [`ClientRole`] - a validated `client.<id>` role
//! - [`OpKind`] - the operation kinds the stress binary mixes
//! - [`RoleError`] - role parsing failures

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod op;
mod role;

pub use error::RoleError;
pub use op::OpKind;
pub use role::{ClientRole, CLIENT_ID_ENV, CLIENT_PREFIX, DEFAULT_ROLE};
