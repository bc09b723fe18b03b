//! Configuration errors.

use rados_stress_types::RoleError;
use thiserror::Error;

/// Errors raised while validating a workload configuration.
///
/// All of these are detected before any remote action is taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The workload section is not a table.
    #[error("workload config must be a mapping, got {0}")]
    NotAMapping(&'static str),

    /// The workload section has the wrong shape (bad type, negative number, unknown key).
    #[error("invalid workload config: {0}")]
    Invalid(String),

    /// A client role is malformed.
    #[error("invalid client role: {0}")]
    Role(RoleError),

    /// The same client role is listed twice.
    #[error("client role {0} is listed more than once")]
    DuplicateRole(String),

    /// A count or size that must be positive is zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Configuration key.
        field: &'static str,
    },

    /// Stride bounds do not satisfy `min_stride_size <= max_stride_size <= object_size`.
    #[error(
        "stride sizes out of order: min_stride_size={min} max_stride_size={max} object_size={object_size}"
    )]
    StrideOrder {
        /// Effective minimum stride.
        min: u64,
        /// Effective maximum stride.
        max: u64,
        /// Effective object size.
        object_size: u64,
    },

    /// Every operation weight is zero, so the binary has nothing to pick.
    #[error("all op_weights are zero")]
    NoWeight,
}

impl From<RoleError> for ConfigError {
    fn from(e: RoleError) -> Self {
        ConfigError::Role(e)
    }
}
