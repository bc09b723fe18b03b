//! Workload configuration and its resolution into binary arguments.
//!
//! A workload is read from the `[workload]` table of a run file:
//!
//! ```toml
//! [workload]
//! clients = ["client.0", "client.1"]
//! ops = 1000
//! objects = 25
//!
//! [workload.op_weights]
//! read = 20
//! write = 10
//! ```
//!
//! Every key is optional. Missing keys fall back to the defaults below;
//! the stride sizes default to a fraction of `object_size`.

use rados_stress_types::{ClientRole, OpKind, DEFAULT_ROLE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::args::ArgumentVector;
use crate::error::ConfigError;

/// Default number of operations per client.
pub const DEFAULT_OPS: u64 = 10_000;
/// Default number of objects in the working set.
pub const DEFAULT_OBJECTS: u64 = 500;
/// Default bound on concurrent operations.
pub const DEFAULT_MAX_IN_FLIGHT: u64 = 16;
/// Default object size in bytes.
pub const DEFAULT_OBJECT_SIZE: u64 = 4_000_000;

/// Workload profile for one stress run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkloadConfig {
    /// Client roles to launch on (default: `["client.0"]`).
    #[serde(alias = "roles", skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<String>>,
    /// Operations per client (default: 10000).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ops: Option<u64>,
    /// Objects in the working set (default: 500).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objects: Option<u64>,
    /// Maximum operations in flight (default: 16).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<u64>,
    /// Object size in bytes (default: 4000000).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_size: Option<u64>,
    /// Minimum write stride in bytes (default: object_size / 10).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stride_size: Option<u64>,
    /// Maximum write stride in bytes (default: object_size / 5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stride_size: Option<u64>,
    /// Relative operation weights.
    pub op_weights: OpWeights,
}

/// Relative weights steering the binary's choice of operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpWeights {
    /// Weight of reads (default: 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<u64>,
    /// Weight of writes (default: 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write: Option<u64>,
    /// Weight of deletes (default: 10).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<u64>,
    /// Weight of snapshot creation (default: 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_create: Option<u64>,
    /// Weight of snapshot removal (default: 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_remove: Option<u64>,
    /// Weight of rollbacks (default: 0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback: Option<u64>,
}

impl OpWeights {
    /// Explicit weight for `kind`, if one was configured.
    pub fn explicit(&self, kind: OpKind) -> Option<u64> {
        match kind {
            OpKind::Read => self.read,
            OpKind::Write => self.write,
            OpKind::Delete => self.delete,
            OpKind::SnapCreate => self.snap_create,
            OpKind::SnapRemove => self.snap_remove,
            OpKind::Rollback => self.rollback,
        }
    }

    /// Effective weight for `kind`.
    pub fn get(&self, kind: OpKind) -> u64 {
        self.explicit(kind).unwrap_or_else(|| kind.default_weight())
    }

    /// Set the weight for `kind`.
    pub fn set(&mut self, kind: OpKind, weight: u64) {
        let slot = match kind {
            OpKind::Read => &mut self.read,
            OpKind::Write => &mut self.write,
            OpKind::Delete => &mut self.delete,
            OpKind::SnapCreate => &mut self.snap_create,
            OpKind::SnapRemove => &mut self.snap_remove,
            OpKind::Rollback => &mut self.rollback,
        };
        *slot = Some(weight);
    }
}

impl WorkloadConfig {
    /// Build a config from an already-parsed TOML value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotAMapping`] if `value` is not a table and
    /// [`ConfigError::Invalid`] if the table has the wrong shape. The result
    /// is validated before it is returned.
    pub fn from_value(value: toml::Value) -> Result<Self, ConfigError> {
        if !value.is_table() {
            return Err(ConfigError::NotAMapping(value.type_str()));
        }

        let config: Self = value
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Invalid(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let table: toml::Table =
            toml::from_str(s).map_err(|e| ConfigError::Invalid(e.message().to_string()))?;
        Self::from_value(toml::Value::Table(table))
    }

    /// Effective operation count.
    pub fn ops(&self) -> u64 {
        self.ops.unwrap_or(DEFAULT_OPS)
    }

    /// Effective object count.
    pub fn objects(&self) -> u64 {
        self.objects.unwrap_or(DEFAULT_OBJECTS)
    }

    /// Effective concurrency bound.
    pub fn max_in_flight(&self) -> u64 {
        self.max_in_flight.unwrap_or(DEFAULT_MAX_IN_FLIGHT)
    }

    /// Effective object size.
    pub fn object_size(&self) -> u64 {
        self.object_size.unwrap_or(DEFAULT_OBJECT_SIZE)
    }

    /// Effective minimum stride, derived from the object size when unset.
    pub fn min_stride_size(&self) -> u64 {
        self.min_stride_size.unwrap_or(self.object_size() / 10)
    }

    /// Effective maximum stride, derived from the object size when unset.
    pub fn max_stride_size(&self) -> u64 {
        self.max_stride_size.unwrap_or(self.object_size() / 5)
    }

    /// Parsed client roles, in configured order.
    ///
    /// Falls back to `client.0` when no clients are configured.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed or repeated role.
    pub fn client_roles(&self) -> Result<Vec<ClientRole>, ConfigError> {
        match &self.clients {
            Some(clients) => parse_roles(clients),
            None => parse_roles(&[DEFAULT_ROLE]),
        }
    }

    /// Check every invariant of the workload.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.client_roles()?;

        for (field, value) in [
            ("ops", self.ops()),
            ("objects", self.objects()),
            ("max_in_flight", self.max_in_flight()),
            ("object_size", self.object_size()),
            ("min_stride_size", self.min_stride_size()),
            ("max_stride_size", self.max_stride_size()),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }

        let (min, max, object_size) = (
            self.min_stride_size(),
            self.max_stride_size(),
            self.object_size(),
        );
        if min > max || max > object_size {
            return Err(ConfigError::StrideOrder {
                min,
                max,
                object_size,
            });
        }

        if OpKind::ALL.iter().all(|&k| self.op_weights.get(k) == 0) {
            return Err(ConfigError::NoWeight);
        }

        Ok(())
    }

    /// Resolve the positional arguments for the stress binary.
    ///
    /// The order is fixed: the six op weights, then ops, objects,
    /// max_in_flight, object_size, min_stride_size and max_stride_size.
    pub fn resolve(&self) -> Result<ArgumentVector, ConfigError> {
        self.validate()?;

        let weights = OpKind::ALL.iter().map(|&k| self.op_weights.get(k));
        let sizes = [
            self.ops(),
            self.objects(),
            self.max_in_flight(),
            self.object_size(),
            self.min_stride_size(),
            self.max_stride_size(),
        ];

        Ok(ArgumentVector::from_numbers(weights.chain(sizes)))
    }
}

/// Parse role strings, rejecting malformed and repeated entries.
pub fn parse_roles<S: AsRef<str>>(roles: &[S]) -> Result<Vec<ClientRole>, ConfigError> {
    let mut seen = HashSet::new();
    let mut parsed = Vec::with_capacity(roles.len());

    for role in roles {
        let role = ClientRole::parse(role.as_ref())?;
        if !seen.insert(role.clone()) {
            return Err(ConfigError::DuplicateRole(role.to_string()));
        }
        parsed.push(role);
    }

    Ok(parsed)
}
