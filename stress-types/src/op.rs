//! Operation kinds mixed by the stress binary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An operation kind the remote stress binary chooses between.
///
/// Weights for these kinds are passed positionally, in the order of
/// [`OpKind::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Read an object.
    Read,
    /// Write a stride into an object.
    Write,
    /// Delete an object.
    Delete,
    /// Create a pool snapshot.
    SnapCreate,
    /// Remove a pool snapshot.
    SnapRemove,
    /// Roll an object back to a snapshot.
    Rollback,
}

impl OpKind {
    /// All kinds, in argument order.
    pub const ALL: [OpKind; 6] = [
        OpKind::Read,
        OpKind::Write,
        OpKind::Delete,
        OpKind::SnapCreate,
        OpKind::SnapRemove,
        OpKind::Rollback,
    ];

    /// Configuration key for this kind.
    pub fn key(self) -> &'static str {
        match self {
            OpKind::Read => "read",
            OpKind::Write => "write",
            OpKind::Delete => "delete",
            OpKind::SnapCreate => "snap_create",
            OpKind::SnapRemove => "snap_remove",
            OpKind::Rollback => "rollback",
        }
    }

    /// Weight used when the configuration leaves this kind out.
    pub fn default_weight(self) -> u64 {
        match self {
            OpKind::Read | OpKind::Write => 100,
            OpKind::Delete => 10,
            OpKind::SnapCreate | OpKind::SnapRemove | OpKind::Rollback => 0,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_order_is_stable() {
        let keys: Vec<_> = OpKind::ALL.iter().map(|k| k.key()).collect();
        assert_eq!(
            keys,
            ["read", "write", "delete", "snap_create", "snap_remove", "rollback"]
        );
    }

    #[test]
    fn default_weights() {
        let weights: Vec<_> = OpKind::ALL.iter().map(|k| k.default_weight()).collect();
        assert_eq!(weights, [100, 100, 10, 0, 0, 0]);
    }

    #[test]
    fn serde_key_matches_config_key() {
        for kind in OpKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.key()));
        }
    }
}
