//! The positional argument vector handed to the stress binary.

use serde::{Serialize, Serializer};
use std::ops::Deref;
use std::sync::Arc;

/// Number of positional arguments the stress binary takes.
pub const ARG_COUNT: usize = 12;

/// Immutable, cheaply cloned list of resolved arguments.
///
/// One vector is built per run and shared by every client launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentVector(Arc<[String]>);

impl ArgumentVector {
    pub(crate) fn from_numbers(values: impl IntoIterator<Item = u64>) -> Self {
        let args: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        debug_assert_eq!(args.len(), ARG_COUNT);
        Self(args.into())
    }

    /// The arguments as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// True if both vectors share the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for ArgumentVector {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Serialize for ArgumentVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage() {
        let args = ArgumentVector::from_numbers(1..=12);
        let copy = args.clone();
        assert!(args.ptr_eq(&copy));
        assert_eq!(copy.len(), ARG_COUNT);
        assert_eq!(copy[0], "1");
        assert_eq!(copy[11], "12");
    }

    #[test]
    fn serializes_as_string_list() {
        let args = ArgumentVector::from_numbers([0; 12]);
        let json = serde_json::to_string(&args).unwrap();
        assert_eq!(json, format!("[{}]", vec!["\"0\""; 12].join(",")));
    }
}
