//! Role to host resolution.

use rados_stress_types::ClientRole;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A physical host a client process can be started on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Short host name used in logs.
    pub name: String,
    /// Address to connect to (hostname or IP).
    pub address: String,
    /// SSH user, if not the transport's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// SSH port, if not 22.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Endpoint {
    /// Endpoint with no user or port override.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            user: None,
            port: None,
        }
    }

    /// `user@address`, or just the address.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.address),
            None => self.address.clone(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A role did not resolve to exactly one host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "role {role} matched {} hosts, expected exactly one{}",
    .matches.len(),
    list_suffix(.matches)
)]
pub struct ResolutionError {
    /// The role being resolved.
    pub role: ClientRole,
    /// Names of every host that matched.
    pub matches: Vec<String>,
}

fn list_suffix(matches: &[String]) -> String {
    if matches.is_empty() {
        String::new()
    } else {
        format!(" ({})", matches.join(", "))
    }
}

/// Source of role to host assignments.
pub trait Cluster: Send + Sync {
    /// Every host carrying `role`.
    fn remotes_for(&self, role: &ClientRole) -> Vec<Endpoint>;

    /// The single host carrying `role`.
    ///
    /// # Errors
    ///
    /// Fails if zero or several hosts carry the role.
    fn resolve_endpoint(&self, role: &ClientRole) -> Result<Endpoint, ResolutionError> {
        let mut remotes = self.remotes_for(role);
        if remotes.len() == 1 {
            return Ok(remotes.remove(0));
        }

        Err(ResolutionError {
            role: role.clone(),
            matches: remotes.into_iter().map(|e| e.name).collect(),
        })
    }
}

impl<C: Cluster + ?Sized> Cluster for &C {
    fn remotes_for(&self, role: &ClientRole) -> Vec<Endpoint> {
        (**self).remotes_for(role)
    }
}
