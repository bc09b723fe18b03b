//! Static host inventory loaded from TOML.
//!
//! ```toml
//! [[hosts]]
//! name = "smithi001"
//! address = "smithi001.front.example"
//! user = "ubuntu"
//! roles = ["mon.a", "osd.0", "client.0"]
//! ```

use rados_stress_types::ClientRole;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cluster::{Cluster, Endpoint};

/// One host and the roles it carries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostEntry {
    /// Short host name.
    pub name: String,
    /// Address to connect to.
    pub address: String,
    /// SSH user override.
    #[serde(default)]
    pub user: Option<String>,
    /// SSH port override.
    #[serde(default)]
    pub port: Option<u16>,
    /// Roles assigned to this host. May include non-client roles.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl HostEntry {
    /// The endpoint for this host.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            name: self.name.clone(),
            address: self.address.clone(),
            user: self.user.clone(),
            port: self.port,
        }
    }

    /// True if this host carries `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Cluster backed by a fixed list of hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Inventory {
    /// Hosts in declaration order.
    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}

impl Inventory {
    /// Inventory from a list of hosts.
    pub fn new(hosts: Vec<HostEntry>) -> Self {
        Self { hosts }
    }

    /// Inventory that places every given role on one host.
    pub fn single_host(endpoint: Endpoint, roles: &[ClientRole]) -> Self {
        Self::new(vec![HostEntry {
            name: endpoint.name,
            address: endpoint.address,
            user: endpoint.user,
            port: endpoint.port,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }])
    }

    /// Parse an inventory from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Load an inventory from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, InventoryError> {
        let content = std::fs::read_to_string(path).map_err(|e| InventoryError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| InventoryError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

impl Cluster for Inventory {
    fn remotes_for(&self, role: &ClientRole) -> Vec<Endpoint> {
        self.hosts
            .iter()
            .filter(|h| h.has_role(role.as_str()))
            .map(HostEntry::endpoint)
            .collect()
    }
}

/// Inventory loading errors.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// Failed to read the inventory file.
    #[error("failed to read inventory {path}")]
    ReadError {
        /// Path to the inventory file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse the inventory file.
    #[error("failed to parse inventory {path}")]
    ParseError {
        /// Path to the inventory file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_HOSTS: &str = r#"
[[hosts]]
name = "smithi001"
address = "10.0.0.1"
user = "ubuntu"
roles = ["mon.a", "osd.0", "client.0"]

[[hosts]]
name = "smithi002"
address = "10.0.0.2"
port = 2222
roles = ["osd.1", "client.1"]
"#;

    fn role(s: &str) -> ClientRole {
        ClientRole::parse(s).unwrap()
    }

    #[test]
    fn inventory_from_toml_string() {
        let inventory = Inventory::from_toml_str(TWO_HOSTS).unwrap();
        assert_eq!(inventory.hosts.len(), 2);
        assert_eq!(inventory.hosts[0].user.as_deref(), Some("ubuntu"));
        assert_eq!(inventory.hosts[1].port, Some(2222));
    }

    #[test]
    fn resolves_each_client_to_its_host() {
        let inventory = Inventory::from_toml_str(TWO_HOSTS).unwrap();

        let a = inventory.resolve_endpoint(&role("client.0")).unwrap();
        assert_eq!(a.name, "smithi001");
        assert_eq!(a.destination(), "ubuntu@10.0.0.1");

        let b = inventory.resolve_endpoint(&role("client.1")).unwrap();
        assert_eq!(b.name, "smithi002");
        assert_eq!(b.port, Some(2222));
    }

    #[test]
    fn unassigned_role_does_not_resolve() {
        let inventory = Inventory::from_toml_str(TWO_HOSTS).unwrap();
        let err = inventory.resolve_endpoint(&role("client.9")).unwrap_err();
        assert!(err.matches.is_empty());
    }

    #[test]
    fn role_on_two_hosts_does_not_resolve() {
        let mut inventory = Inventory::from_toml_str(TWO_HOSTS).unwrap();
        inventory.hosts[1].roles.push("client.0".into());

        let err = inventory.resolve_endpoint(&role("client.0")).unwrap_err();
        assert_eq!(err.matches, ["smithi001", "smithi002"]);
    }

    #[test]
    fn single_host_carries_all_roles() {
        let roles = [role("client.0"), role("client.1")];
        let inventory = Inventory::single_host(Endpoint::new("local", "localhost"), &roles);
        for r in &roles {
            assert_eq!(inventory.resolve_endpoint(r).unwrap().name, "local");
        }
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Inventory::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, InventoryError::ReadError { .. }));
    }

    #[test]
    fn bad_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts.toml");
        std::fs::write(&path, "[[hosts]]\nname = 3\n").unwrap();

        let err = Inventory::from_file(&path).unwrap_err();
        assert!(matches!(err, InventoryError::ParseError { .. }));
        assert!(err.to_string().contains("hosts.toml"));
    }
}
