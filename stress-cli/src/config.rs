//! Run file loading for rados-stress.
//!
//! A run file is TOML (default: `rados-stress.toml`):
//!
//! ```toml
//! [workload]
//! clients = ["client.0", "client.1"]
//! ops = 1000
//!
//! [launch]
//! test_dir = "/tmp/cephtest"
//!
//! [ssh]
//! user = "ubuntu"
//!
//! [run]
//! executor = "ssh"
//! timeout_secs = 3600
//!
//! [[hosts]]
//! name = "smithi001"
//! address = "10.0.0.1"
//! roles = ["client.0"]
//! ```

use anyhow::{Context, Result};
use rados_stress_core::{ConfigError, LaunchTemplate, WorkloadConfig, DEFAULT_TEST_DIR};
use rados_stress_runner::{
    Endpoint, HostEntry, Inventory, LocalExecutor, RemoteExecutor, SshExecutor, SshOptions,
};
use rados_stress_types::ClientRole;
use serde::Deserialize;
use std::path::Path;

/// Root of a run file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunFile {
    /// Workload table, validated separately (default: empty table).
    #[serde(default = "empty_table")]
    pub workload: toml::Value,
    /// Launch template settings.
    #[serde(default)]
    pub launch: LaunchConfig,
    /// SSH client options.
    #[serde(default)]
    pub ssh: SshOptions,
    /// Run settings.
    #[serde(default)]
    pub run: RunSettings,
    /// Host inventory.
    #[serde(default)]
    pub hosts: Vec<HostEntry>,
}

/// Launch template settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchConfig {
    /// Directory the wrapper and binary live under (default: /tmp/cephtest).
    #[serde(default = "default_test_dir")]
    pub test_dir: String,
    /// Executable override.
    #[serde(default)]
    pub executable: Option<String>,
    /// Wrapper override; tokens placed before the executable.
    #[serde(default)]
    pub wrapper: Option<Vec<String>>,
}

/// How processes are started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Over SSH to each host.
    #[default]
    Ssh,
    /// On this machine.
    Local,
}

/// Run settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSettings {
    /// Executor to use (default: ssh).
    #[serde(default)]
    pub executor: ExecutorKind,
    /// Join timeout in seconds (default: none).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn empty_table() -> toml::Value {
    toml::Value::Table(toml::Table::new())
}

fn default_test_dir() -> String {
    DEFAULT_TEST_DIR.to_string()
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            test_dir: default_test_dir(),
            executable: None,
            wrapper: None,
        }
    }
}

impl LaunchConfig {
    /// Launch template for these settings.
    pub fn template(&self) -> LaunchTemplate {
        let mut template = LaunchTemplate::for_test_dir(&self.test_dir);
        if let Some(executable) = &self.executable {
            template = template.with_executable(executable.clone());
        }
        if let Some(wrapper) = &self.wrapper {
            template = template.with_wrapper(wrapper.iter().cloned());
        }
        template
    }
}

impl RunFile {
    /// Load a run file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read run file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to parse run file {}", path.display()))
    }

    /// Parse a run file from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// The validated workload.
    pub fn workload(&self) -> Result<WorkloadConfig, ConfigError> {
        WorkloadConfig::from_value(self.workload.clone())
    }

    /// Inventory for `roles`.
    ///
    /// With the local executor and no hosts listed, every role is placed
    /// on `localhost`.
    pub fn inventory(&self, roles: &[ClientRole]) -> Inventory {
        if self.hosts.is_empty() && self.run.executor == ExecutorKind::Local {
            return Inventory::single_host(Endpoint::new("localhost", "localhost"), roles);
        }
        Inventory::new(self.hosts.clone())
    }

    /// Executor selected by `[run] executor`.
    pub fn executor(&self) -> Box<dyn RemoteExecutor> {
        match self.run.executor {
            ExecutorKind::Ssh => Box::new(SshExecutor::new(self.ssh.clone())),
            ExecutorKind::Local => Box::new(LocalExecutor::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rados_stress_runner::Cluster;

    #[test]
    fn empty_file_uses_defaults() {
        let file = RunFile::from_toml_str("").unwrap();
        assert_eq!(file.run.executor, ExecutorKind::Ssh);
        assert_eq!(file.launch.test_dir, "/tmp/cephtest");
        assert_eq!(file.ssh.connect_timeout_secs, 30);
        assert!(file.hosts.is_empty());
        assert_eq!(file.workload().unwrap(), WorkloadConfig::default());
    }

    #[test]
    fn full_file() {
        let file = RunFile::from_toml_str(
            r#"
[workload]
clients = ["client.0", "client.1"]
ops = 50
objects = 10

[workload.op_weights]
snap_create = 3

[launch]
test_dir = "/srv/cephtest"

[ssh]
user = "ubuntu"
connect_timeout_secs = 5

[run]
timeout_secs = 600

[[hosts]]
name = "smithi001"
address = "10.0.0.1"
roles = ["client.0"]

[[hosts]]
name = "smithi002"
address = "10.0.0.2"
roles = ["client.1"]
"#,
        )
        .unwrap();

        let workload = file.workload().unwrap();
        assert_eq!(workload.ops(), 50);
        assert_eq!(workload.op_weights.snap_create, Some(3));
        assert_eq!(file.ssh.user.as_deref(), Some("ubuntu"));
        assert_eq!(file.run.timeout_secs, Some(600));
        assert_eq!(
            file.launch.template().executable(),
            "/srv/cephtest/binary/usr/local/bin/testrados"
        );

        let roles = workload.client_roles().unwrap();
        let inventory = file.inventory(&roles);
        assert_eq!(inventory.resolve_endpoint(&roles[1]).unwrap().name, "smithi002");
    }

    #[test]
    fn workload_must_be_a_table() {
        let file = RunFile::from_toml_str("workload = 5").unwrap();
        assert_eq!(file.workload().unwrap_err(), ConfigError::NotAMapping("integer"));
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(RunFile::from_toml_str("[rados]\nops = 1").is_err());
    }

    #[test]
    fn local_executor_defaults_to_localhost() {
        let file = RunFile::from_toml_str("[run]\nexecutor = \"local\"").unwrap();
        let roles = vec![ClientRole::parse("client.0").unwrap()];
        let endpoint = file.inventory(&roles).resolve_endpoint(&roles[0]).unwrap();
        assert_eq!(endpoint.address, "localhost");
    }

    #[test]
    fn launch_overrides() {
        let file = RunFile::from_toml_str(
            r#"
[launch]
executable = "/usr/bin/ceph_test_rados"
wrapper = []
"#,
        )
        .unwrap();

        let template = file.launch.template();
        let role = ClientRole::parse("client.0").unwrap();
        let args = WorkloadConfig::default().resolve().unwrap();
        let spec = template.spec_for(&role, &args);
        assert_eq!(spec.program, ["/usr/bin/ceph_test_rados"]);
    }

    #[test]
    fn missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = RunFile::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("absent.toml"));
    }
}
