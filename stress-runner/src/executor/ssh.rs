//! SSH executor.
//!
//! Uses `tokio::process::Command` to shell out to `ssh`. Keys must be
//! pre-configured; `BatchMode=yes` makes a missing key fail fast instead
//! of prompting.
//!
//! Without a pty the remote command is not signalled when the channel
//! closes, so it runs under a small watcher: the command is started in the
//! background and a second job blocks reading the session's stdin. When
//! stdin reaches EOF (the local `ssh` was killed or closed its input) the
//! watcher sends the command SIGTERM. The remote exit status is the
//! command's own.

use async_trait::async_trait;
use rados_stress_core::LaunchSpec;
use serde::Deserialize;

use super::child::ChildProcess;
use super::{ExecError, RemoteExecutor, RemoteProcess};
use crate::cluster::Endpoint;

/// SSH client options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SshOptions {
    /// User for endpoints that do not name one (default: ssh's own default).
    #[serde(default)]
    pub user: Option<String>,
    /// Connection timeout in seconds (default: 30).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Verify host keys (default: false).
    #[serde(default)]
    pub strict_host_key_checking: bool,
    /// ssh binary to run (default: `ssh`).
    #[serde(default = "default_program")]
    pub program: String,
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_program() -> String {
    "ssh".to_string()
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            user: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            strict_host_key_checking: false,
            program: default_program(),
        }
    }
}

/// Starts client processes over SSH.
#[derive(Debug, Clone, Default)]
pub struct SshExecutor {
    options: SshOptions,
}

impl SshExecutor {
    /// Create an executor with the given options.
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    /// Arguments passed to the ssh binary for one launch.
    pub fn ssh_args(&self, endpoint: &Endpoint, spec: &LaunchSpec) -> Vec<String> {
        let strict = if self.options.strict_host_key_checking {
            "yes"
        } else {
            "no"
        };

        let mut args = vec![
            "-o".to_string(),
            format!("StrictHostKeyChecking={}", strict),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.options.connect_timeout_secs),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];

        if let Some(port) = endpoint.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }

        let destination = match (&endpoint.user, &self.options.user) {
            (None, Some(user)) => format!("{}@{}", user, endpoint.address),
            _ => endpoint.destination(),
        };
        args.push(destination);
        args.push(Self::remote_command(spec));
        args
    }

    /// Remote shell script that runs `spec` and kills it on hangup.
    pub fn remote_command(spec: &LaunchSpec) -> String {
        format!(
            "exec 3<&0; {} 3<&- </dev/null & pid=$!; \
             {{ cat <&3 >/dev/null; kill $pid; }} >/dev/null 2>&1 & \
             exec 3<&-; wait $pid",
            spec.shell_command()
        )
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn launch(
        &self,
        endpoint: &Endpoint,
        spec: &LaunchSpec,
    ) -> Result<Box<dyn RemoteProcess>, ExecError> {
        let args = self.ssh_args(endpoint, spec);
        tracing::debug!("ssh {}", args.join(" "));

        let mut command = tokio::process::Command::new(&self.options.program);
        command.args(&args);

        Ok(Box::new(ChildProcess::spawn(command)?))
    }
}
