//! Local executor: runs the command line through `sh -c` on this machine.
//!
//! The command is run as `exec env <command line>` so the stress process
//! replaces the shell and a kill reaches it directly.

use async_trait::async_trait;
use rados_stress_core::LaunchSpec;

use super::child::ChildProcess;
use super::{ExecError, RemoteExecutor, RemoteProcess};
use crate::cluster::Endpoint;

/// Starts client processes locally, ignoring the endpoint address.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    _private: (),
}

impl LocalExecutor {
    /// Create a local executor.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    async fn launch(
        &self,
        endpoint: &Endpoint,
        spec: &LaunchSpec,
    ) -> Result<Box<dyn RemoteProcess>, ExecError> {
        let command_line = format!("exec env {}", spec.shell_command());
        tracing::debug!("local launch for {}: {}", endpoint, command_line);

        let mut command = tokio::process::Command::new("sh");
        command.arg("-c").arg(command_line);

        Ok(Box::new(ChildProcess::spawn(command)?))
    }
}
