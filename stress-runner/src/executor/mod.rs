//! Remote execution abstraction.
//!
//! An executor starts a client's stress process on an endpoint and hands
//! back a [`RemoteProcess`] without waiting for it to finish.
//!
//! # Design
//!
//! - `launch()` returns once the process is submitted
//! - `wait()` blocks until it exits
//! - `try_wait()` checks for an exit without blocking
//! - `kill()` asks the transport to stop it
//!
//! # Example
//!
//! ```ignore
//! let executor = SshExecutor::default();
//! let mut process = executor.launch(&endpoint, &spec).await?;
//! let status = process.wait().await?;
//! ```

mod child;
mod local;
mod mock;
mod ssh;

pub use local::LocalExecutor;
pub use mock::{MockExecutor, MockOutcome};
pub use ssh::{SshExecutor, SshOptions};

use async_trait::async_trait;
use rados_stress_core::LaunchSpec;
use std::fmt;
use thiserror::Error;

use crate::cluster::Endpoint;

/// Executor errors.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The transport process could not be spawned.
    #[error("spawn failed: {0}")]
    Spawn(std::io::Error),

    /// Waiting for the process failed.
    #[error("wait failed: {0}")]
    Wait(String),

    /// Killing the process failed.
    #[error("kill failed: {0}")]
    Kill(String),

    /// The transport refused the launch.
    #[error("launch rejected: {0}")]
    Rejected(String),
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Spawn(e)
    }
}

/// How a remote process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Exited with a status code.
    Exited(i32),
    /// Ended without a status code (killed by a signal).
    Terminated,
}

impl ExitStatus {
    /// True for a zero exit code.
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Exited(0))
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        status.code().map_or(ExitStatus::Terminated, ExitStatus::Exited)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Exited(code) => write!(f, "exit status {}", code),
            ExitStatus::Terminated => write!(f, "terminated by signal"),
        }
    }
}

/// Handle to a running client process.
#[async_trait]
pub trait RemoteProcess: Send {
    /// Wait for the process to exit.
    ///
    /// Must be cancel-safe: dropping the future leaves the process
    /// running and a later `wait()` still works.
    async fn wait(&mut self) -> Result<ExitStatus, ExecError>;

    /// Exit status if the process has already exited, without blocking.
    ///
    /// A process can exit while `wait()` is still draining its output;
    /// this reports it as exited.
    async fn try_wait(&mut self) -> Result<Option<ExitStatus>, ExecError>;

    /// Ask the process to stop.
    async fn kill(&mut self) -> Result<(), ExecError>;
}

/// Starts client processes on endpoints.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Start `spec` on `endpoint` without waiting for it to finish.
    async fn launch(
        &self,
        endpoint: &Endpoint,
        spec: &LaunchSpec,
    ) -> Result<Box<dyn RemoteProcess>, ExecError>;
}

#[async_trait]
impl<X: RemoteExecutor + ?Sized> RemoteExecutor for &X {
    async fn launch(
        &self,
        endpoint: &Endpoint,
        spec: &LaunchSpec,
    ) -> Result<Box<dyn RemoteProcess>, ExecError> {
        (**self).launch(endpoint, spec).await
    }
}
