//! # stress-runner
//!
//! Launches one stress process per client role on its remote host and
//! guarantees every launched process is joined before the run scope ends.
//!
//! ## Pieces
//!
//! - [`Cluster`] resolves a role to exactly one [`Endpoint`]
//!   ([`Inventory`] reads the mapping from TOML)
//! - [`RemoteExecutor`] starts a process without waiting for it
//!   ([`SshExecutor`], [`LocalExecutor`], [`MockExecutor`])
//! - [`Supervisor`] ties them together: launch everything, run the
//!   caller's body, then join everything
//!
//! ## Example
//!
//! ```ignore
//! let supervisor = Supervisor::new(inventory, SshExecutor::default(), LaunchTemplate::default());
//! let args = workload.resolve()?;
//! supervisor
//!     .run(&["client.0", "client.1"], &args, |_clients| async { Ok::<_, Infallible>(()) })
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cluster;
pub mod error;
pub mod executor;
pub mod inventory;
pub mod supervisor;

pub use cluster::{Cluster, Endpoint, ResolutionError};
pub use error::{FailureReason, JoinError, ProcessFailure, ScopeError, StartError, SupervisorError};
pub use executor::{
    ExecError, ExitStatus, LocalExecutor, MockExecutor, MockOutcome, RemoteExecutor,
    RemoteProcess, SshExecutor, SshOptions,
};
pub use inventory::{HostEntry, Inventory, InventoryError};
pub use supervisor::{CompletedClient, JoinReport, LaunchedClient, RunningClients, Supervisor};
