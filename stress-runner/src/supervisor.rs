//! Launch/join supervision of client processes.
//!
//! [`Supervisor::run`] is the scoped entry point:
//!
//! 1. validate every role (nothing is launched if one is bad)
//! 2. resolve each role to its host and launch its process
//! 3. run the caller's body while the processes run
//! 4. join every launched process, whatever the body did
//!
//! If step 2 fails part way, the clients already started are joined
//! before the error is returned.

use futures_util::future::join_all;
use futures_util::FutureExt;
use rados_stress_core::workload::parse_roles;
use rados_stress_core::{ArgumentVector, LaunchTemplate};
use rados_stress_types::ClientRole;
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Instrument, Span};

use crate::cluster::{Cluster, Endpoint};
use crate::error::{FailureReason, JoinError, ProcessFailure, ScopeError, StartError, SupervisorError};
use crate::executor::{ExecError, ExitStatus, RemoteExecutor, RemoteProcess};

/// How long to wait for a killed process to be reaped.
const KILL_GRACE: Duration = Duration::from_secs(10);

/// A client that was launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchedClient {
    /// The client's role.
    pub role: ClientRole,
    /// Host the process runs on.
    pub endpoint: Endpoint,
}

/// A client that finished cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedClient {
    /// The client.
    pub client: LaunchedClient,
    /// Its exit status.
    pub status: ExitStatus,
}

/// Outcome of a fully successful join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinReport {
    /// Every client, in launch order.
    pub completed: Vec<CompletedClient>,
}

struct Tracked {
    client: LaunchedClient,
    process: Box<dyn RemoteProcess>,
    span: Span,
}

/// Processes launched by one run, keyed by client id in launch order.
///
/// Consumed by [`RunningClients::join`]. Dropping it without joining
/// leaves the processes running and logs a warning.
pub struct RunningClients {
    tracked: Vec<Tracked>,
    join_timeout: Option<Duration>,
    span: Span,
}

impl RunningClients {
    fn new(join_timeout: Option<Duration>, span: Span) -> Self {
        Self {
            tracked: Vec::new(),
            join_timeout,
            span,
        }
    }

    fn insert(&mut self, client: LaunchedClient, process: Box<dyn RemoteProcess>, span: Span) {
        // Duplicate roles are rejected before launch, so ids are unique here
        debug_assert!(!self.contains(client.role.id()));
        self.tracked.push(Tracked {
            client,
            process,
            span,
        });
    }

    /// Number of tracked processes.
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    /// True if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// True if a process is tracked for this client id.
    pub fn contains(&self, client_id: &str) -> bool {
        self.tracked.iter().any(|t| t.client.role.id() == client_id)
    }

    /// Launched clients, in launch order.
    pub fn clients(&self) -> Vec<LaunchedClient> {
        self.tracked.iter().map(|t| t.client.clone()).collect()
    }

    /// Wait for every tracked process.
    ///
    /// All processes are waited on concurrently, and every one is waited
    /// on even if others fail. With a join timeout, processes still
    /// running at the deadline are killed and reported as timed out.
    ///
    /// # Errors
    ///
    /// Returns a [`JoinError`] listing every client that did not exit 0.
    pub async fn join(mut self) -> Result<JoinReport, JoinError> {
        let tracked = std::mem::take(&mut self.tracked);
        if tracked.is_empty() {
            return Ok(JoinReport::default());
        }

        let deadline = self.join_timeout.map(|t| Instant::now() + t);
        let span = self.span.clone();

        async move {
            tracing::info!("joining {} client(s)", tracked.len());
            let results = join_all(tracked.into_iter().map(|t| wait_one(t, deadline))).await;

            let mut completed = Vec::new();
            let mut failures = Vec::new();
            for result in results {
                match result {
                    Ok(done) => completed.push(done),
                    Err(failure) => failures.push(failure),
                }
            }

            if failures.is_empty() {
                tracing::info!("all {} client(s) finished", completed.len());
                Ok(JoinReport { completed })
            } else {
                tracing::error!(
                    "{} of {} client(s) failed",
                    failures.len(),
                    failures.len() + completed.len()
                );
                Err(JoinError { failures })
            }
        }
        .instrument(span)
        .await
    }
}

impl Drop for RunningClients {
    fn drop(&mut self) {
        if self.tracked.is_empty() {
            return;
        }
        let roles: Vec<String> = self.tracked.iter().map(|t| t.client.role.to_string()).collect();
        self.span.in_scope(|| {
            tracing::warn!(
                "dropping {} unjoined client process(es): {}",
                roles.len(),
                roles.join(", ")
            )
        });
    }
}

async fn wait_one(
    mut tracked: Tracked,
    deadline: Option<Instant>,
) -> Result<CompletedClient, ProcessFailure> {
    let span = tracked.span.clone();

    async move {
        let waited = match deadline {
            Some(deadline) => {
                let outcome = tokio::time::timeout_at(deadline, tracked.process.wait()).await;
                match outcome {
                    Ok(waited) => waited,
                    Err(_) => match tracked.process.try_wait().await {
                        Ok(Some(status)) => {
                            tracing::debug!("exited with {} before the deadline", status);
                            Ok(status)
                        }
                        _ => {
                            tracing::warn!("still running at join deadline, killing");
                            if let Err(e) = tracked.process.kill().await {
                                tracing::warn!("kill failed: {}", e);
                            }
                            let reaped =
                                tokio::time::timeout(KILL_GRACE, tracked.process.wait()).await;
                            if reaped.is_err() {
                                tracing::warn!(
                                    "process not reaped within {:?} of kill",
                                    KILL_GRACE
                                );
                            }
                            return Err(failure(tracked.client, FailureReason::TimedOut));
                        }
                    },
                }
            }
            None => tracked.process.wait().await,
        };

        match waited {
            Ok(status) if status.success() => {
                tracing::info!("finished with {}", status);
                Ok(CompletedClient {
                    client: tracked.client,
                    status,
                })
            }
            Ok(status) => {
                tracing::error!("failed with {}", status);
                Err(failure(tracked.client, FailureReason::Exit(status)))
            }
            Err(e) => {
                tracing::error!("wait failed: {}", e);
                let reason = match e {
                    ExecError::Wait(msg) => msg,
                    other => other.to_string(),
                };
                Err(failure(tracked.client, FailureReason::Wait(reason)))
            }
        }
    }
    .instrument(span)
    .await
}

fn failure(client: LaunchedClient, reason: FailureReason) -> ProcessFailure {
    ProcessFailure {
        role: client.role,
        endpoint: client.endpoint.name,
        reason,
    }
}

/// Launches one stress process per client role and joins them all.
///
/// A supervisor can be reused for consecutive runs, but each run's
/// [`RunningClients`] belongs to that run alone.
pub struct Supervisor<C, X> {
    cluster: C,
    executor: X,
    template: LaunchTemplate,
    join_timeout: Option<Duration>,
    parent: Option<Span>,
}

impl<C: Cluster, X: RemoteExecutor> Supervisor<C, X> {
    /// Create a supervisor with no join timeout.
    pub fn new(cluster: C, executor: X, template: LaunchTemplate) -> Self {
        Self {
            cluster,
            executor,
            template,
            join_timeout: None,
            parent: None,
        }
    }

    /// Bound the join phase; stragglers are killed at the deadline.
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = Some(timeout);
        self
    }

    /// Parent span for every run's logging.
    pub fn with_span(mut self, span: Span) -> Self {
        self.parent = Some(span);
        self
    }

    /// The cluster used for resolution.
    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    /// The executor used for launches.
    pub fn executor(&self) -> &X {
        &self.executor
    }

    /// The launch template.
    pub fn template(&self) -> &LaunchTemplate {
        &self.template
    }

    fn run_span(&self) -> Span {
        let uuid = uuid::Uuid::new_v4().as_simple().to_string();
        let run_id = &uuid[..12];
        match &self.parent {
            Some(parent) => tracing::info_span!(parent: parent, "rados", run = %run_id),
            None => tracing::info_span!("rados", run = %run_id),
        }
    }

    /// Launch one process per role.
    ///
    /// Roles are validated before anything is launched. If a later role
    /// fails to resolve or launch, the clients already started are joined
    /// before the error is returned.
    pub async fn launch<S: AsRef<str>>(
        &self,
        roles: &[S],
        args: &ArgumentVector,
    ) -> Result<RunningClients, StartError> {
        let roles = parse_roles(roles).map_err(|e| StartError {
            error: e.into(),
            join: None,
        })?;

        let span = self.run_span();
        let mut running = RunningClients::new(self.join_timeout, span.clone());

        let launched = self
            .launch_all(&roles, args, &mut running)
            .instrument(span.clone())
            .await;

        match launched {
            Ok(()) => Ok(running),
            Err(error) => {
                span.in_scope(|| {
                    tracing::error!("{}; joining {} launched client(s)", error, running.len())
                });
                let join = running.join().await.err();
                Err(StartError { error, join })
            }
        }
    }

    async fn launch_all(
        &self,
        roles: &[ClientRole],
        args: &ArgumentVector,
        running: &mut RunningClients,
    ) -> Result<(), SupervisorError> {
        tracing::info!("launching {} client(s)", roles.len());

        for role in roles {
            let endpoint = self.cluster.resolve_endpoint(role)?;
            let span = tracing::info_span!("client", role = %role, host = %endpoint);
            let spec = self.template.spec_for(role, args);

            let process = self
                .executor
                .launch(&endpoint, &spec)
                .instrument(span.clone())
                .await
                .map_err(|error| SupervisorError::Launch {
                    role: role.clone(),
                    endpoint: endpoint.name.clone(),
                    error,
                })?;

            span.in_scope(|| tracing::info!("launched"));
            running.insert(
                LaunchedClient {
                    role: role.clone(),
                    endpoint,
                },
                process,
                span,
            );
        }

        Ok(())
    }

    /// Run `body` while every role's process runs, then join them all.
    ///
    /// The join happens whether the body returns `Ok`, returns `Err` or
    /// panics. A panic is resumed after the join.
    ///
    /// # Errors
    ///
    /// - [`ScopeError::Start`] if launching failed
    /// - [`ScopeError::Body`] if the body failed
    /// - [`ScopeError::Join`] if the body succeeded but a client failed
    pub async fn run<S, F, Fut, T, E>(
        &self,
        roles: &[S],
        args: &ArgumentVector,
        body: F,
    ) -> Result<T, ScopeError<E>>
    where
        S: AsRef<str>,
        F: FnOnce(Vec<LaunchedClient>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let running = self.launch(roles, args).await.map_err(ScopeError::Start)?;
        let clients = running.clients();

        let outcome = AssertUnwindSafe(async move { body(clients).await })
            .catch_unwind()
            .await;
        let joined = running.join().await;

        match outcome {
            Err(panic) => {
                if let Err(join) = &joined {
                    tracing::error!("run body panicked; {}", join);
                }
                std::panic::resume_unwind(panic)
            }
            Ok(Err(error)) => Err(ScopeError::Body {
                error,
                join: joined.err(),
            }),
            Ok(Ok(value)) => joined.map(|_| value).map_err(ScopeError::Join),
        }
    }
}
