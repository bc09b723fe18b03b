//! Mock executor for testing.
//!
//! Allows scripting per-client outcomes and capturing launches for verification.

use async_trait::async_trait;
use rados_stress_core::LaunchSpec;
use rados_stress_types::CLIENT_ID_ENV;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::{ExecError, ExitStatus, RemoteExecutor, RemoteProcess};
use crate::cluster::Endpoint;

/// Scripted behaviour of a mock process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Exit with this code as soon as it is waited on.
    Exit(i32),
    /// Never exit until killed.
    Hang,
    /// Fail the wait itself.
    WaitError(String),
}

/// Mock executor for testing.
///
/// Clients without a scripted outcome exit with status 0.
#[derive(Debug, Default)]
pub struct MockExecutor {
    inner: Arc<Mutex<MockExecutorInner>>,
}

#[derive(Debug, Default)]
struct MockExecutorInner {
    launches: Vec<(Endpoint, LaunchSpec)>,
    outcomes: HashMap<String, MockOutcome>,
    fail_launch: HashSet<String>,
    waited: Vec<String>,
    killed: Vec<String>,
}

impl MockExecutor {
    /// Create a new mock executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the outcome for the client with this id.
    pub fn set_outcome(&self, client_id: &str, outcome: MockOutcome) {
        let mut inner = self.inner.lock().unwrap();
        inner.outcomes.insert(client_id.to_string(), outcome);
    }

    /// Make the launch for this client id fail.
    pub fn fail_launch(&self, client_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_launch.insert(client_id.to_string());
    }

    /// Every successful launch, in order.
    pub fn launches(&self) -> Vec<(Endpoint, LaunchSpec)> {
        let inner = self.inner.lock().unwrap();
        inner.launches.clone()
    }

    /// Number of successful launches.
    pub fn launch_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.launches.len()
    }

    /// Client ids whose process finished waiting, in completion order.
    pub fn waited(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.waited.clone()
    }

    /// Client ids that were killed.
    pub fn killed(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.killed.clone()
    }
}

impl Clone for MockExecutor {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl RemoteExecutor for MockExecutor {
    async fn launch(
        &self,
        endpoint: &Endpoint,
        spec: &LaunchSpec,
    ) -> Result<Box<dyn RemoteProcess>, ExecError> {
        let client_id = spec.env_var(CLIENT_ID_ENV).unwrap_or_default().to_string();
        let mut inner = self.inner.lock().unwrap();

        if inner.fail_launch.contains(&client_id) {
            return Err(ExecError::Rejected(format!(
                "mock launch failure for client {}",
                client_id
            )));
        }

        inner.launches.push((endpoint.clone(), spec.clone()));
        let outcome = inner
            .outcomes
            .get(&client_id)
            .cloned()
            .unwrap_or(MockOutcome::Exit(0));

        Ok(Box::new(MockProcess {
            client_id,
            outcome,
            killed: false,
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct MockProcess {
    client_id: String,
    outcome: MockOutcome,
    killed: bool,
    inner: Arc<Mutex<MockExecutorInner>>,
}

#[async_trait]
impl RemoteProcess for MockProcess {
    async fn wait(&mut self) -> Result<ExitStatus, ExecError> {
        let result = match (&self.outcome, self.killed) {
            (_, true) => Ok(ExitStatus::Terminated),
            (MockOutcome::Exit(code), false) => Ok(ExitStatus::Exited(*code)),
            (MockOutcome::WaitError(msg), false) => Err(ExecError::Wait(msg.clone())),
            (MockOutcome::Hang, false) => std::future::pending().await,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.waited.push(self.client_id.clone());
        result
    }

    async fn try_wait(&mut self) -> Result<Option<ExitStatus>, ExecError> {
        match (&self.outcome, self.killed) {
            (_, true) => Ok(Some(ExitStatus::Terminated)),
            (MockOutcome::Exit(code), false) => Ok(Some(ExitStatus::Exited(*code))),
            (MockOutcome::WaitError(msg), false) => Err(ExecError::Wait(msg.clone())),
            (MockOutcome::Hang, false) => Ok(None),
        }
    }

    async fn kill(&mut self) -> Result<(), ExecError> {
        self.killed = true;
        let mut inner = self.inner.lock().unwrap();
        inner.killed.push(self.client_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rados_stress_core::{LaunchTemplate, WorkloadConfig};
    use rados_stress_types::ClientRole;

    fn spec(role: &str) -> LaunchSpec {
        let args = WorkloadConfig::default().resolve().unwrap();
        LaunchTemplate::default().spec_for(&ClientRole::parse(role).unwrap(), &args)
    }

    #[tokio::test]
    async fn records_launches_and_default_success() {
        let mock = MockExecutor::new();
        let endpoint = Endpoint::new("h", "10.0.0.1");

        let mut process = mock.launch(&endpoint, &spec("client.0")).await.unwrap();
        assert_eq!(process.wait().await.unwrap(), ExitStatus::Exited(0));

        assert_eq!(mock.launch_count(), 1);
        assert_eq!(mock.launches()[0].0, endpoint);
        assert_eq!(mock.waited(), ["0"]);
    }

    #[tokio::test]
    async fn scripted_outcomes() {
        let mock = MockExecutor::new();
        mock.set_outcome("1", MockOutcome::Exit(3));
        mock.set_outcome("2", MockOutcome::WaitError("lost connection".into()));
        let endpoint = Endpoint::new("h", "10.0.0.1");

        let mut one = mock.launch(&endpoint, &spec("client.1")).await.unwrap();
        assert_eq!(one.wait().await.unwrap(), ExitStatus::Exited(3));

        let mut two = mock.launch(&endpoint, &spec("client.2")).await.unwrap();
        assert!(matches!(two.wait().await, Err(ExecError::Wait(_))));
    }

    #[tokio::test]
    async fn hung_process_ends_after_kill() {
        let mock = MockExecutor::new();
        mock.set_outcome("0", MockOutcome::Hang);
        let endpoint = Endpoint::new("h", "10.0.0.1");

        let mut process = mock.launch(&endpoint, &spec("client.0")).await.unwrap();
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), process.wait()).await;
        assert!(waited.is_err());

        assert_eq!(process.try_wait().await.unwrap(), None);

        process.kill().await.unwrap();
        assert_eq!(process.try_wait().await.unwrap(), Some(ExitStatus::Terminated));
        assert_eq!(process.wait().await.unwrap(), ExitStatus::Terminated);
        assert_eq!(mock.killed(), ["0"]);
    }

    #[tokio::test]
    async fn launch_failure_is_not_recorded() {
        let mock = MockExecutor::new();
        mock.fail_launch("0");

        let result = mock
            .launch(&Endpoint::new("h", "10.0.0.1"), &spec("client.0"))
            .await;
        assert!(matches!(result, Err(ExecError::Rejected(_))));
        assert_eq!(mock.launch_count(), 0);
    }
}
