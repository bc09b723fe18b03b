//! A spawned transport process with its output forwarded to tracing.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::{ExecError, ExitStatus, RemoteProcess};

/// Child process started by [`super::SshExecutor`] or [`super::LocalExecutor`].
///
/// Stdin stays open until the process is joined. Stdout and stderr are
/// logged line by line in the span that was current at spawn time.
pub(crate) struct ChildProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    forwarders: Vec<JoinHandle<()>>,
    status: Option<ExitStatus>,
}

/// How long output is still forwarded after the process exits.
///
/// Anything the process left running in the background can hold its
/// stdout or stderr open indefinitely.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

impl ChildProcess {
    pub(crate) fn spawn(mut command: Command) -> Result<Self, ExecError> {
        command
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = command.spawn()?;
        let stdin = child.stdin.take();

        let mut forwarders = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(forward_lines(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(forward_lines(stderr, "stderr"));
        }

        Ok(Self {
            child,
            stdin,
            forwarders,
            status: None,
        })
    }
}

fn forward_lines<R>(reader: R, stream: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let span = tracing::Span::current();
    tokio::spawn(
        async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => tracing::info!(stream, "{}", line),
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(stream, "output closed: {}", e);
                        break;
                    }
                }
            }
        }
        .instrument(span),
    )
}

#[async_trait]
impl RemoteProcess for ChildProcess {
    async fn wait(&mut self) -> Result<ExitStatus, ExecError> {
        let status = match self.status {
            Some(status) => status,
            None => {
                let status: ExitStatus = self
                    .child
                    .wait()
                    .await
                    .map_err(|e| ExecError::Wait(e.to_string()))?
                    .into();
                self.status = Some(status);
                status
            }
        };

        self.stdin.take();
        let drained = tokio::time::timeout(OUTPUT_GRACE, async {
            while let Some(forwarder) = self.forwarders.first_mut() {
                let _ = forwarder.await;
                self.forwarders.remove(0);
            }
        })
        .await;
        if drained.is_err() {
            tracing::debug!("output still open {:?} after exit, detaching", OUTPUT_GRACE);
        }
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }

        Ok(status)
    }

    async fn try_wait(&mut self) -> Result<Option<ExitStatus>, ExecError> {
        if self.status.is_none() {
            self.status = self
                .child
                .try_wait()
                .map_err(|e| ExecError::Wait(e.to_string()))?
                .map(ExitStatus::from);
        }
        Ok(self.status)
    }

    async fn kill(&mut self) -> Result<(), ExecError> {
        // Closing stdin first lets a remote watcher see the hangup
        self.stdin.take();
        self.child
            .start_kill()
            .map_err(|e| ExecError::Kill(e.to_string()))
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}
