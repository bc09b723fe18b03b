//! Launch every client and wait for all of them.

use anyhow::{Context, Result};
use rados_stress_runner::{LaunchedClient, Supervisor};
use std::future::Future;
use std::io;
use std::time::Duration;

use crate::config::RunFile;

/// Run the run command.
///
/// `timeout_secs` overrides `[run] timeout_secs`. With `hold_secs`, the
/// run stays open that long before joining; ctrl-c ends the hold early
/// and fails the run after every client has been joined.
pub async fn run(file: &RunFile, timeout_secs: Option<u64>, hold_secs: Option<u64>) -> Result<()> {
    run_until(file, timeout_secs, hold_secs, tokio::signal::ctrl_c()).await
}

/// [`run`] with the hold ended early by `interrupt` instead of ctrl-c.
async fn run_until<I>(
    file: &RunFile,
    timeout_secs: Option<u64>,
    hold_secs: Option<u64>,
    interrupt: I,
) -> Result<()>
where
    I: Future<Output = io::Result<()>>,
{
    let workload = file.workload().context("invalid workload")?;
    let roles = workload.client_roles().context("invalid workload")?;
    let args = workload.resolve().context("invalid workload")?;

    let executor = file.executor();
    let mut supervisor = Supervisor::new(
        file.inventory(&roles),
        executor.as_ref(),
        file.launch.template(),
    );
    if let Some(secs) = timeout_secs.or(file.run.timeout_secs) {
        supervisor = supervisor.with_join_timeout(Duration::from_secs(secs));
    }

    let role_names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
    tracing::info!("starting {} rados stress client(s)", role_names.len());

    let launched = supervisor
        .run(&role_names, &args, |clients| async move {
            for client in &clients {
                tracing::info!("{} running on {}", client.role, client.endpoint);
            }
            if let Some(secs) = hold_secs {
                hold(Duration::from_secs(secs), interrupt).await?;
            }
            Ok::<Vec<LaunchedClient>, io::Error>(clients)
        })
        .await
        .context("rados stress run failed")?;

    println!("{} client(s) finished cleanly", launched.len());
    Ok(())
}

/// Wait out `duration`, or fail once `interrupt` fires.
async fn hold<I>(duration: Duration, interrupt: I) -> io::Result<()>
where
    I: Future<Output = io::Result<()>>,
{
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        signal = interrupt => {
            signal?;
            tracing::warn!("interrupted, joining clients");
            Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted by ctrl-c"))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn local_file(extra: &str) -> RunFile {
        RunFile::from_toml_str(&format!(
            r#"
[workload]
clients = ["client.0", "client.1"]
ops = 5

[run]
executor = "local"
{extra}
"#
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn local_run_succeeds() {
        let file = local_file("[launch]\nexecutable = \"true\"\nwrapper = []");
        run(&file, None, Some(0)).await.unwrap();
    }

    #[tokio::test]
    async fn failing_client_fails_the_run() {
        let file = local_file(
            r#"[launch]
executable = "testrados"
wrapper = ["sh", "-c", "[ \"$CEPH_CLIENT_ID\" = 0 ]"]"#,
        );
        let err = run(&file, None, None).await.unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("client.1 on localhost"), "{msg}");
        assert!(!msg.contains("client.0 on"), "{msg}");
    }

    #[tokio::test]
    async fn interrupted_hold_fails_after_joining() {
        let file = local_file("[launch]\nexecutable = \"true\"\nwrapper = []");

        let started = std::time::Instant::now();
        let err = run_until(&file, None, Some(60), async { Ok(()) })
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(30));
        let msg = format!("{:#}", err);
        assert!(msg.contains("run body failed: interrupted by ctrl-c"), "{msg}");
        assert!(!msg.contains("client process(es) failed"), "{msg}");
    }

    #[tokio::test]
    async fn interrupted_hold_still_reports_failed_clients() {
        let file = local_file(
            r#"[launch]
executable = "testrados"
wrapper = ["sh", "-c", "exit $CEPH_CLIENT_ID"]"#,
        );

        let err = run_until(&file, None, Some(60), async { Ok(()) })
            .await
            .unwrap_err();

        let msg = format!("{:#}", err);
        assert!(msg.contains("interrupted by ctrl-c"), "{msg}");
        assert!(msg.contains("client.1 on localhost: exit status 1"), "{msg}");
    }

    #[tokio::test]
    async fn invalid_workload_launches_nothing() {
        let file = RunFile::from_toml_str("[workload]\nops = 0").unwrap();
        let err = run(&file, None, None).await.unwrap_err();
        assert!(format!("{:#}", err).contains("ops must be greater than zero"));
    }
}
