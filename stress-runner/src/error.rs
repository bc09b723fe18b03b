//! Error types for the supervisor.

use rados_stress_core::ConfigError;
use rados_stress_types::ClientRole;
use std::fmt;
use thiserror::Error;

use crate::cluster::ResolutionError;
use crate::executor::{ExecError, ExitStatus};

/// Failure while starting clients.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Roles or workload are malformed. Nothing was launched.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A role did not resolve to exactly one host.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The transport could not start a client's process.
    #[error("failed to launch {role} on {endpoint}: {error}")]
    Launch {
        /// Role being launched.
        role: ClientRole,
        /// Endpoint name.
        endpoint: String,
        /// Transport error.
        error: ExecError,
    },
}

/// Why a joined process counts as failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Exited non-zero or was killed by a signal.
    Exit(ExitStatus),
    /// Waiting on the process failed.
    Wait(String),
    /// Still running at the join deadline and was killed.
    TimedOut,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Exit(status) => write!(f, "{}", status),
            FailureReason::Wait(msg) => write!(f, "wait failed: {}", msg),
            FailureReason::TimedOut => write!(f, "timed out and was killed"),
        }
    }
}

/// One client whose process did not finish cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessFailure {
    /// The client's role.
    pub role: ClientRole,
    /// Endpoint name the process ran on.
    pub endpoint: String,
    /// What went wrong.
    pub reason: FailureReason,
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}: {}", self.role, self.endpoint, self.reason)
    }
}

/// One or more client processes failed.
///
/// Only raised after every tracked process has been waited on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinError {
    /// Failed clients, in launch order.
    pub failures: Vec<ProcessFailure>,
}

impl JoinError {
    /// Roles of the failed clients.
    pub fn roles(&self) -> Vec<&ClientRole> {
        self.failures.iter().map(|f| &f.role).collect()
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} client process(es) failed: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for JoinError {}

/// Starting clients failed.
///
/// Clients launched before the failure have already been joined; `join`
/// holds their failures, if any.
#[derive(Debug, Error)]
#[error("{error}{}", join_suffix(.join))]
pub struct StartError {
    /// What stopped the launch.
    pub error: SupervisorError,
    /// Failures among the clients launched before `error`.
    pub join: Option<JoinError>,
}

fn join_suffix(join: &Option<JoinError>) -> String {
    match join {
        Some(join) => format!(" (while joining earlier clients: {})", join),
        None => String::new(),
    }
}

/// Failure of a supervised run scope.
///
/// The first failure is reported; join failures that happened while
/// cleaning up after it are attached.
#[derive(Debug)]
pub enum ScopeError<E> {
    /// Launching failed.
    Start(StartError),
    /// The body failed. Every client was still joined.
    Body {
        /// The body's error.
        error: E,
        /// Join failures, if any.
        join: Option<JoinError>,
    },
    /// The body succeeded but some clients failed.
    Join(JoinError),
}

impl<E> ScopeError<E> {
    /// Join failures carried by this error, whichever stage it came from.
    pub fn join_error(&self) -> Option<&JoinError> {
        match self {
            ScopeError::Start(e) => e.join.as_ref(),
            ScopeError::Body { join, .. } => join.as_ref(),
            ScopeError::Join(e) => Some(e),
        }
    }
}

impl<E: fmt::Display> fmt::Display for ScopeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::Start(e) => write!(f, "{}", e),
            ScopeError::Body { error, join } => {
                write!(f, "run body failed: {}", error)?;
                if let Some(join) = join {
                    write!(f, " (and {})", join)?;
                }
                Ok(())
            }
            ScopeError::Join(e) => write!(f, "{}", e),
        }
    }
}

impl<E> std::error::Error for ScopeError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScopeError::Start(e) => e.source(),
            ScopeError::Body { error, .. } => error.source(),
            ScopeError::Join(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(role: &str, reason: FailureReason) -> ProcessFailure {
        ProcessFailure {
            role: ClientRole::parse(role).unwrap(),
            endpoint: "smithi001".into(),
            reason,
        }
    }

    #[test]
    fn join_error_lists_every_failure() {
        let err = JoinError {
            failures: vec![
                failure("client.1", FailureReason::Exit(ExitStatus::Exited(1))),
                failure("client.2", FailureReason::TimedOut),
            ],
        };
        assert_eq!(
            err.to_string(),
            "2 client process(es) failed: client.1 on smithi001: exit status 1; \
             client.2 on smithi001: timed out and was killed"
        );
        assert_eq!(err.roles().len(), 2);
    }

    #[test]
    fn start_error_mentions_join_failures() {
        let role = ClientRole::parse("client.3").unwrap();
        let err = StartError {
            error: SupervisorError::Resolution(ResolutionError {
                role,
                matches: vec![],
            }),
            join: Some(JoinError {
                failures: vec![failure(
                    "client.0",
                    FailureReason::Exit(ExitStatus::Terminated),
                )],
            }),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("role client.3 matched 0 hosts"));
        assert!(msg.contains("while joining earlier clients"));
        assert!(msg.contains("client.0 on smithi001: terminated by signal"));
    }

    #[test]
    fn scope_error_exposes_join_failures() {
        let join = JoinError {
            failures: vec![failure("client.0", FailureReason::Wait("eof".into()))],
        };
        let err: ScopeError<std::io::Error> = ScopeError::Body {
            error: std::io::Error::new(std::io::ErrorKind::Other, "body"),
            join: Some(join.clone()),
        };
        assert_eq!(err.join_error(), Some(&join));
        assert!(err.to_string().starts_with("run body failed: body (and 1 client"));
    }

    fn chain(err: &dyn std::error::Error) -> Vec<String> {
        let mut messages = vec![err.to_string()];
        let mut source = err.source();
        while let Some(e) = source {
            messages.push(e.to_string());
            source = e.source();
        }
        messages
    }

    fn assert_no_repeats(err: &dyn std::error::Error) {
        let messages = chain(err);
        for (i, later) in messages.iter().enumerate().skip(1) {
            assert!(
                !messages[..i].iter().any(|earlier| earlier.contains(later.as_str())),
                "{later:?} repeated in {messages:?}"
            );
        }
    }

    #[test]
    fn error_chains_do_not_repeat_messages() {
        let role = ClientRole::parse("client.9").unwrap();

        let resolution = StartError {
            error: SupervisorError::Resolution(ResolutionError {
                role: role.clone(),
                matches: vec![],
            }),
            join: None,
        };
        assert_eq!(chain(&resolution), ["role client.9 matched 0 hosts, expected exactly one"]);

        let launch = StartError {
            error: SupervisorError::Launch {
                role,
                endpoint: "smithi001".into(),
                error: ExecError::from(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no ssh",
                )),
            },
            join: None,
        };
        assert_eq!(
            launch.to_string(),
            "failed to launch client.9 on smithi001: spawn failed: no ssh"
        );
        assert_no_repeats(&launch);

        let config = SupervisorError::from(ConfigError::DuplicateRole("client.0".into()));
        assert_eq!(config.to_string(), "client role client.0 is listed more than once");
        assert_no_repeats(&config);

        let body: ScopeError<std::io::Error> = ScopeError::Body {
            error: std::io::Error::new(std::io::ErrorKind::Interrupted, "interrupted"),
            join: None,
        };
        assert_eq!(chain(&body), ["run body failed: interrupted"]);
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SupervisorError>();
        assert_send_sync::<StartError>();
        assert_send_sync::<ScopeError<std::io::Error>>();
    }
}
