//! Per-role command construction.
//!
//! The stress binary is started behind a fixed environment and wrapper
//! prefix. With the default test dir the command for `client.0` is:
//!
//! ```text
//! CEPH_CLIENT_ID=0 CEPH_CONF=/tmp/cephtest/ceph.conf \
//!   LD_LIBRARY_PATH=/tmp/cephtest/binary/usr/local/lib \
//!   /tmp/cephtest/enable-coredump \
//!   /tmp/cephtest/binary/usr/local/bin/ceph-coverage /tmp/cephtest/archive/coverage \
//!   /tmp/cephtest/binary/usr/local/bin/testrados <12 args>
//! ```

use rados_stress_types::ClientRole;
use serde::Serialize;
use std::borrow::Cow;

use crate::args::ArgumentVector;

/// Test directory the wrapper paths live under by default.
pub const DEFAULT_TEST_DIR: &str = "/tmp/cephtest";

/// Fixed part of every launch: environment, wrapper and executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTemplate {
    env: Vec<(String, String)>,
    wrapper: Vec<String>,
    executable: String,
}

impl LaunchTemplate {
    /// Template for a bare executable with no environment or wrapper.
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            env: Vec::new(),
            wrapper: Vec::new(),
            executable: executable.into(),
        }
    }

    /// The standard coverage-wrapped template rooted at `test_dir`.
    pub fn for_test_dir(test_dir: &str) -> Self {
        let dir = test_dir.trim_end_matches('/');
        Self {
            env: vec![
                ("CEPH_CONF".to_string(), format!("{dir}/ceph.conf")),
                (
                    "LD_LIBRARY_PATH".to_string(),
                    format!("{dir}/binary/usr/local/lib"),
                ),
            ],
            wrapper: vec![
                format!("{dir}/enable-coredump"),
                format!("{dir}/binary/usr/local/bin/ceph-coverage"),
                format!("{dir}/archive/coverage"),
            ],
            executable: format!("{dir}/binary/usr/local/bin/testrados"),
        }
    }

    /// Add an environment assignment.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Replace the wrapper tokens placed before the executable.
    pub fn with_wrapper<I, S>(mut self, wrapper: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.wrapper = wrapper.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the executable.
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// The executable path.
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Build the launch for one role.
    ///
    /// The role's `CEPH_CLIENT_ID` comes first, then the template
    /// environment, wrapper, executable and the shared arguments.
    pub fn spec_for(&self, role: &ClientRole, args: &ArgumentVector) -> LaunchSpec {
        let mut env = Vec::with_capacity(self.env.len() + 1);
        env.push(role.env());
        env.extend(self.env.iter().cloned());

        let mut program = self.wrapper.clone();
        program.push(self.executable.clone());

        LaunchSpec {
            env,
            program,
            args: args.clone(),
        }
    }
}

impl Default for LaunchTemplate {
    fn default() -> Self {
        Self::for_test_dir(DEFAULT_TEST_DIR)
    }
}

/// Everything needed to start one client's stress process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchSpec {
    /// Environment assignments, in order.
    pub env: Vec<(String, String)>,
    /// Wrapper tokens followed by the executable.
    pub program: Vec<String>,
    /// Resolved workload arguments (shared across roles).
    pub args: ArgumentVector,
}

impl LaunchSpec {
    /// Value of an environment assignment, if present.
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Full command line as separate tokens, env assignments first.
    pub fn command_line(&self) -> Vec<String> {
        self.env
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .chain(self.program.iter().cloned())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Command line as one string for a remote shell.
    pub fn shell_command(&self) -> String {
        let env = self
            .env
            .iter()
            .map(|(k, v)| format!("{k}={}", shell_quote(v)));
        let rest = self
            .program
            .iter()
            .chain(self.args.iter())
            .map(|token| shell_quote(token).into_owned());

        env.chain(rest).collect::<Vec<_>>().join(" ")
    }
}

/// Quote `token` for a POSIX shell if it contains anything unsafe.
pub fn shell_quote(token: &str) -> Cow<'_, str> {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:,+@%".contains(c));

    if safe {
        Cow::Borrowed(token)
    } else {
        Cow::Owned(format!("'{}'", token.replace('\'', r"'\''")))
    }
}
