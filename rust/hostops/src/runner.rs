use async_trait::async_trait;
use serde_derive::Serialize;
use std::env;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::process::Stdio;
use thiserror::Error;
use thiserror_context::{impl_context, Context};
use tokio::process::Command;

/// A consistent wrapper around the ways a host command can fail before or
/// after producing an exit status.
#[derive(Debug, Error)]
pub enum ExecErrorInner {
    #[error("I/O Error")]
    InputOutput(#[from] io::Error),
    #[error("UTF8 Conversion Error")]
    UTF8(#[from] std::string::FromUtf8Error),
    #[error("Command exited with failure status: {0}")]
    Failed(String),
}
impl_context!(ExecError(ExecErrorInner));

/// Captured result of a finished host command.
#[derive(Debug, Serialize, PartialEq, Eq, Default, Clone)]
pub struct ExecOutput {
    /// Exit code, if the process exited normally rather than on a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a nonzero exit into an [`ExecError`], keeping whatever the
    /// command said on stderr so the operator has something to act on.
    pub fn require_success(self) -> Result<ExecOutput, ExecError> {
        if self.success() {
            Ok(self)
        } else {
            let detail = if self.stderr.trim().is_empty() {
                format!("exit code {:?}", self.code)
            } else {
                self.stderr.trim().to_string()
            };
            Err(ExecError::Base(ExecErrorInner::Failed(detail)))
        }
    }
}

/// The seam between provisioning logic and the host. Production code uses
/// [`HostRunner`]; tests substitute a fake that records invocations instead
/// of executing them.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program with arguments and capture its output. Spawn failures
    /// are errors; a nonzero exit is not (callers decide what that means).
    async fn run(&self, program: &str, args: &[&str]) -> Result<ExecOutput, ExecError>;

    /// Run a shell pipeline. Needed for the handful of steps the package
    /// tooling expects as pipelines (`curl | gpg --dearmor` and friends).
    async fn shell(&self, pipeline: &str) -> Result<ExecOutput, ExecError>;

    /// Whether `name` resolves to an executable on the PATH.
    fn has_binary(&self, name: &str) -> bool;
}

/// Production runner backed by `tokio::process`. Commands inherit the
/// caller's privileges; the provisioner expects to be invoked with whatever
/// elevation the host steps need.
#[derive(Debug, Default, Clone)]
pub struct HostRunner;

#[async_trait]
impl CommandRunner for HostRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ExecOutput, ExecError> {
        log::trace!("Running host command: {program} {args:?}");

        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let output = child.wait_with_output().await?;

        log::trace!("{program} exited with {:?}", output.status.code());

        Ok(ExecOutput {
            code: output.status.code(),
            stdout: String::from_utf8(output.stdout)?,
            stderr: String::from_utf8(output.stderr)?,
        })
    }

    async fn shell(&self, pipeline: &str) -> Result<ExecOutput, ExecError> {
        self.run("/usr/bin/env", &["bash", "-c", pipeline]).await
    }

    fn has_binary(&self, name: &str) -> bool {
        let Some(path) = env::var_os("PATH") else {
            return false;
        };
        env::split_paths(&path).any(|dir| {
            let candidate = dir.join(name);
            match std::fs::metadata(&candidate) {
                Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
                Err(_) => false,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let out = HostRunner
            .run("/usr/bin/env", &["echo", "pokey"])
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "pokey\n");
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_a_spawn_error() {
        let out = HostRunner.shell("exit 3").await.unwrap();
        assert_eq!(out.code, Some(3));
        assert!(out.require_success().is_err());
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let ret = HostRunner.run("/nonexistent/gumby", &[]).await;
        assert!(ret.is_err());
    }

    #[test]
    fn finds_binaries_on_path() {
        assert!(HostRunner.has_binary("env"));
        assert!(!HostRunner.has_binary("definitely-not-a-real-binary"));
    }
}
