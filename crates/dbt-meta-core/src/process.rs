//! Subprocess execution with per-call timeouts
//!
//! External tools (`bq`, `git`) are reached only through [`CommandRunner`], so
//! gateways can be tested against scripted fakes.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if terminated by a signal
    pub status: Option<i32>,

    /// Whether the process exited with code 0
    pub success: bool,

    /// Standard output (lossy UTF-8)
    pub stdout: String,

    /// Standard error (lossy UTF-8)
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Errors starting or waiting for a process
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Command '{0}' timed out after {1:?}")]
    Timeout(String, Duration),

    #[error("Failed to run '{0}': {1}")]
    Io(String, String),
}

/// Runs an external program and captures its output
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, giving up after `timeout`
    ///
    /// A non-zero exit is NOT an error here; callers inspect
    /// [`CommandOutput::success`].
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<CommandOutput, RunError>;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioRunner {
    /// Extra environment for every child process
    env: Vec<(String, String)>,
}

impl TokioRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an environment variable for every spawned process
    ///
    /// The `bq` launcher is a Python script; the CLI clears `PYTHONPATH` so
    /// a project's local modules cannot shadow the SDK's own.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[async_trait::async_trait]
impl CommandRunner for TokioRunner {
    async fn run(&self, program: &str, args: &[&str], timeout: Duration) -> Result<CommandOutput, RunError> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &self.env {
            command.env(key, value);
        }

        tracing::debug!(program, ?args, ?timeout, "running external command");

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Err(_) => return Err(RunError::Timeout(program.to_string(), timeout)),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RunError::NotFound(program.to_string()));
            }
            Ok(Err(e)) => return Err(RunError::Io(program.to_string(), e.to_string())),
            Ok(Ok(output)) => output,
        };

        Ok(CommandOutput {
            status: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
