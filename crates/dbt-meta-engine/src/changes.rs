//! Local change detection through version control
//!
//! Only an advisory signal for warnings: every failure (no git, not a
//! repository, timeout) reads as "not modified".

use std::sync::Arc;
use std::time::Duration;
use dbt_meta_core::process::{CommandRunner, RunError, TokioRunner};

/// Timeout for each git query
pub const GIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Version control query errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VcsError {
    #[error(transparent)]
    Unavailable(#[from] RunError),

    #[error("Command '{command}' failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// Read-only working tree status
#[async_trait::async_trait]
pub trait VersionControl: Send + Sync {
    /// Tracked files that differ from HEAD
    async fn changed_files(&self) -> Result<Vec<String>, VcsError>;

    /// Untracked and newly added files
    async fn new_files(&self) -> Result<Vec<String>, VcsError>;
}

/// [`VersionControl`] over the `git` executable
pub struct GitCli<R = TokioRunner> {
    runner: R,
    program: String,
}

impl GitCli<TokioRunner> {
    /// Use the `git` found on `PATH`
    pub fn from_path() -> Self {
        Self::new(TokioRunner::new())
    }
}

impl<R: CommandRunner> GitCli<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: "git".to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn git(&self, args: &[&str]) -> Result<String, VcsError> {
        let output = self.runner.run(&self.program, args, GIT_TIMEOUT).await?;

        if !output.success {
            return Err(VcsError::Failed {
                command: format!("{} {}", self.program, args.join(" ")),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait::async_trait]
impl<R: CommandRunner> VersionControl for GitCli<R> {
    async fn changed_files(&self) -> Result<Vec<String>, VcsError> {
        let stdout = self.git(&["diff", "--name-only", "HEAD"]).await?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn new_files(&self) -> Result<Vec<String>, VcsError> {
        let stdout = self.git(&["status", "--porcelain"]).await?;

        Ok(stdout
            .lines()
            .filter(|line| line.starts_with("??") || line.starts_with("A "))
            .filter_map(|line| line.get(3..))
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .collect())
    }
}

/// Answers "does this model have local changes?"
#[derive(Clone)]
pub struct ChangeDetector {
    vcs: Arc<dyn VersionControl>,
}

impl ChangeDetector {
    pub fn new(vcs: Arc<dyn VersionControl>) -> Self {
        Self { vcs }
    }

    /// Detector backed by `git` in the working directory
    pub fn git() -> Self {
        Self::new(Arc::new(GitCli::from_path()))
    }

    /// Whether the model's `.sql` file is modified, added or untracked
    pub async fn is_modified(&self, model_name: &str) -> bool {
        let stem = model_file_stem(model_name);

        match self.vcs.changed_files().await {
            Ok(files) if files.iter().any(|path| is_model_file(path, stem)) => return true,
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "change detection unavailable"),
        }

        match self.vcs.new_files().await {
            Ok(files) => files.iter().any(|path| is_model_file(path, stem)),
            Err(e) => {
                tracing::debug!(error = %e, "change detection unavailable");
                false
            }
        }
    }
}

/// File stem of a model: the text after its last `__`
pub fn model_file_stem(model_name: &str) -> &str {
    model_name
        .rsplit_once("__")
        .map(|(_, table)| table)
        .unwrap_or(model_name)
}

fn is_model_file(path: &str, stem: &str) -> bool {
    let file = format!("{}.sql", stem);
    path == file || path.ends_with(&format!("/{}", file))
}
