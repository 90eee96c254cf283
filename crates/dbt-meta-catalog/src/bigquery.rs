//! BigQuery gateway over the `bq` command-line tool
//!
//! Uses the caller's existing `gcloud` login instead of managing
//! credentials:
//! - `bq version` (pre-flight, once per lookup, never retried)
//! - `bq show --format=json <table>` for table metadata
//! - `bq show --schema --format=prettyjson <table>` for columns
//!
//! Non-zero exits and timeouts are retried per [`RetryPolicy`]. Output that
//! is not valid JSON is returned as [`FetchError::InvalidResponse`] at once.

use std::time::Duration;
use serde::Deserialize;
use dbt_meta_core::process::{CommandRunner, RunError, TokioRunner};
use crate::adapter::{FetchError, RetryPolicy, TableMetadata, TableRef, WarehouseColumn, WarehouseGateway};

/// Timeout for the `bq version` pre-flight check
pub const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for each `bq show` attempt
pub const SHOW_TIMEOUT: Duration = Duration::from_secs(10);

/// BigQuery gateway
pub struct BigQueryCli<R = TokioRunner> {
    runner: R,
    program: String,
    retry: RetryPolicy,
    timeout: Duration,
}

impl BigQueryCli<TokioRunner> {
    /// Gateway running the `bq` found on `PATH`
    ///
    /// `PYTHONPATH` is cleared for the child so project-local Python modules
    /// cannot shadow the SDK's own.
    pub fn from_path() -> Self {
        Self::new(TokioRunner::new().with_env("PYTHONPATH", ""))
    }
}

impl<R: CommandRunner> BigQueryCli<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: "bq".to_string(),
            retry: RetryPolicy::default(),
            timeout: SHOW_TIMEOUT,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Per-attempt timeout for `bq show`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a different executable (e.g., an absolute path to `bq`)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Fetch table metadata, reporting why it failed
    pub async fn metadata(&self, table: &TableRef) -> Result<TableMetadata, FetchError> {
        self.preflight().await?;

        let name = table.cli_name();
        let stdout = self.show(&["show", "--format=json", &name]).await?;

        serde_json::from_str(&stdout)
            .map_err(|e| FetchError::InvalidResponse(format!("{}: {}", name, e)))
    }

    /// Fetch columns, reporting why it failed
    pub async fn columns(&self, table: &TableRef) -> Result<Vec<WarehouseColumn>, FetchError> {
        self.preflight().await?;

        let name = table.cli_name();
        let stdout = self
            .show(&["show", "--schema", "--format=prettyjson", &name])
            .await?;

        let fields: Vec<SchemaField> = serde_json::from_str(&stdout)
            .map_err(|e| FetchError::InvalidResponse(format!("{}: {}", name, e)))?;

        Ok(fields
            .into_iter()
            .map(|field| WarehouseColumn::new(field.name, field.field_type))
            .collect())
    }

    /// Make sure the CLI itself is installed and runs
    async fn preflight(&self) -> Result<(), FetchError> {
        match self.runner.run(&self.program, &["version"], VERSION_TIMEOUT).await {
            Ok(output) if output.success => Ok(()),
            Ok(output) => Err(FetchError::CliNotFound(format!(
                "'{} version' exited with {:?}: {}",
                self.program,
                output.status,
                output.stderr.trim()
            ))),
            Err(e) => Err(FetchError::CliNotFound(e.to_string())),
        }
    }

    /// Run a `bq show` variant with retries, returning stdout
    async fn show(&self, args: &[&str]) -> Result<String, FetchError> {
        let command = format!("{} {}", self.program, args.join(" "));
        let mut retry = 0;

        loop {
            let error = match self.runner.run(&self.program, args, self.timeout).await {
                Ok(output) if output.success => return Ok(output.stdout),
                Ok(output) => FetchError::CommandFailed {
                    command: command.clone(),
                    stderr: output.stderr.trim().to_string(),
                },
                Err(RunError::Timeout(_, _)) => FetchError::Timeout(command.clone()),
                Err(RunError::NotFound(program)) => FetchError::CliNotFound(program),
                Err(RunError::Io(_, message)) => FetchError::CommandFailed {
                    command: command.clone(),
                    stderr: message,
                },
            };

            if !error.is_transient() || retry >= self.retry.max_retries {
                return Err(error);
            }

            retry += 1;
            let delay = self.retry.delay_for(retry);
            tracing::debug!(%command, retry, ?delay, %error, "retrying warehouse command");
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl<R: CommandRunner> WarehouseGateway for BigQueryCli<R> {
    fn name(&self) -> &'static str {
        "BigQuery"
    }

    async fn fetch_table_metadata(&self, table: &TableRef) -> Option<TableMetadata> {
        match self.metadata(table).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "BigQuery metadata unavailable");
                None
            }
        }
    }

    async fn fetch_columns(&self, table: &TableRef) -> Option<Vec<WarehouseColumn>> {
        match self.columns(table).await {
            Ok(columns) => Some(columns),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "BigQuery columns unavailable");
                None
            }
        }
    }
}

/// One entry of `bq show --schema` output
#[derive(Debug, Deserialize)]
struct SchemaField {
    name: String,

    #[serde(rename = "type")]
    field_type: String,
}
