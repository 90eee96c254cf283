//! Warehouse gateway trait for fetching live table metadata

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifies a table in the warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    /// Project id; the CLI's default project is used when absent
    pub project: Option<String>,

    /// Dataset name
    pub dataset: String,

    /// Table name
    pub table: String,
}

impl TableRef {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            project: None,
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// Set the project; empty strings mean "default project"
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        let project = project.into();
        self.project = (!project.is_empty()).then_some(project);
        self
    }

    /// Split a model name on its last `__` into dataset and table
    ///
    /// `core_client__events` becomes `core_client.events`; names without
    /// `__` cannot be mapped and yield `None`.
    pub fn infer_from_model(model_name: &str) -> Option<Self> {
        let (dataset, table) = model_name.rsplit_once("__")?;
        if dataset.is_empty() || table.is_empty() {
            return None;
        }
        Some(Self::new(dataset, table))
    }

    /// Name as the `bq` CLI expects it: `project:dataset.table` or `dataset.table`
    pub fn cli_name(&self) -> String {
        match &self.project {
            Some(project) => format!("{}:{}.{}", project, self.dataset, self.table),
            None => format!("{}.{}", self.dataset, self.table),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cli_name())
    }
}

/// Table metadata as reported by `bq show --format=json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableMetadata {
    pub table_reference: TableReference,

    /// TABLE, VIEW, MATERIALIZED_VIEW, EXTERNAL, ...
    #[serde(rename = "type")]
    pub table_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_partitioning: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustering: Option<Clustering>,

    /// Row count (the CLI reports it as a string)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_rows: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableReference {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Clustering {
    pub fields: Vec<String>,
}

/// A live column; `data_type` is always lower-cased
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseColumn {
    pub name: String,
    pub data_type: String,
}

impl WarehouseColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into().to_lowercase(),
        }
    }
}

/// Errors that can occur talking to the warehouse CLI
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Warehouse CLI not available: {0}")]
    CliNotFound(String),

    #[error("Command '{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Command '{0}' timed out")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::CommandFailed { .. } | Self::Timeout(_))
    }
}

/// Retry schedule for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry; doubled for every further retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Live warehouse lookups used as the last fallback level
///
/// Implementations never fail: anything that goes wrong is logged and
/// reported as `None` ("not available").
#[async_trait::async_trait]
pub trait WarehouseGateway: Send + Sync {
    /// Gateway name for logs and warnings (e.g., "BigQuery")
    fn name(&self) -> &'static str;

    /// Table existence / type / partitioning metadata
    async fn fetch_table_metadata(&self, table: &TableRef) -> Option<TableMetadata>;

    /// Column names and lower-cased types, in table order
    async fn fetch_columns(&self, table: &TableRef) -> Option<Vec<WarehouseColumn>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_ref_cli_name() {
        let table = TableRef::new("core", "events");
        assert_eq!(table.cli_name(), "core.events");

        let table = table.with_project("analytics-prod");
        assert_eq!(table.to_string(), "analytics-prod:core.events");

        let table = TableRef::new("core", "events").with_project("");
        assert_eq!(table.project, None);
    }

    #[test]
    fn infer_splits_on_last_separator() {
        let table = TableRef::infer_from_model("core__client__events").unwrap();
        assert_eq!(table.dataset, "core__client");
        assert_eq!(table.table, "events");

        let table = TableRef::infer_from_model("staging_sugarcrm__accounts").unwrap();
        assert_eq!(table.cli_name(), "staging_sugarcrm.accounts");

        assert!(TableRef::infer_from_model("single_word").is_none());
        assert!(TableRef::infer_from_model("trailing__").is_none());
    }

    #[test]
    fn retry_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(RetryPolicy::none().delay_for(1), Duration::ZERO);
    }

    #[test]
    fn transient_classification() {
        assert!(FetchError::Timeout("bq show".into()).is_transient());
        assert!(FetchError::CommandFailed { command: "bq show".into(), stderr: "boom".into() }.is_transient());
        assert!(!FetchError::InvalidResponse("eof".into()).is_transient());
        assert!(!FetchError::CliNotFound("bq".into()).is_transient());
    }

    #[test]
    fn metadata_parses_bq_output() {
        let json = r#"{
            "tableReference": {"projectId": "analytics-prod", "datasetId": "core", "tableId": "events"},
            "type": "TABLE",
            "timePartitioning": {"type": "DAY", "field": "event_date"},
            "clustering": {"fields": ["client_id", "event_type"]},
            "numRows": "1024",
            "schema": {"fields": []}
        }"#;

        let metadata: TableMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.table_reference.dataset_id, "core");
        assert_eq!(metadata.table_type, "TABLE");
        assert_eq!(metadata.clustering.unwrap().fields, vec!["client_id", "event_type"]);
        assert_eq!(metadata.num_rows.as_deref(), Some("1024"));
    }

    #[test]
    fn column_types_are_lowercased() {
        let column = WarehouseColumn::new("client_id", "INT64");
        assert_eq!(column.data_type, "int64");
    }
}
