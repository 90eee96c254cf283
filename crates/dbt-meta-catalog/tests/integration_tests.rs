//! Integration tests for warehouse gateways
//!
//! The gateway is driven through a real subprocess (a fake `bq` script), and
//! the mock is checked against the same trait. Tests against a real BigQuery
//! project are marked `#[ignore]`:
//!
//! ```bash
//! # Run all non-ignored tests (no credentials required)
//! cargo test -p dbt-meta-catalog --test integration_tests
//!
//! # Run against BigQuery (requires `bq` and a gcloud login)
//! DBT_META_BQ_DATASET=core DBT_META_BQ_TABLE=events \
//! cargo test -p dbt-meta-catalog --test integration_tests -- --ignored
//! ```

mod fixtures;

use dbt_meta_catalog::{
    BigQueryCli, FetchError, MockWarehouse, RetryPolicy, TableMetadata, TableRef, WarehouseColumn,
    WarehouseGateway,
};
use dbt_meta_core::process::TokioRunner;
use pretty_assertions::assert_eq;
use std::time::Duration;

// =============================================================================
// Helper Functions
// =============================================================================

fn no_backoff() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::ZERO,
    }
}

#[cfg(unix)]
fn fake_gateway(dir: &std::path::Path) -> BigQueryCli<TokioRunner> {
    let program = fixtures::fake_bq(dir);
    BigQueryCli::new(TokioRunner::new().with_env("PYTHONPATH", ""))
        .with_program(program.to_string_lossy())
        .with_retry_policy(no_backoff())
}

// =============================================================================
// BigQuery CLI Gateway (fake `bq` subprocess)
// =============================================================================

#[cfg(unix)]
#[tokio::test]
async fn test_bq_columns_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let bq = fake_gateway(dir.path());

    let columns = bq.fetch_columns(&TableRef::new("core", "events")).await.unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();

    assert_eq!(names, vec!["event_id", "client_id", "event_ts", "payload"]);
    assert_eq!(columns[1], WarehouseColumn::new("client_id", "int64"));
    assert_eq!(columns[3].data_type, "record");
}

#[cfg(unix)]
#[tokio::test]
async fn test_bq_metadata_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let bq = fake_gateway(dir.path());

    let metadata = bq.metadata(&TableRef::new("core", "events")).await.unwrap();

    assert_eq!(metadata.table_reference.project_id, "analytics-prod");
    assert_eq!(metadata.table_type, "TABLE");
    assert_eq!(metadata.time_partitioning.unwrap()["field"], "event_ts");
    assert_eq!(metadata.labels["team"], "data-eng");
}

#[cfg(unix)]
#[tokio::test]
async fn test_bq_unknown_table_exhausts_retries() {
    let dir = tempfile::tempdir().unwrap();
    let bq = fake_gateway(dir.path());

    let result = bq.columns(&TableRef::new("core", "ghost")).await;
    match result {
        Err(FetchError::CommandFailed { stderr, .. }) => assert!(stderr.contains("Not found")),
        other => panic!("expected CommandFailed, got {:?}", other),
    }

    assert!(bq.fetch_columns(&TableRef::new("core", "ghost")).await.is_none());
}

#[cfg(unix)]
#[tokio::test]
async fn test_bq_garbled_output_is_invalid_response() {
    let dir = tempfile::tempdir().unwrap();
    let bq = fake_gateway(dir.path());

    let result = bq.metadata(&TableRef::new("core", "garbled")).await;
    assert!(matches!(result, Err(FetchError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_bq_missing_binary() {
    let bq = BigQueryCli::new(TokioRunner::new())
        .with_program("dbt-meta-no-such-bq")
        .with_retry_policy(no_backoff());

    let result = bq.columns(&TableRef::new("core", "events")).await;
    assert!(matches!(result, Err(FetchError::CliNotFound(_))));
}

// =============================================================================
// Mock Gateway Tests
// =============================================================================

#[tokio::test]
async fn test_mock_metadata_roundtrip_through_trait() {
    let warehouse = MockWarehouse::new();
    let table = TableRef::new("core", "events");
    let metadata: TableMetadata = serde_json::from_str(fixtures::EVENTS_METADATA).unwrap();
    warehouse.add_metadata(table.clone(), metadata.clone()).await;

    let gateway: &dyn WarehouseGateway = &warehouse;
    assert_eq!(gateway.fetch_table_metadata(&table).await, Some(metadata));
    assert_eq!(gateway.name(), "Mock");
}

#[tokio::test]
async fn test_mock_unavailable_warehouse() {
    let warehouse = MockWarehouse::unavailable();
    let table = TableRef::new("core", "events");

    assert!(warehouse.fetch_columns(&table).await.is_none());
    assert_eq!(warehouse.calls().await, vec!["columns core.events"]);
}

// =============================================================================
// Real BigQuery (requires credentials)
// =============================================================================

#[tokio::test]
#[ignore]
async fn test_bigquery_real_columns() {
    let (Ok(dataset), Ok(table)) = (
        std::env::var("DBT_META_BQ_DATASET"),
        std::env::var("DBT_META_BQ_TABLE"),
    ) else {
        eprintln!("Skipping: DBT_META_BQ_DATASET / DBT_META_BQ_TABLE not set");
        return;
    };

    let bq = BigQueryCli::from_path();
    let columns = bq.columns(&TableRef::new(dataset, table)).await.unwrap();

    assert!(!columns.is_empty());
    assert!(columns.iter().all(|c| c.data_type == c.data_type.to_lowercase()));
}
