//! In-memory warehouse gateway for testing
//!
//! Returns predefined metadata and columns without running any CLI. Every
//! lookup is recorded so tests can assert which tables were queried (or
//! that the warehouse level was skipped entirely).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbt_meta_catalog::{MockWarehouse, TableRef, WarehouseColumn, WarehouseGateway};
//!
//! let warehouse = MockWarehouse::new();
//! warehouse
//!     .add_columns(TableRef::new("ghost", "table"), vec![WarehouseColumn::new("id", "INT64")])
//!     .await;
//!
//! let columns = warehouse.fetch_columns(&TableRef::new("ghost", "table")).await;
//! assert_eq!(warehouse.calls().await, vec!["columns ghost.table"]);
//! ```

use crate::adapter::{TableMetadata, TableRef, WarehouseColumn, WarehouseGateway};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mock warehouse gateway
#[derive(Clone, Default)]
pub struct MockWarehouse {
    /// Metadata by CLI table name
    metadata: Arc<RwLock<HashMap<String, TableMetadata>>>,

    /// Columns by CLI table name
    columns: Arc<RwLock<HashMap<String, Vec<WarehouseColumn>>>>,

    /// Every lookup, as `"<kind> <table>"`
    calls: Arc<RwLock<Vec<String>>>,

    /// Simulate an unreachable warehouse
    unavailable: bool,
}

impl MockWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every lookup with `None`
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Register table metadata
    pub async fn add_metadata(&self, table: TableRef, metadata: TableMetadata) {
        self.metadata.write().await.insert(table.cli_name(), metadata);
    }

    /// Register columns for a table
    pub async fn add_columns(&self, table: TableRef, columns: Vec<WarehouseColumn>) {
        self.columns.write().await.insert(table.cli_name(), columns);
    }

    /// Lookups made so far
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    async fn record(&self, kind: &str, table: &TableRef) {
        self.calls.write().await.push(format!("{} {}", kind, table.cli_name()));
    }
}

#[async_trait::async_trait]
impl WarehouseGateway for MockWarehouse {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn fetch_table_metadata(&self, table: &TableRef) -> Option<TableMetadata> {
        self.record("metadata", table).await;

        if self.unavailable {
            return None;
        }

        self.metadata.read().await.get(&table.cli_name()).cloned()
    }

    async fn fetch_columns(&self, table: &TableRef) -> Option<Vec<WarehouseColumn>> {
        self.record("columns", table).await;

        if self.unavailable {
            return None;
        }

        self.columns.read().await.get(&table.cli_name()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_registered_columns() {
        let warehouse = MockWarehouse::new();
        let table = TableRef::new("core", "events");
        warehouse
            .add_columns(table.clone(), vec![WarehouseColumn::new("id", "INT64")])
            .await;

        let columns = warehouse.fetch_columns(&table).await.unwrap();
        assert_eq!(columns[0].data_type, "int64");
        assert!(warehouse.fetch_columns(&TableRef::new("core", "other")).await.is_none());
        assert_eq!(warehouse.calls().await, vec!["columns core.events", "columns core.other"]);
    }

    #[tokio::test]
    async fn unavailable_answers_none_but_records() {
        let warehouse = MockWarehouse::unavailable();
        let table = TableRef::new("core", "events");
        warehouse.add_metadata(table.clone(), TableMetadata::default()).await;

        assert!(warehouse.fetch_table_metadata(&table).await.is_none());
        assert_eq!(warehouse.call_count().await, 1);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let warehouse = MockWarehouse::new();
        let clone = warehouse.clone();
        let table = TableRef::new("core", "events");
        clone.add_metadata(table.clone(), TableMetadata::default()).await;

        assert!(warehouse.fetch_table_metadata(&table).await.is_some());
        assert_eq!(clone.call_count().await, 1);
    }
}
