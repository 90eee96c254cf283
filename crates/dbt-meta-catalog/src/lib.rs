//! Live warehouse lookups (fallback level 3)
//!
//! Used only when a model is missing from both manifests, or is documented
//! without columns. Lookups go through the `bq` CLI so the user's existing
//! `gcloud` login is reused.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbt_meta_catalog::{BigQueryCli, TableRef, WarehouseGateway};
//!
//! let bq = BigQueryCli::from_path();
//! let table = TableRef::infer_from_model("core_client__events").unwrap();
//! let columns = bq.fetch_columns(&table).await;
//! ```

pub mod adapter;
pub mod bigquery;
pub mod mock;

pub use adapter::{WarehouseGateway, TableRef, TableMetadata, TableReference, Clustering, WarehouseColumn, FetchError, RetryPolicy};
pub use bigquery::BigQueryCli;
pub use mock::MockWarehouse;
