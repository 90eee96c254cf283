//! dbt artifact loading and lineage
//!
//! This crate handles:
//! - Parsing manifest.json (dbt-generated artifacts)
//! - Caching parsed manifests per path
//! - Locating production / development manifests
//! - Lineage traversal (ancestors / descendants)

pub mod manifest;
pub mod store;
pub mod locator;
pub mod lineage;

pub use manifest::{Manifest, ManifestNode, ManifestMetadata, NodeConfig, ColumnDefinition, DependsOn, Dependencies, ManifestError};
pub use store::ManifestStore;
pub use locator::ManifestLocator;
pub use lineage::{Direction, LineageNode, LineageTree, FlatEntry, LineageWalker, FLATTEN_THRESHOLD};
