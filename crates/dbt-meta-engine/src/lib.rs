//! dbt-meta engine - lookups with fallback
//!
//! This crate implements the query logic:
//! - Production / development naming
//! - Local change detection (git)
//! - Three-level fallback: production manifest, development manifest, warehouse
//! - Per-command extractors behind the `MetaQuery` facade

pub mod naming;
pub mod changes;
pub mod fallback;
pub mod commands;

pub use naming::{production_location, development_location, DevNaming};
pub use changes::{ChangeDetector, GitCli, VcsError, VersionControl};
pub use fallback::{
    Extractor, FallbackLevel, FallbackResolver, FoundNode, LookupOptions, Mode, NodeOutcome, Resolution,
    ResolveError, WarehouseHit, WarehouseNeed,
};
pub use commands::{Column, ColumnDoc, Lineage, MetaQuery, ModelInfo, SearchHit};
