//! dbt-meta Core
//!
//! Shared domain types: configuration, structured warnings, resolved
//! locations and the subprocess seam.
//! Never rename warning types - they are part of the JSON output contract.

pub mod config;
pub mod location;
pub mod process;
pub mod report;
pub mod warning;

pub use config::{Config, ConfigError, RawConfig, SchemaSource, TableNameStrategy, sanitize_bigquery_name};
pub use location::ResolvedLocation;
pub use process::{CommandOutput, CommandRunner, RunError, TokioRunner};
pub use report::{WarningReport, WarningSummary};
pub use warning::{Severity, Warning, WarningKind};
