//! Structured warnings attached to lookup results
//!
//! IMPORTANT: Warning types are part of the JSON output contract.
//! NEVER rename or remove a type - scripts and agents match on them.
//! Add new types with new names only.

use serde::{Deserialize, Serialize};

/// Warning type registry
///
/// Serialized in snake_case (`git_mismatch`, `bigquery_fallback`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    // Change detection
    /// Model file is modified locally but production was queried
    GitMismatch,

    /// Dev mode requested for a model without local changes
    DevWithoutChanges,

    /// Dev mode requested but no development manifest exists
    DevManifestMissing,

    // Fallback levels
    /// Production manifest missing; lookup continued with lower levels
    ProdManifestMissing,

    /// Answer served from the development manifest (LEVEL 2)
    DevManifestFallback,

    /// Answer served from the live warehouse (LEVEL 3)
    BigqueryFallback,

    // Configuration
    /// Invalid configuration value replaced by its default
    InvalidConfig,

    /// Deprecated configuration variable in use
    DeprecatedConfig,

    /// Development table pattern could not be applied
    InvalidTablePattern,

    /// Name rewritten to satisfy BigQuery naming rules
    BigqueryName,
}

impl WarningKind {
    /// Stable string identifier, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitMismatch => "git_mismatch",
            Self::DevWithoutChanges => "dev_without_changes",
            Self::DevManifestMissing => "dev_manifest_missing",
            Self::ProdManifestMissing => "prod_manifest_missing",
            Self::DevManifestFallback => "dev_manifest_fallback",
            Self::BigqueryFallback => "bigquery_fallback",
            Self::InvalidConfig => "invalid_config",
            Self::DeprecatedConfig => "deprecated_config",
            Self::InvalidTablePattern => "invalid_table_pattern",
            Self::BigqueryName => "bigquery_name",
        }
    }
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Warning severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Something the user should look at, result still usable
    Warning,

    /// Configuration problem the user must fix
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A structured warning
///
/// Produced once and never mutated afterwards. Warnings never block a
/// successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Stable warning type
    #[serde(rename = "type")]
    pub kind: WarningKind,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Longer explanation
    pub detail: String,

    /// Suggested fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    /// Fallback level that produced the answer ("LEVEL 2", "LEVEL 3")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Warning {
    /// Create a new warning with minimal fields
    pub fn new(
        kind: WarningKind,
        severity: Severity,
        message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            detail: detail.into(),
            suggestion: None,
            source: None,
        }
    }

    /// Set the suggested fix
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Set the fallback source
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}
