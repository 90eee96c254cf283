//! Warning report envelope
//!
//! The JSON shape `{"warnings": [...], "summary": {...}}` is what the CLI
//! writes to stderr in JSON mode.

use serde::{Deserialize, Serialize};
use crate::warning::{Severity, Warning};

/// Summary counts for a warning list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total number of warnings
    pub total: usize,

    /// Number of errors
    pub errors: usize,

    /// Number of warnings
    pub warnings: usize,

    /// Number of info messages
    pub info: usize,
}

/// Ordered warnings produced by one lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningReport {
    /// All warnings, in emission order
    pub warnings: Vec<Warning>,

    /// Summary statistics
    pub summary: WarningSummary,
}

impl WarningReport {
    /// Create a report from warnings, keeping their order
    pub fn from_warnings(warnings: Vec<Warning>) -> Self {
        let summary = WarningSummary {
            total: warnings.len(),
            errors: warnings.iter().filter(|w| w.severity == Severity::Error).count(),
            warnings: warnings.iter().filter(|w| w.severity == Severity::Warning).count(),
            info: warnings.iter().filter(|w| w.severity == Severity::Info).count(),
        };

        Self { warnings, summary }
    }

    /// Add a warning to the report
    pub fn push(&mut self, warning: Warning) {
        match warning.severity {
            Severity::Error => self.summary.errors += 1,
            Severity::Warning => self.summary.warnings += 1,
            Severity::Info => self.summary.info += 1,
        }

        self.summary.total += 1;
        self.warnings.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Check if the report has any error-severity warnings
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warning::WarningKind;

    #[test]
    fn empty_report() {
        let report = WarningReport::default();
        assert_eq!(report.summary.total, 0);
        assert!(report.is_empty());
        assert!(!report.has_errors());
    }

    #[test]
    fn report_keeps_order_and_counts() {
        let warnings = vec![
            Warning::new(WarningKind::GitMismatch, Severity::Warning, "modified", "local changes"),
            Warning::new(WarningKind::DevManifestMissing, Severity::Error, "missing", "no dev manifest"),
        ];

        let report = WarningReport::from_warnings(warnings);
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 1);
        assert!(report.has_errors());
        assert_eq!(report.warnings[0].kind, WarningKind::GitMismatch);
    }

    #[test]
    fn push_updates_summary() {
        let mut report = WarningReport::default();
        report.push(Warning::new(WarningKind::DeprecatedConfig, Severity::Info, "old var", "use new var"));
        assert_eq!(report.summary.info, 1);
        assert_eq!(report.summary.total, 1);
    }

    #[test]
    fn report_serialization() {
        let report = WarningReport::default();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"warnings\""));
        assert!(json.contains("\"summary\""));
    }
}
