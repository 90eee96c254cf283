//! Deployment names for models
//!
//! Pure functions: production names come from the node and its config,
//! development names from the personal dataset plus a table pattern.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use dbt_meta_core::{Config, ResolvedLocation, SchemaSource, Severity, TableNameStrategy, Warning, WarningKind};
use dbt_meta_manifest::ManifestNode;

/// Placeholders understood in development table patterns
pub const PATTERN_PLACEHOLDERS: [&str; 6] = ["name", "alias", "username", "model_name", "folder", "date"];

/// Production database/schema/table for a node
///
/// Empty config values never win over model values.
pub fn production_location(
    node: &ManifestNode,
    table_strategy: TableNameStrategy,
    schema_source: SchemaSource,
) -> ResolvedLocation {
    let pick = |config_value: Option<&str>, model_value: &str| -> String {
        let config_value = config_value.filter(|v| !v.is_empty());
        match schema_source {
            SchemaSource::Model => model_value.to_string(),
            SchemaSource::Config | SchemaSource::ConfigOrModel => {
                config_value.unwrap_or(model_value).to_string()
            }
        }
    };

    let database = pick(node.config.database.as_deref(), &node.database);
    let schema = pick(node.config.schema.as_deref(), &node.schema);

    let alias = node.config.alias();
    let name = Some(node.name.as_str()).filter(|n| !n.is_empty());
    let table = match table_strategy {
        TableNameStrategy::AliasOrName | TableNameStrategy::Alias => alias.or(name),
        TableNameStrategy::Name => name.or(alias),
    }
    .unwrap_or_default();

    ResolvedLocation::new(database, schema, table)
}

/// Inputs for development table naming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevNaming {
    /// Personal dataset all dev tables live in
    pub schema: String,

    /// `name`, `alias`, a template with placeholders, or a literal table name
    pub pattern: String,

    pub username: String,

    /// Value of `{date}`
    pub date: NaiveDate,
}

impl DevNaming {
    pub fn from_config(config: &Config, date: NaiveDate) -> Self {
        Self {
            schema: config.dev_schema.clone(),
            pattern: config.dev_table_pattern.clone(),
            username: config.username.clone(),
            date,
        }
    }
}

/// Development location for a node; database is always empty
///
/// A pattern with an unknown placeholder falls back to the model name and
/// returns an `invalid_table_pattern` warning.
pub fn development_location(
    node: &ManifestNode,
    model_name: &str,
    naming: &DevNaming,
) -> (ResolvedLocation, Option<Warning>) {
    let (table, warning) = dev_table_name(node, model_name, naming);
    (ResolvedLocation::new("", naming.schema.clone(), table), warning)
}

/// Development table name for a node
pub fn dev_table_name(node: &ManifestNode, model_name: &str, naming: &DevNaming) -> (String, Option<Warning>) {
    let name = if node.name.is_empty() { model_name } else { node.name.as_str() };
    let alias = node.config.alias().unwrap_or(name);

    match naming.pattern.as_str() {
        "name" => (name.to_string(), None),
        "alias" => (alias.to_string(), None),
        pattern if pattern.contains('{') => {
            let folder = model_name.split_once("__").map(|(folder, _)| folder).unwrap_or("");
            let date = naming.date.format("%Y%m%d").to_string();

            let value = |placeholder: &str| -> Option<&str> {
                match placeholder {
                    "name" => Some(name),
                    "alias" => Some(alias),
                    "username" => Some(naming.username.as_str()),
                    "model_name" => Some(model_name),
                    "folder" => Some(folder),
                    "date" => Some(date.as_str()),
                    _ => None,
                }
            };

            let unknown: Vec<&str> = placeholder_regex()
                .captures_iter(pattern)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str())
                .filter(|p| value(p).is_none())
                .collect();

            if !unknown.is_empty() {
                let warning = Warning::new(
                    WarningKind::InvalidTablePattern,
                    Severity::Warning,
                    format!("Unknown placeholder in DBT_DEV_TABLE_PATTERN: {{{}}}", unknown.join("}, {")),
                    format!("Pattern '{}' ignored, using model name '{}'", pattern, name),
                )
                .with_suggestion(format!(
                    "Available: {}",
                    PATTERN_PLACEHOLDERS.iter().map(|p| format!("{{{}}}", p)).collect::<Vec<_>>().join(", ")
                ));
                return (name.to_string(), Some(warning));
            }

            let rendered = placeholder_regex().replace_all(pattern, |caps: &regex::Captures<'_>| {
                value(&caps[1]).unwrap_or_default().to_string()
            });
            (rendered.into_owned(), None)
        }
        literal => (literal.to_string(), None),
    }
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("valid placeholder regex"));

fn placeholder_regex() -> &'static Regex {
    &PLACEHOLDER
}
