//! Configuration (dbt-meta.toml + environment)
//!
//! All recognized settings are collected into one immutable [`Config`] at
//! startup. Invalid values never abort: they fall back to their default and
//! leave a warning in [`Config::warnings`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::warning::{Severity, Warning, WarningKind};

/// Default production manifest location (relative to home)
pub const DEFAULT_PROD_MANIFEST: &str = "~/dbt-state/manifest.json";

/// Default development manifest location (relative to working directory)
pub const DEFAULT_DEV_MANIFEST: &str = "./target/manifest.json";

/// Default development table pattern
pub const DEFAULT_DEV_TABLE_PATTERN: &str = "name";

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "dbt-meta.toml";

const DEFAULT_WAREHOUSE_TIMEOUT_SECS: u64 = 10;

/// How the production table name is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableNameStrategy {
    /// `config.alias` if non-empty, else `name`
    #[default]
    AliasOrName,

    /// `name`, falling back to alias only if name is empty
    Name,

    /// `config.alias`, falling back to name if alias is empty
    Alias,
}

impl TableNameStrategy {
    pub const VALID: [&'static str; 3] = ["alias_or_name", "name", "alias"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AliasOrName => "alias_or_name",
            Self::Name => "name",
            Self::Alias => "alias",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "alias_or_name" => Some(Self::AliasOrName),
            "name" => Some(Self::Name),
            "alias" => Some(Self::Alias),
            _ => None,
        }
    }
}

/// Where production database/schema come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    /// Non-empty config value, else model value (per field)
    #[default]
    ConfigOrModel,

    /// Model fields only
    Model,

    /// Config fields, falling back to model when empty
    Config,
}

impl SchemaSource {
    pub const VALID: [&'static str; 3] = ["config_or_model", "model", "config"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigOrModel => "config_or_model",
            Self::Model => "model",
            Self::Config => "config",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "config_or_model" => Some(Self::ConfigOrModel),
            "model" => Some(Self::Model),
            "config" => Some(Self::Config),
            _ => None,
        }
    }
}

/// Unvalidated settings from one source (file or environment)
///
/// Every field is optional so sources can be layered with [`RawConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub prod_manifest_path: Option<String>,
    pub dev_manifest_path: Option<String>,
    pub fallback_dev: Option<bool>,
    pub fallback_bigquery: Option<bool>,
    pub dev_dataset: Option<String>,
    pub dev_schema: Option<String>,
    pub dev_schema_template: Option<String>,
    pub dev_schema_prefix: Option<String>,
    pub dev_table_pattern: Option<String>,
    pub prod_table_name: Option<String>,
    pub prod_schema_source: Option<String>,
    pub user: Option<String>,
    pub validate_bigquery: Option<bool>,
    pub bq_timeout_secs: Option<String>,
}

impl RawConfig {
    /// Load raw settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        Self::from_toml(&contents)
    }

    /// Parse raw settings from a TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Read recognized variables through `lookup`
    ///
    /// `lookup` is `std::env::var` in production and a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            prod_manifest_path: lookup("DBT_PROD_MANIFEST_PATH"),
            dev_manifest_path: lookup("DBT_DEV_MANIFEST_PATH"),
            fallback_dev: lookup("DBT_FALLBACK_TARGET").map(|v| parse_bool(&v)),
            fallback_bigquery: lookup("DBT_FALLBACK_BIGQUERY").map(|v| parse_bool(&v)),
            dev_dataset: lookup("DBT_DEV_DATASET"),
            dev_schema: lookup("DBT_DEV_SCHEMA"),
            dev_schema_template: lookup("DBT_DEV_SCHEMA_TEMPLATE"),
            dev_schema_prefix: lookup("DBT_DEV_SCHEMA_PREFIX"),
            dev_table_pattern: lookup("DBT_DEV_TABLE_PATTERN"),
            prod_table_name: lookup("DBT_PROD_TABLE_NAME"),
            prod_schema_source: lookup("DBT_PROD_SCHEMA_SOURCE"),
            user: lookup("DBT_USER")
                .filter(|v| !v.is_empty())
                .or_else(|| lookup("USER").filter(|v| !v.is_empty())),
            validate_bigquery: lookup("DBT_VALIDATE_BIGQUERY").map(|v| parse_bool(&v)),
            bq_timeout_secs: lookup("DBT_BQ_TIMEOUT_SECS"),
        }
    }

    /// Layer `over` on top of `self`; set fields in `over` win
    pub fn merge(self, over: RawConfig) -> RawConfig {
        RawConfig {
            prod_manifest_path: over.prod_manifest_path.or(self.prod_manifest_path),
            dev_manifest_path: over.dev_manifest_path.or(self.dev_manifest_path),
            fallback_dev: over.fallback_dev.or(self.fallback_dev),
            fallback_bigquery: over.fallback_bigquery.or(self.fallback_bigquery),
            dev_dataset: over.dev_dataset.or(self.dev_dataset),
            dev_schema: over.dev_schema.or(self.dev_schema),
            dev_schema_template: over.dev_schema_template.or(self.dev_schema_template),
            dev_schema_prefix: over.dev_schema_prefix.or(self.dev_schema_prefix),
            dev_table_pattern: over.dev_table_pattern.or(self.dev_table_pattern),
            prod_table_name: over.prod_table_name.or(self.prod_table_name),
            prod_schema_source: over.prod_schema_source.or(self.prod_schema_source),
            user: over.user.or(self.user),
            validate_bigquery: over.validate_bigquery.or(self.validate_bigquery),
            bq_timeout_secs: over.bq_timeout_secs.or(self.bq_timeout_secs),
        }
    }
}

/// Validated, immutable configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Production manifest file
    pub prod_manifest_path: PathBuf,

    /// Development manifest file
    pub dev_manifest_path: PathBuf,

    /// LEVEL 2: fall back to the development manifest
    pub fallback_dev_enabled: bool,

    /// LEVEL 3: fall back to the warehouse
    pub fallback_warehouse_enabled: bool,

    /// Development schema / dataset
    pub dev_schema: String,

    /// Development table naming pattern (`name`, `alias` or a template)
    pub dev_table_pattern: String,

    /// Production table naming strategy
    pub prod_table_name: TableNameStrategy,

    /// Production schema/database source
    pub prod_schema_source: SchemaSource,

    /// Username for templating, with `.` replaced by `_`
    pub username: String,

    /// Per-attempt timeout for warehouse CLI calls
    pub warehouse_timeout: Duration,

    /// Problems found while building this config
    pub warnings: Vec<Warning>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_raw(RawConfig::default(), dirs::home_dir().as_deref())
    }
}

impl Config {
    /// Load config: optional TOML file, then the process environment on top
    ///
    /// With `config_file = None`, `dbt-meta.toml` in the working directory is
    /// used if it exists.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) => RawConfig::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                RawConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => RawConfig::default(),
        };

        let env = RawConfig::from_lookup(|key| std::env::var(key).ok());
        Ok(Self::from_raw(file.merge(env), dirs::home_dir().as_deref()))
    }

    /// Build config from the process environment only
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_raw(RawConfig::from_lookup(lookup), dirs::home_dir().as_deref())
    }

    /// Validate raw settings; `home` expands `~` in manifest paths
    pub fn from_raw(raw: RawConfig, home: Option<&Path>) -> Self {
        let mut warnings = Vec::new();

        let username = raw
            .user
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or("user")
            .replace('.', "_");

        let prod_table_name = match raw.prod_table_name.as_deref() {
            None => TableNameStrategy::default(),
            Some(value) => TableNameStrategy::parse(value).unwrap_or_else(|| {
                warnings.push(invalid_value(
                    "DBT_PROD_TABLE_NAME",
                    value,
                    &TableNameStrategy::VALID,
                    TableNameStrategy::default().as_str(),
                ));
                TableNameStrategy::default()
            }),
        };

        let prod_schema_source = match raw.prod_schema_source.as_deref() {
            None => SchemaSource::default(),
            Some(value) => SchemaSource::parse(value).unwrap_or_else(|| {
                warnings.push(invalid_value(
                    "DBT_PROD_SCHEMA_SOURCE",
                    value,
                    &SchemaSource::VALID,
                    SchemaSource::default().as_str(),
                ));
                SchemaSource::default()
            }),
        };

        let warehouse_timeout = match raw.bq_timeout_secs.as_deref() {
            None => Duration::from_secs(DEFAULT_WAREHOUSE_TIMEOUT_SECS),
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warnings.push(
                        Warning::new(
                            WarningKind::InvalidConfig,
                            Severity::Warning,
                            format!("Invalid DBT_BQ_TIMEOUT_SECS: '{}'", value),
                            format!("Expected a positive number of seconds. Using default: {}", DEFAULT_WAREHOUSE_TIMEOUT_SECS),
                        )
                        .with_suggestion("Set DBT_BQ_TIMEOUT_SECS to e.g. 10"),
                    );
                    Duration::from_secs(DEFAULT_WAREHOUSE_TIMEOUT_SECS)
                }
            },
        };

        let mut dev_schema = resolve_dev_schema(&raw, &username, &mut warnings);
        if raw.validate_bigquery.unwrap_or(false) {
            let (sanitized, problems) = sanitize_bigquery_name(&dev_schema);
            for problem in problems {
                warnings.push(Warning::new(
                    WarningKind::BigqueryName,
                    Severity::Info,
                    format!("BigQuery validation: {}", problem),
                    format!("Dev dataset '{}' rewritten to '{}'", dev_schema, sanitized),
                ));
            }
            dev_schema = sanitized;
        }

        let prod_manifest_path = expand_home(
            raw.prod_manifest_path.as_deref().unwrap_or(DEFAULT_PROD_MANIFEST),
            home,
        );
        let dev_manifest_path = expand_home(
            raw.dev_manifest_path.as_deref().unwrap_or(DEFAULT_DEV_MANIFEST),
            home,
        );

        Self {
            prod_manifest_path,
            dev_manifest_path,
            fallback_dev_enabled: raw.fallback_dev.unwrap_or(true),
            fallback_warehouse_enabled: raw.fallback_bigquery.unwrap_or(true),
            dev_schema,
            dev_table_pattern: raw
                .dev_table_pattern
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_DEV_TABLE_PATTERN.to_string()),
            prod_table_name,
            prod_schema_source,
            username,
            warehouse_timeout,
            warnings,
        }
    }

    /// Warnings collected while validating this config
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// `true`, `1` and `yes` (any case) are true; everything else is false
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Expand a leading `~` using `home`
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(path),
    }
}

/// Development schema, highest priority first:
/// DBT_DEV_DATASET, DBT_DEV_SCHEMA, DBT_DEV_SCHEMA_TEMPLATE, DBT_DEV_SCHEMA_PREFIX,
/// then `personal_<username>`.
fn resolve_dev_schema(raw: &RawConfig, username: &str, warnings: &mut Vec<Warning>) -> String {
    if let Some(dataset) = raw.dev_dataset.as_deref().filter(|d| !d.is_empty()) {
        return dataset.to_string();
    }

    if let Some(schema) = raw.dev_schema.as_deref().filter(|s| !s.is_empty()) {
        warnings.push(deprecated("DBT_DEV_SCHEMA"));
        return schema.to_string();
    }

    if let Some(template) = raw.dev_schema_template.as_deref() {
        warnings.push(deprecated("DBT_DEV_SCHEMA_TEMPLATE"));
        if !template.is_empty() {
            return template.replace("{username}", username);
        }
    }

    if let Some(prefix) = raw.dev_schema_prefix.as_deref() {
        warnings.push(deprecated("DBT_DEV_SCHEMA_PREFIX"));
        return if prefix.is_empty() {
            username.to_string()
        } else {
            format!("{}_{}", prefix, username)
        };
    }

    format!("personal_{}", username)
}

fn deprecated(variable: &str) -> Warning {
    Warning::new(
        WarningKind::DeprecatedConfig,
        Severity::Info,
        format!("{} is deprecated", variable),
        "Legacy dev schema variable still honored",
    )
    .with_suggestion("Use DBT_DEV_DATASET instead")
}

fn invalid_value(variable: &str, value: &str, valid: &[&str], default: &str) -> Warning {
    Warning::new(
        WarningKind::InvalidConfig,
        Severity::Warning,
        format!("Invalid {}: '{}'", variable, value),
        format!("Valid values: {}. Using default: '{}'", valid.join(", "), default),
    )
    .with_suggestion(format!("Set {} to one of: {}", variable, valid.join(", ")))
}

/// Rewrite a dataset name to BigQuery naming rules
///
/// Returns the sanitized name and a description of every rewrite applied.
pub fn sanitize_bigquery_name(name: &str) -> (String, Vec<String>) {
    let mut problems = Vec::new();
    let mut name = name.to_string();

    if name.chars().count() > 1024 {
        problems.push(format!("Name too long ({} chars, max 1024)", name.chars().count()));
        name = name.chars().take(1024).collect();
    }

    let mut invalid: Vec<char> = name
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        .collect();
    invalid.sort_unstable();
    invalid.dedup();

    if !invalid.is_empty() {
        name = name
            .chars()
            .map(|c| if invalid.contains(&c) { '_' } else { c })
            .collect();
    }

    if let Some(first) = name.chars().next() {
        if !(first.is_ascii_alphabetic() || first == '_') {
            problems.push(format!("Name must start with letter or underscore, got '{}'", first));
            name = format!("_{}", name);
        }
    }

    if !invalid.is_empty() {
        let chars = invalid
            .iter()
            .map(|c| format!("'{}'", c))
            .collect::<Vec<_>>()
            .join(", ");
        problems.push(format!("Invalid BigQuery characters replaced: {}", chars));
    }

    (name, problems)
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_raw(
            RawConfig::from_lookup(|key| vars.get(key).cloned()),
            Some(Path::new("/home/alice")),
        )
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]);

        assert_eq!(config.prod_manifest_path, PathBuf::from("/home/alice/dbt-state/manifest.json"));
        assert_eq!(config.dev_manifest_path, PathBuf::from("./target/manifest.json"));
        assert!(config.fallback_dev_enabled);
        assert!(config.fallback_warehouse_enabled);
        assert_eq!(config.prod_table_name, TableNameStrategy::AliasOrName);
        assert_eq!(config.prod_schema_source, SchemaSource::ConfigOrModel);
        assert_eq!(config.dev_table_pattern, "name");
        assert_eq!(config.dev_schema, "personal_user");
        assert_eq!(config.warehouse_timeout, Duration::from_secs(10));
        assert!(config.warnings().is_empty());
    }

    #[test]
    fn environment_overrides() {
        let config = config_from(&[
            ("DBT_PROD_MANIFEST_PATH", "~/state/prod.json"),
            ("DBT_DEV_MANIFEST_PATH", "/tmp/dev.json"),
            ("DBT_FALLBACK_TARGET", "false"),
            ("DBT_FALLBACK_BIGQUERY", "0"),
            ("DBT_PROD_TABLE_NAME", "name"),
            ("DBT_PROD_SCHEMA_SOURCE", "model"),
            ("DBT_DEV_TABLE_PATTERN", "{username}_{name}"),
            ("DBT_BQ_TIMEOUT_SECS", "7"),
        ]);

        assert_eq!(config.prod_manifest_path, PathBuf::from("/home/alice/state/prod.json"));
        assert_eq!(config.dev_manifest_path, PathBuf::from("/tmp/dev.json"));
        assert!(!config.fallback_dev_enabled);
        assert!(!config.fallback_warehouse_enabled);
        assert_eq!(config.prod_table_name, TableNameStrategy::Name);
        assert_eq!(config.prod_schema_source, SchemaSource::Model);
        assert_eq!(config.dev_table_pattern, "{username}_{name}");
        assert_eq!(config.warehouse_timeout, Duration::from_secs(7));
    }

    #[test]
    fn bool_parsing() {
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("1"));
        assert!(!parse_bool("no"));
        assert!(!parse_bool("maybe"));
    }

    #[test]
    fn invalid_strategies_fall_back_with_warning() {
        let config = config_from(&[
            ("DBT_PROD_TABLE_NAME", "invalid_strategy"),
            ("DBT_PROD_SCHEMA_SOURCE", "nowhere"),
        ]);

        assert_eq!(config.prod_table_name, TableNameStrategy::AliasOrName);
        assert_eq!(config.prod_schema_source, SchemaSource::ConfigOrModel);
        assert_eq!(config.warnings().len(), 2);
        assert!(config.warnings().iter().all(|w| w.kind == WarningKind::InvalidConfig));
        assert!(config.warnings()[0].message.contains("DBT_PROD_TABLE_NAME"));
        assert!(config.warnings()[1].message.contains("DBT_PROD_SCHEMA_SOURCE"));
    }

    #[test]
    fn invalid_timeout_falls_back() {
        let config = config_from(&[("DBT_BQ_TIMEOUT_SECS", "soon")]);
        assert_eq!(config.warehouse_timeout, Duration::from_secs(10));
        assert_eq!(config.warnings()[0].kind, WarningKind::InvalidConfig);
    }

    #[test]
    fn dev_schema_priority() {
        let config = config_from(&[
            ("DBT_DEV_DATASET", "sandbox_alice"),
            ("DBT_DEV_SCHEMA", "legacy"),
            ("USER", "alice"),
        ]);
        assert_eq!(config.dev_schema, "sandbox_alice");
        assert!(config.warnings().is_empty());

        let config = config_from(&[("DBT_DEV_SCHEMA", "legacy"), ("USER", "alice")]);
        assert_eq!(config.dev_schema, "legacy");
        assert_eq!(config.warnings()[0].kind, WarningKind::DeprecatedConfig);

        let config = config_from(&[("DBT_DEV_SCHEMA_TEMPLATE", "dev_{username}"), ("USER", "alice")]);
        assert_eq!(config.dev_schema, "dev_alice");

        let config = config_from(&[("DBT_DEV_SCHEMA_PREFIX", "tmp"), ("USER", "alice")]);
        assert_eq!(config.dev_schema, "tmp_alice");

        let config = config_from(&[("DBT_DEV_SCHEMA_PREFIX", ""), ("USER", "alice")]);
        assert_eq!(config.dev_schema, "alice");
    }

    #[test]
    fn empty_template_falls_through_to_prefix() {
        let config = config_from(&[
            ("DBT_DEV_SCHEMA_TEMPLATE", ""),
            ("DBT_DEV_SCHEMA_PREFIX", "wip"),
            ("USER", "alice"),
        ]);
        assert_eq!(config.dev_schema, "wip_alice");
        assert_eq!(config.warnings().len(), 2);
    }

    #[test]
    fn username_prefers_dbt_user_and_replaces_dots() {
        let config = config_from(&[("DBT_USER", "pavel.f"), ("USER", "root")]);
        assert_eq!(config.username, "pavel_f");
        assert_eq!(config.dev_schema, "personal_pavel_f");
    }

    #[test]
    fn bigquery_validation_sanitizes_dev_dataset() {
        let config = config_from(&[
            ("DBT_DEV_DATASET", "1st.dataset@x"),
            ("DBT_VALIDATE_BIGQUERY", "true"),
        ]);

        assert_eq!(config.dev_schema, "_1st_dataset_x");
        assert!(config.warnings().iter().all(|w| w.kind == WarningKind::BigqueryName));
        assert_eq!(config.warnings().len(), 2);
    }

    #[test]
    fn sanitize_leaves_valid_names_alone() {
        let (name, problems) = sanitize_bigquery_name("personal_alice-2");
        assert_eq!(name, "personal_alice-2");
        assert!(problems.is_empty());
    }

    #[test]
    fn sanitize_truncates_long_names() {
        let long = "a".repeat(1100);
        let (name, problems) = sanitize_bigquery_name(&long);
        assert_eq!(name.len(), 1024);
        assert_eq!(problems.len(), 1);
    }

    #[test]
    fn file_settings_are_overridden_by_environment() {
        let file = RawConfig::from_toml(
            r#"
            prod_manifest_path = "/srv/state/manifest.json"
            fallback_bigquery = false
            dev_dataset = "from_file"
            "#,
        )
        .unwrap();
        let env = RawConfig {
            dev_dataset: Some("from_env".to_string()),
            ..RawConfig::default()
        };

        let config = Config::from_raw(file.merge(env), None);
        assert_eq!(config.prod_manifest_path, PathBuf::from("/srv/state/manifest.json"));
        assert!(!config.fallback_warehouse_enabled);
        assert_eq!(config.dev_schema, "from_env");
    }

    #[test]
    fn config_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dbt-meta.toml");
        std::fs::write(&path, "prod_table_name = \"alias\"\n").unwrap();

        let raw = RawConfig::from_file(&path).unwrap();
        let config = Config::from_raw(raw, None);
        assert_eq!(config.prod_table_name, TableNameStrategy::Alias);
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        assert!(matches!(
            RawConfig::from_toml("prod_table_name = ["),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn home_expansion() {
        let home = Some(Path::new("/home/bob"));
        assert_eq!(expand_home("~/x/manifest.json", home), PathBuf::from("/home/bob/x/manifest.json"));
        assert_eq!(expand_home("~", home), PathBuf::from("/home/bob"));
        assert_eq!(expand_home("/abs/manifest.json", home), PathBuf::from("/abs/manifest.json"));
        assert_eq!(expand_home("~/x", None), PathBuf::from("~/x"));
    }
}
