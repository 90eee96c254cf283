//! dbt manifest.json parsing
//!
//! Parses dbt-generated manifest.json into models, sources and the
//! parent/child adjacency maps. Only the fields this tool reads are typed;
//! everything else is kept verbatim in `extra` so `node` can print it back.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// dbt manifest.json structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Metadata about the manifest
    #[serde(default)]
    pub metadata: ManifestMetadata,

    /// Model, test, seed and snapshot nodes (file order)
    pub nodes: IndexMap<String, ManifestNode>,

    /// Source definitions
    #[serde(default)]
    pub sources: IndexMap<String, ManifestNode>,

    /// Parent map (node -> list of parent nodes)
    #[serde(default, deserialize_with = "nullable")]
    pub parent_map: IndexMap<String, Vec<String>>,

    /// Child map (node -> list of child nodes)
    #[serde(default, deserialize_with = "nullable")]
    pub child_map: IndexMap<String, Vec<String>>,
}

impl Manifest {
    /// Load manifest from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        if !path.exists() {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
                searched: vec![path.to_path_buf()],
            });
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse manifest from JSON string
    ///
    /// A document without a `nodes` key is rejected.
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        let mut manifest: Manifest = serde_json::from_str(json)
            .map_err(|e| ManifestError::ParseError(e.to_string()))?;

        for (key, node) in manifest.nodes.iter_mut().chain(manifest.sources.iter_mut()) {
            node.fill_identity(key);
        }

        Ok(manifest)
    }

    /// Find a model by name (last `.` segment of its unique_id)
    pub fn get_model(&self, name: &str) -> Option<&ManifestNode> {
        self.nodes
            .iter()
            .filter(|(id, _)| id.starts_with("model."))
            .find(|(id, _)| id.rsplit('.').next() == Some(name))
            .map(|(_, node)| node)
    }

    /// Get a node by unique_id or model name
    ///
    /// Identifiers containing `.` are looked up in `nodes` then `sources`;
    /// bare names go through [`Manifest::get_model`].
    pub fn get_node(&self, identifier: &str) -> Option<&ManifestNode> {
        if identifier.contains('.') {
            self.nodes
                .get(identifier)
                .or_else(|| self.sources.get(identifier))
        } else {
            self.get_model(identifier)
        }
    }

    /// All model nodes (tests, seeds, etc. are filtered out)
    pub fn all_models(&self) -> Vec<(&str, &ManifestNode)> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.is_model())
            .map(|(id, node)| (id.as_str(), node))
            .collect()
    }

    /// Case-insensitive substring search over model names and descriptions
    pub fn search(&self, query: &str) -> Vec<&ManifestNode> {
        let query = query.to_lowercase();

        self.all_models()
            .into_iter()
            .filter(|(id, node)| {
                let name = id.rsplit('.').next().unwrap_or(id);
                name.to_lowercase().contains(&query)
                    || node.description.to_lowercase().contains(&query)
            })
            .map(|(_, node)| node)
            .collect()
    }

    /// Dependencies declared on the model itself (not the graph)
    pub fn dependencies(&self, name: &str) -> Option<Dependencies> {
        self.get_model(name).map(Dependencies::of)
    }

    /// Look up any node or source by unique_id
    pub fn resolve(&self, unique_id: &str) -> Option<&ManifestNode> {
        self.nodes
            .get(unique_id)
            .or_else(|| self.sources.get(unique_id))
    }
}

/// Manifest metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestMetadata {
    pub dbt_schema_version: Option<String>,
    pub dbt_version: Option<String>,
    pub generated_at: Option<String>,
    pub invocation_id: Option<String>,
}

/// A node in the manifest (model, test, seed, snapshot or source)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestNode {
    /// Unique identifier (e.g., "model.my_project.core__events")
    #[serde(deserialize_with = "nullable")]
    pub unique_id: String,

    /// Node name (e.g., "core__events")
    #[serde(deserialize_with = "nullable")]
    pub name: String,

    /// Resource type (model, test, seed, source, ...)
    #[serde(deserialize_with = "nullable")]
    pub resource_type: String,

    /// Package name
    #[serde(deserialize_with = "nullable")]
    pub package_name: String,

    /// Relative path to SQL file
    #[serde(deserialize_with = "nullable")]
    pub path: String,

    /// Original file path
    #[serde(deserialize_with = "nullable")]
    pub original_file_path: String,

    /// Database name (may be empty)
    #[serde(deserialize_with = "nullable")]
    pub database: String,

    /// Schema name (may be empty)
    #[serde(deserialize_with = "nullable")]
    pub schema: String,

    /// Rendered relation alias
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Node configuration
    #[serde(deserialize_with = "nullable")]
    pub config: NodeConfig,

    /// Description
    #[serde(deserialize_with = "nullable")]
    pub description: String,

    /// Column definitions, in documentation order
    #[serde(deserialize_with = "nullable")]
    pub columns: IndexMap<String, ColumnDefinition>,

    /// Dependencies
    #[serde(deserialize_with = "nullable")]
    pub depends_on: DependsOn,

    /// Tags
    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,

    /// Template source (dbt < 1.3 calls it `raw_sql`)
    #[serde(alias = "raw_sql", skip_serializing_if = "Option::is_none")]
    pub raw_code: Option<String>,

    /// Fully rendered SQL (dbt < 1.3 calls it `compiled_sql`)
    #[serde(alias = "compiled_sql", skip_serializing_if = "Option::is_none")]
    pub compiled_code: Option<String>,

    /// Source name (sources only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,

    /// Physical table name (sources only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    /// Every other field, kept as-is
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ManifestNode {
    pub fn is_model(&self) -> bool {
        self.resource_type == "model"
    }

    pub fn is_test(&self) -> bool {
        self.resource_type == "test"
    }

    /// Minimal manifests omit identity fields; derive them from the map key
    fn fill_identity(&mut self, key: &str) {
        if self.unique_id.is_empty() {
            self.unique_id = key.to_string();
        }

        if self.resource_type.is_empty() {
            if let Some(prefix) = key.split('.').next() {
                self.resource_type = prefix.to_string();
            }
        }

        if self.name.is_empty() {
            if let Some(name) = key.rsplit('.').next() {
                self.name = name.to_string();
            }
        }
    }
}

/// Node configuration (from dbt_project.yml or model config)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Output table name override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Materialization type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub materialized: Option<String>,

    /// Schema override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Database override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_by: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_by: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_key: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental_strategy: Option<String>,

    /// Remaining config keys (tags, meta, on_schema_change, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeConfig {
    /// Alias with empty strings treated as absent
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref().filter(|a| !a.is_empty())
    }
}

/// Column definition from manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnDefinition {
    /// Column name
    #[serde(deserialize_with = "nullable")]
    pub name: String,

    /// Description
    #[serde(deserialize_with = "nullable")]
    pub description: String,

    /// Declared data type
    pub data_type: Option<String>,
}

/// Dependencies structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependsOn {
    /// Node unique_ids this node depends on (models and sources)
    #[serde(deserialize_with = "nullable")]
    pub nodes: Vec<String>,

    /// Macro unique_ids this node uses
    #[serde(deserialize_with = "nullable")]
    pub macros: Vec<String>,
}

/// A model's dependencies grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependencies {
    /// Upstream models (`model.*`)
    pub refs: Vec<String>,

    /// Upstream sources (`source.*`)
    pub sources: Vec<String>,

    /// Macros used
    pub macros: Vec<String>,
}

impl Dependencies {
    pub fn of(node: &ManifestNode) -> Self {
        let select = |prefix: &str| {
            node.depends_on
                .nodes
                .iter()
                .filter(|id| id.starts_with(prefix))
                .cloned()
                .collect()
        };

        Self {
            refs: select("model."),
            sources: select("source."),
            macros: node.depends_on.macros.clone(),
        }
    }
}

/// Treat JSON `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Manifest loading errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Manifest not found: {}{}", path.display(), searched_suffix(searched))]
    NotFound {
        path: PathBuf,
        searched: Vec<PathBuf>,
    },

    #[error("Failed to read manifest file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse manifest JSON: {0}")]
    ParseError(String),
}

fn searched_suffix(searched: &[PathBuf]) -> String {
    if searched.len() <= 1 {
        return String::new();
    }

    let paths = searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(" (searched: {})", paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINIMAL: &str = r#"{
        "nodes": {
            "model.shop.core__events": {
                "name": "core__events",
                "schema": "core",
                "database": "analytics",
                "config": {"alias": "events_v2", "materialized": "incremental"}
            },
            "test.shop.not_null_core__events_id": {
                "name": "not_null_core__events_id"
            },
            "model.shop.core__clients": {
                "resource_type": "model",
                "unique_id": "model.shop.core__clients",
                "name": "core__clients",
                "database": null,
                "schema": "core",
                "description": "One row per client",
                "columns": {
                    "client_id": {"name": "client_id", "data_type": "INT64"},
                    "email": {"name": "email", "data_type": "STRING", "description": null}
                },
                "depends_on": {
                    "nodes": ["model.shop.core__events", "source.shop.raw.clients"],
                    "macros": ["macro.shop.cents_to_dollars"]
                },
                "raw_sql": "select * from {{ ref('core__events') }}",
                "compiled_sql": "select * from analytics.core.events_v2",
                "meta": {"owner": "data-eng"}
            }
        },
        "sources": {
            "source.shop.raw.clients": {"name": "clients", "source_name": "raw", "schema": "raw"}
        },
        "parent_map": {"model.shop.core__clients": ["model.shop.core__events"]},
        "child_map": null
    }"#;

    #[test]
    fn identity_is_derived_from_key() {
        let manifest = Manifest::from_str(MINIMAL).unwrap();
        let events = manifest.get_node("model.shop.core__events").unwrap();

        assert_eq!(events.unique_id, "model.shop.core__events");
        assert_eq!(events.resource_type, "model");
        assert_eq!(events.config.alias(), Some("events_v2"));

        let source = manifest.get_node("source.shop.raw.clients").unwrap();
        assert_eq!(source.resource_type, "source");
    }

    #[test]
    fn legacy_sql_fields_and_nulls() {
        let manifest = Manifest::from_str(MINIMAL).unwrap();
        let clients = manifest.get_model("core__clients").unwrap();

        assert_eq!(clients.database, "");
        assert_eq!(clients.raw_code.as_deref(), Some("select * from {{ ref('core__events') }}"));
        assert_eq!(clients.compiled_code.as_deref(), Some("select * from analytics.core.events_v2"));
        assert_eq!(clients.extra["meta"]["owner"], "data-eng");
        assert!(manifest.child_map.is_empty());
    }

    #[test]
    fn columns_keep_documentation_order() {
        let manifest = Manifest::from_str(MINIMAL).unwrap();
        let clients = manifest.get_model("core__clients").unwrap();
        let names: Vec<&str> = clients.columns.keys().map(String::as_str).collect();

        assert_eq!(names, vec!["client_id", "email"]);
        assert_eq!(clients.columns["email"].description, "");
    }

    #[test]
    fn get_model_matches_suffix_of_models_only() {
        let manifest = Manifest::from_str(MINIMAL).unwrap();

        assert!(manifest.get_model("core__events").is_some());
        assert!(manifest.get_model("not_null_core__events_id").is_none());
        assert!(manifest.get_model("events").is_none());
        assert!(manifest.get_node("core__clients").is_some());
        assert!(manifest.get_node("model.shop.missing").is_none());
    }

    #[test]
    fn all_models_skips_tests() {
        let manifest = Manifest::from_str(MINIMAL).unwrap();
        let ids: Vec<&str> = manifest.all_models().into_iter().map(|(id, _)| id).collect();

        assert_eq!(ids, vec!["model.shop.core__events", "model.shop.core__clients"]);
    }

    #[test]
    fn search_is_case_insensitive_over_name_and_description() {
        let manifest = Manifest::from_str(MINIMAL).unwrap();

        let by_name = manifest.search("EVENTS");
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "core__events");

        let by_description = manifest.search("one row");
        assert_eq!(by_description.len(), 1);
        assert_eq!(by_description[0].name, "core__clients");
    }

    #[test]
    fn dependencies_are_grouped() {
        let manifest = Manifest::from_str(MINIMAL).unwrap();
        let deps = manifest.dependencies("core__clients").unwrap();

        assert_eq!(deps.refs, vec!["model.shop.core__events"]);
        assert_eq!(deps.sources, vec!["source.shop.raw.clients"]);
        assert_eq!(deps.macros, vec!["macro.shop.cents_to_dollars"]);
        assert!(manifest.dependencies("missing").is_none());
    }

    #[test]
    fn missing_nodes_key_is_parse_error() {
        let result = Manifest::from_str(r#"{"sources": {}}"#);
        assert!(matches!(result, Err(ManifestError::ParseError(_))));

        let result = Manifest::from_str("not json");
        assert!(matches!(result, Err(ManifestError::ParseError(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = Manifest::from_file(Path::new("/missing/manifest.json"));
        match result {
            Err(err @ ManifestError::NotFound { .. }) => {
                assert!(err.to_string().contains("/missing/manifest.json"));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn empty_alias_is_absent() {
        let config = NodeConfig {
            alias: Some(String::new()),
            ..NodeConfig::default()
        };
        assert_eq!(config.alias(), None);
    }
}
