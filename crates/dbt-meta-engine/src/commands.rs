//! Query commands
//!
//! Each model command is an [`Extractor`] run through the fallback resolver.
//! `list`, `search` and `node` read a single manifest directly.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use dbt_meta_catalog::{BigQueryCli, TableMetadata, TableRef, WarehouseGateway};
use dbt_meta_core::{Config, ResolvedLocation};
use dbt_meta_manifest::{Dependencies, Direction, LineageNode, LineageTree, LineageWalker, ManifestError, ManifestNode};
use crate::changes::ChangeDetector;
use crate::fallback::{
    Extractor, FallbackResolver, FoundNode, LookupOptions, Mode, NodeOutcome, Resolution, ResolveError,
    WarehouseHit, WarehouseNeed,
};

/// Type reported for production columns without a declared type
const DEFAULT_PROD_TYPE: &str = "string";

/// Type reported for development columns without a declared type
const DEFAULT_DEV_TYPE: &str = "unknown";

/// A column as printed by `columns`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

/// A documented column as printed by `docs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDoc {
    pub name: String,
    pub data_type: String,
    pub description: String,
}

/// Summary printed by `info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub database: String,
    pub schema: String,
    pub table: String,
    pub full_name: String,
    pub materialized: String,

    /// Original file path; empty when served by the warehouse
    pub file: String,

    pub tags: Vec<String>,
    pub unique_id: String,
}

/// One `search` match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub name: String,
    pub description: String,
}

/// Output of `parents` / `children`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Lineage {
    Direct(Vec<LineageNode>),
    Tree(Vec<LineageTree>),
}

impl Lineage {
    /// Number of nodes, counting every level of a tree
    pub fn len(&self) -> usize {
        match self {
            Self::Direct(nodes) => nodes.len(),
            Self::Tree(trees) => dbt_meta_manifest::lineage::count(trees),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Location from warehouse metadata, filling gaps from the queried table
fn warehouse_location(hit: &WarehouseHit, metadata: &TableMetadata) -> ResolvedLocation {
    let reference = &metadata.table_reference;
    let non_empty = |value: &str, fallback: &str| {
        if value.is_empty() { fallback.to_string() } else { value.to_string() }
    };

    let database = match hit.mode {
        Mode::DevFirst => String::new(),
        Mode::ProdFirst => non_empty(&reference.project_id, hit.table.project.as_deref().unwrap_or("")),
    };

    ResolvedLocation::new(
        database,
        non_empty(&reference.dataset_id, &hit.table.dataset),
        non_empty(&reference.table_id, &hit.table.table),
    )
}

/// `schema`: deployment location
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaQuery;

impl Extractor for SchemaQuery {
    type Output = ResolvedLocation;

    fn warehouse_need(&self) -> WarehouseNeed {
        WarehouseNeed::Metadata
    }

    fn from_node(&self, found: &FoundNode<'_>) -> NodeOutcome<ResolvedLocation> {
        NodeOutcome::Found(found.location.clone())
    }

    fn from_warehouse(&self, hit: &WarehouseHit) -> Option<ResolvedLocation> {
        hit.metadata.as_ref().map(|metadata| warehouse_location(hit, metadata))
    }
}

/// `columns`: names and types in documentation order
///
/// Production lower-cases types, development keeps them as declared. A node
/// without documented columns asks the warehouse.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnsQuery;

impl Extractor for ColumnsQuery {
    type Output = Vec<Column>;

    fn warehouse_need(&self) -> WarehouseNeed {
        WarehouseNeed::Columns
    }

    fn from_node(&self, found: &FoundNode<'_>) -> NodeOutcome<Vec<Column>> {
        if found.node.columns.is_empty() {
            let location = &found.location;
            return NodeOutcome::NeedsWarehouse {
                table: TableRef::new(location.schema.clone(), location.table.clone())
                    .with_project(location.database.clone()),
                otherwise: Vec::new(),
            };
        }

        let columns = found
            .node
            .columns
            .iter()
            .map(|(key, column)| {
                let declared = column.data_type.as_deref().filter(|t| !t.is_empty());
                let data_type = match found.mode {
                    Mode::ProdFirst => declared.map(str::to_lowercase).unwrap_or_else(|| DEFAULT_PROD_TYPE.to_string()),
                    Mode::DevFirst => declared.unwrap_or(DEFAULT_DEV_TYPE).to_string(),
                };

                Column {
                    name: if column.name.is_empty() { key.clone() } else { column.name.clone() },
                    data_type,
                }
            })
            .collect();

        NodeOutcome::Found(columns)
    }

    fn from_warehouse(&self, hit: &WarehouseHit) -> Option<Vec<Column>> {
        hit.columns.as_ref().map(|columns| {
            columns
                .iter()
                .map(|column| Column {
                    name: column.name.clone(),
                    data_type: column.data_type.clone(),
                })
                .collect()
        })
    }
}

/// `info`: name, location, materialization, file, tags, unique_id
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoQuery;

impl Extractor for InfoQuery {
    type Output = ModelInfo;

    fn warehouse_need(&self) -> WarehouseNeed {
        WarehouseNeed::Metadata
    }

    fn from_node(&self, found: &FoundNode<'_>) -> NodeOutcome<ModelInfo> {
        let node = found.node;
        let location = found.location.clone();

        NodeOutcome::Found(ModelInfo {
            name: node.name.clone(),
            database: location.database,
            schema: location.schema,
            table: location.table,
            full_name: location.full_name,
            materialized: node.config.materialized.clone().unwrap_or_default(),
            file: node.original_file_path.clone(),
            tags: node.tags.clone(),
            unique_id: node.unique_id.clone(),
        })
    }

    fn from_warehouse(&self, hit: &WarehouseHit) -> Option<ModelInfo> {
        let metadata = hit.metadata.as_ref()?;
        let location = warehouse_location(hit, metadata);

        Some(ModelInfo {
            name: hit.model_name.clone(),
            database: location.database,
            schema: location.schema,
            table: location.table,
            full_name: location.full_name,
            materialized: metadata.table_type.to_lowercase(),
            file: String::new(),
            tags: Vec::new(),
            unique_id: String::new(),
        })
    }
}

/// `config`: the node's full config object
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigQuery;

impl Extractor for ConfigQuery {
    type Output = Value;

    fn warehouse_need(&self) -> WarehouseNeed {
        WarehouseNeed::Metadata
    }

    fn from_node(&self, found: &FoundNode<'_>) -> NodeOutcome<Value> {
        let config = serde_json::to_value(&found.node.config).unwrap_or_else(|e| {
            tracing::warn!(model = found.model_name, error = %e, "node config could not be serialized");
            Value::Null
        });
        NodeOutcome::Found(config)
    }

    /// Only what the warehouse knows: materialization, partitioning, clustering
    fn from_warehouse(&self, hit: &WarehouseHit) -> Option<Value> {
        let metadata = hit.metadata.as_ref()?;

        Some(serde_json::json!({
            "materialized": metadata.table_type.to_lowercase(),
            "partition_by": metadata.time_partitioning,
            "cluster_by": metadata.clustering.as_ref().map(|c| c.fields.clone()),
        }))
    }
}

/// `deps`: refs, sources and macros the model declares
#[derive(Debug, Clone, Copy, Default)]
pub struct DepsQuery;

impl Extractor for DepsQuery {
    type Output = Dependencies;

    fn from_node(&self, found: &FoundNode<'_>) -> NodeOutcome<Dependencies> {
        NodeOutcome::Found(Dependencies::of(found.node))
    }
}

/// `sql`: compiled SQL, or the Jinja template when `raw`
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlQuery {
    pub raw: bool,
}

impl Extractor for SqlQuery {
    type Output = String;

    fn from_node(&self, found: &FoundNode<'_>) -> NodeOutcome<String> {
        let code = if self.raw { &found.node.raw_code } else { &found.node.compiled_code };
        NodeOutcome::Found(code.clone().unwrap_or_default())
    }
}

/// `path`: file path relative to the project
#[derive(Debug, Clone, Copy, Default)]
pub struct PathQuery;

impl Extractor for PathQuery {
    type Output = String;

    fn from_node(&self, found: &FoundNode<'_>) -> NodeOutcome<String> {
        NodeOutcome::Found(found.node.original_file_path.clone())
    }
}

/// `docs`: column names, types and descriptions
#[derive(Debug, Clone, Copy, Default)]
pub struct DocsQuery;

impl Extractor for DocsQuery {
    type Output = Vec<ColumnDoc>;

    fn from_node(&self, found: &FoundNode<'_>) -> NodeOutcome<Vec<ColumnDoc>> {
        NodeOutcome::Found(
            found
                .node
                .columns
                .iter()
                .map(|(key, column)| ColumnDoc {
                    name: if column.name.is_empty() { key.clone() } else { column.name.clone() },
                    data_type: column.data_type.clone().unwrap_or_default(),
                    description: column.description.clone(),
                })
                .collect(),
        )
    }
}

/// `parents` / `children`: direct neighbors or the full tree
#[derive(Debug, Clone, Copy)]
pub struct LineageQuery {
    pub direction: Direction,
    pub recursive: bool,
}

impl Extractor for LineageQuery {
    type Output = Lineage;

    fn from_node(&self, found: &FoundNode<'_>) -> NodeOutcome<Lineage> {
        let walker = LineageWalker::new(found.manifest);
        let unique_id = found.node.unique_id.as_str();

        NodeOutcome::Found(if self.recursive {
            Lineage::Tree(walker.transitive(unique_id, self.direction))
        } else {
            Lineage::Direct(walker.direct(unique_id, self.direction))
        })
    }
}

/// Entry point for every query the tool answers
pub struct MetaQuery {
    resolver: FallbackResolver,
}

impl MetaQuery {
    pub fn new(resolver: FallbackResolver) -> Self {
        Self { resolver }
    }

    /// Queries against the real `bq` and `git` executables
    pub fn from_config(config: Arc<Config>) -> Self {
        let warehouse: Arc<dyn WarehouseGateway> =
            Arc::new(BigQueryCli::from_path().with_timeout(config.warehouse_timeout));
        Self::new(FallbackResolver::new(config, warehouse, ChangeDetector::git()))
    }

    pub fn resolver(&self) -> &FallbackResolver {
        &self.resolver
    }

    pub async fn schema(&self, model: &str, options: &LookupOptions) -> Result<Resolution<ResolvedLocation>, ResolveError> {
        self.resolver.resolve(model, &SchemaQuery, options).await
    }

    pub async fn columns(&self, model: &str, options: &LookupOptions) -> Result<Resolution<Vec<Column>>, ResolveError> {
        self.resolver.resolve(model, &ColumnsQuery, options).await
    }

    pub async fn info(&self, model: &str, options: &LookupOptions) -> Result<Resolution<ModelInfo>, ResolveError> {
        self.resolver.resolve(model, &InfoQuery, options).await
    }

    pub async fn config(&self, model: &str, options: &LookupOptions) -> Result<Resolution<Value>, ResolveError> {
        self.resolver.resolve(model, &ConfigQuery, options).await
    }

    pub async fn deps(&self, model: &str, options: &LookupOptions) -> Result<Resolution<Dependencies>, ResolveError> {
        self.resolver.resolve(model, &DepsQuery, options).await
    }

    pub async fn sql(&self, model: &str, raw: bool, options: &LookupOptions) -> Result<Resolution<String>, ResolveError> {
        self.resolver.resolve(model, &SqlQuery { raw }, options).await
    }

    pub async fn path(&self, model: &str, options: &LookupOptions) -> Result<Resolution<String>, ResolveError> {
        self.resolver.resolve(model, &PathQuery, options).await
    }

    pub async fn docs(&self, model: &str, options: &LookupOptions) -> Result<Resolution<Vec<ColumnDoc>>, ResolveError> {
        self.resolver.resolve(model, &DocsQuery, options).await
    }

    pub async fn lineage(
        &self,
        model: &str,
        direction: Direction,
        recursive: bool,
        options: &LookupOptions,
    ) -> Result<Resolution<Lineage>, ResolveError> {
        self.resolver
            .resolve(model, &LineageQuery { direction, recursive }, options)
            .await
    }

    /// Sorted model names, optionally filtered by a case-insensitive substring
    pub fn list(&self, pattern: Option<&str>, options: &LookupOptions) -> Result<Vec<String>, ManifestError> {
        let manifest = self.resolver.manifest(options)?;
        let pattern = pattern.map(str::to_lowercase);

        let mut names: Vec<String> = manifest
            .all_models()
            .into_iter()
            .map(|(id, _)| id.rsplit('.').next().unwrap_or(id).to_string())
            .filter(|name| match &pattern {
                Some(pattern) => name.to_lowercase().contains(pattern),
                None => true,
            })
            .collect();

        names.sort();
        Ok(names)
    }

    /// Models whose name or description contains `query`, sorted by name
    pub fn search(&self, query: &str, options: &LookupOptions) -> Result<Vec<SearchHit>, ManifestError> {
        let manifest = self.resolver.manifest(options)?;

        let mut hits: Vec<SearchHit> = manifest
            .search(query)
            .into_iter()
            .map(|node| SearchHit {
                name: node.unique_id.rsplit('.').next().unwrap_or(&node.name).to_string(),
                description: node.description.clone(),
            })
            .collect();

        hits.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hits)
    }

    /// Full node by unique_id or model name
    pub fn node(&self, identifier: &str, options: &LookupOptions) -> Result<Option<ManifestNode>, ManifestError> {
        let manifest = self.resolver.manifest(options)?;
        Ok(manifest.get_node(identifier).cloned())
    }
}
