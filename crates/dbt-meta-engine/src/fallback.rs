//! Three-level lookup
//!
//! Every model lookup runs through [`FallbackResolver::resolve`]:
//!
//! - PROD_FIRST: production manifest, then development manifest (LEVEL 2),
//!   then the warehouse (LEVEL 3)
//! - DEV_FIRST: development manifest, then the warehouse; production is never
//!   consulted
//!
//! What a command extracts from whichever source answered is supplied by an
//! [`Extractor`]. Warnings are ordered: change detection, missing manifests,
//! fallback levels, then configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use chrono::NaiveDate;
use dbt_meta_catalog::{TableMetadata, TableRef, WarehouseColumn, WarehouseGateway};
use dbt_meta_core::{Config, ResolvedLocation, Severity, Warning, WarningKind};
use dbt_meta_manifest::{Manifest, ManifestError, ManifestLocator, ManifestNode, ManifestStore};
use crate::changes::ChangeDetector;
use crate::naming::{development_location, production_location, DevNaming};

/// Which source is tried first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Production, then development, then warehouse
    #[default]
    ProdFirst,

    /// Development, then warehouse (`--dev`)
    DevFirst,
}

/// Source that answered a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FallbackLevel {
    Production,
    Development,
    Warehouse,
}

impl FallbackLevel {
    /// Label used as a warning `source`
    pub fn label(&self) -> &'static str {
        match self {
            Self::Production => "LEVEL 1",
            Self::Development => "LEVEL 2",
            Self::Warehouse => "LEVEL 3",
        }
    }
}

/// Warehouse data an extractor can work with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarehouseNeed {
    /// Manifest-only command; the warehouse level is skipped
    None,

    /// `bq show` table metadata
    Metadata,

    /// `bq show --schema` columns
    Columns,
}

/// A model found in one of the manifests
#[derive(Debug)]
pub struct FoundNode<'a> {
    pub model_name: &'a str,
    pub node: &'a ManifestNode,

    /// Manifest the node came from
    pub manifest: &'a Manifest,

    /// Deployment location for the mode in effect
    pub location: ResolvedLocation,

    pub level: FallbackLevel,
    pub mode: Mode,
}

/// What an extractor made of a manifest node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutcome<T> {
    Found(T),

    /// Node found but incomplete: ask the warehouse for `table`, keeping
    /// `otherwise` if it cannot answer
    NeedsWarehouse { table: TableRef, otherwise: T },
}

/// Data returned by the warehouse for a lookup
#[derive(Debug, Clone, PartialEq)]
pub struct WarehouseHit {
    pub model_name: String,
    pub table: TableRef,
    pub mode: Mode,
    pub metadata: Option<TableMetadata>,
    pub columns: Option<Vec<WarehouseColumn>>,
}

/// Per-command policy: what to read from a node or a warehouse table
pub trait Extractor {
    type Output;

    fn warehouse_need(&self) -> WarehouseNeed {
        WarehouseNeed::None
    }

    fn from_node(&self, found: &FoundNode<'_>) -> NodeOutcome<Self::Output>;

    fn from_warehouse(&self, _hit: &WarehouseHit) -> Option<Self::Output> {
        None
    }
}

/// Result of a lookup plus every warning collected on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<T> {
    /// `None` when no enabled source knows the model
    pub value: Option<T>,

    pub level: Option<FallbackLevel>,
    pub warnings: Vec<Warning>,
}

impl<T> Resolution<T> {
    fn found(value: T, level: FallbackLevel, warnings: Vec<Warning>) -> Self {
        Self {
            value: Some(value),
            level: Some(level),
            warnings,
        }
    }

    fn not_found(warnings: Vec<Warning>) -> Self {
        Self {
            value: None,
            level: None,
            warnings,
        }
    }

    pub fn is_found(&self) -> bool {
        self.value.is_some()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        Resolution {
            value: self.value.map(f),
            level: self.level,
            warnings: self.warnings,
        }
    }
}

/// Per-request options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupOptions {
    pub mode: Mode,

    /// Explicit manifest; replaces the configured one for the first level
    pub manifest: Option<PathBuf>,
}

impl LookupOptions {
    pub fn dev() -> Self {
        Self {
            mode: Mode::DevFirst,
            manifest: None,
        }
    }

    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = Some(path.into());
        self
    }
}

/// Lookup failures
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Dev mode was requested explicitly and no dev source has the model
    #[error("Model '{model}' not found in development manifest or warehouse")]
    NotInDevelopment { model: String, warnings: Vec<Warning> },
}

/// Runs lookups through the fallback levels
pub struct FallbackResolver {
    config: Arc<Config>,
    store: ManifestStore,
    locator: ManifestLocator,
    warehouse: Arc<dyn WarehouseGateway>,
    changes: ChangeDetector,

    /// Value of `{date}` in dev table patterns
    today: NaiveDate,
}

impl FallbackResolver {
    pub fn new(config: Arc<Config>, warehouse: Arc<dyn WarehouseGateway>, changes: ChangeDetector) -> Self {
        Self {
            locator: ManifestLocator::from_config(&config),
            config,
            store: ManifestStore::new(),
            warehouse,
            changes,
            today: chrono::Local::now().date_naive(),
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// The single manifest a non-fallback command reads
    pub fn manifest(&self, options: &LookupOptions) -> Result<Arc<Manifest>, ManifestError> {
        let path = self
            .locator
            .locate(options.manifest.as_deref(), options.mode == Mode::DevFirst)?;
        self.store.load(&path)
    }

    /// Look up `model_name` and extract a value from the first source that has it
    pub async fn resolve<E: Extractor>(
        &self,
        model_name: &str,
        extractor: &E,
        options: &LookupOptions,
    ) -> Result<Resolution<E::Output>, ResolveError> {
        let modified = self.changes.is_modified(model_name).await;
        let explicit = options.manifest.as_deref();

        let result = match options.mode {
            Mode::ProdFirst => {
                let warnings = if modified { vec![git_mismatch(model_name)] } else { Vec::new() };
                self.prod_first(model_name, extractor, explicit, warnings).await
            }
            Mode::DevFirst => {
                let warnings = if modified { Vec::new() } else { vec![dev_without_changes(model_name)] };
                self.dev_first(model_name, extractor, explicit, warnings).await
            }
        };

        match result {
            Ok(mut resolution) => {
                resolution.warnings.extend(self.config.warnings().iter().cloned());
                Ok(resolution)
            }
            Err(ResolveError::NotInDevelopment { model, mut warnings }) => {
                warnings.extend(self.config.warnings().iter().cloned());
                Err(ResolveError::NotInDevelopment { model, warnings })
            }
            Err(e) => Err(e),
        }
    }

    async fn prod_first<E: Extractor>(
        &self,
        model_name: &str,
        extractor: &E,
        explicit: Option<&Path>,
        mut warnings: Vec<Warning>,
    ) -> Result<Resolution<E::Output>, ResolveError> {
        let mut prod_missing = None;

        let prod = match self.locator.locate(explicit, false) {
            Ok(path) => Some(self.store.load(&path)?),
            Err(e) if explicit.is_some() => return Err(e.into()),
            Err(e) => {
                warnings.push(prod_manifest_missing(self.locator.prod_path()));
                prod_missing = Some(e);
                None
            }
        };

        if let Some(manifest) = prod.as_deref() {
            if let Some(node) = manifest.get_model(model_name) {
                let found = self.production_node(model_name, node, manifest, FallbackLevel::Production);
                return Ok(self.finish_node(extractor, &found, warnings).await);
            }
        }

        if self.config.fallback_dev_enabled {
            if let Some(dev) = self.optional_dev_manifest()? {
                if let Some(node) = dev.get_model(model_name) {
                    tracing::info!(model = model_name, "model served from development manifest");
                    warnings.push(dev_manifest_fallback(model_name));
                    let found = self.production_node(model_name, node, &dev, FallbackLevel::Development);
                    return Ok(self.finish_node(extractor, &found, warnings).await);
                }
            }
        }

        if self.config.fallback_warehouse_enabled {
            if let Some(table) = TableRef::infer_from_model(model_name) {
                if let Some(value) = self.try_warehouse(model_name, &table, Mode::ProdFirst, extractor).await {
                    warnings.push(warehouse_fallback(model_name, &table));
                    return Ok(Resolution::found(value, FallbackLevel::Warehouse, warnings));
                }
            }
        }

        match prod_missing {
            Some(e) => Err(e.into()),
            None => Ok(Resolution::not_found(warnings)),
        }
    }

    async fn dev_first<E: Extractor>(
        &self,
        model_name: &str,
        extractor: &E,
        explicit: Option<&Path>,
        mut warnings: Vec<Warning>,
    ) -> Result<Resolution<E::Output>, ResolveError> {
        let dev = match self.locator.locate(explicit, true) {
            Ok(path) => Some(self.store.load(&path)?),
            Err(e) if explicit.is_some() => return Err(e.into()),
            Err(_) => {
                warnings.push(dev_manifest_missing(model_name));
                None
            }
        };

        if let Some(manifest) = dev.as_deref() {
            if let Some(node) = manifest.get_model(model_name) {
                let naming = DevNaming::from_config(&self.config, self.today);
                let (location, pattern_warning) = development_location(node, model_name, &naming);
                warnings.extend(pattern_warning);

                let found = FoundNode {
                    model_name,
                    node,
                    manifest,
                    location,
                    level: FallbackLevel::Development,
                    mode: Mode::DevFirst,
                };
                return Ok(self.finish_node(extractor, &found, warnings).await);
            }
        }

        if self.config.fallback_warehouse_enabled {
            let table = TableRef::new(self.config.dev_schema.clone(), model_name);
            if let Some(value) = self.try_warehouse(model_name, &table, Mode::DevFirst, extractor).await {
                warnings.push(warehouse_fallback(model_name, &table));
                return Ok(Resolution::found(value, FallbackLevel::Warehouse, warnings));
            }
        }

        Err(ResolveError::NotInDevelopment {
            model: model_name.to_string(),
            warnings,
        })
    }

    fn production_node<'a>(
        &self,
        model_name: &'a str,
        node: &'a ManifestNode,
        manifest: &'a Manifest,
        level: FallbackLevel,
    ) -> FoundNode<'a> {
        FoundNode {
            model_name,
            node,
            manifest,
            location: production_location(node, self.config.prod_table_name, self.config.prod_schema_source),
            level,
            mode: Mode::ProdFirst,
        }
    }

    /// Development manifest for LEVEL 2; absence is not an error here
    fn optional_dev_manifest(&self) -> Result<Option<Arc<Manifest>>, ManifestError> {
        match self.locator.locate(None, true) {
            Ok(path) => self.store.load(&path).map(Some),
            Err(e) => {
                tracing::debug!(error = %e, "no development manifest for fallback");
                Ok(None)
            }
        }
    }

    async fn finish_node<E: Extractor>(
        &self,
        extractor: &E,
        found: &FoundNode<'_>,
        mut warnings: Vec<Warning>,
    ) -> Resolution<E::Output> {
        match extractor.from_node(found) {
            NodeOutcome::Found(value) => Resolution::found(value, found.level, warnings),
            NodeOutcome::NeedsWarehouse { table, otherwise } => {
                match self.try_warehouse(found.model_name, &table, found.mode, extractor).await {
                    Some(value) => {
                        warnings.push(incomplete_node_fallback(found.model_name, &table));
                        Resolution::found(value, FallbackLevel::Warehouse, warnings)
                    }
                    None => Resolution::found(otherwise, found.level, warnings),
                }
            }
        }
    }

    /// Warehouse lookup; `None` when not needed or not available
    ///
    /// The LEVEL 3 toggle is checked by the callers: a node found without
    /// columns always asks the warehouse.
    async fn try_warehouse<E: Extractor>(
        &self,
        model_name: &str,
        table: &TableRef,
        mode: Mode,
        extractor: &E,
    ) -> Option<E::Output> {
        let (metadata, columns) = match extractor.warehouse_need() {
            WarehouseNeed::None => return None,
            WarehouseNeed::Metadata => (Some(self.warehouse.fetch_table_metadata(table).await?), None),
            WarehouseNeed::Columns => (None, Some(self.warehouse.fetch_columns(table).await?)),
        };

        tracing::info!(model = model_name, %table, gateway = self.warehouse.name(), "model served from warehouse");

        extractor.from_warehouse(&WarehouseHit {
            model_name: model_name.to_string(),
            table: table.clone(),
            mode,
            metadata,
            columns,
        })
    }
}

fn git_mismatch(model_name: &str) -> Warning {
    Warning::new(
        WarningKind::GitMismatch,
        Severity::Warning,
        format!("Model '{}' IS modified in git", model_name),
        "Querying production table, but local changes exist",
    )
    .with_suggestion("Use --dev flag to query dev table")
}

fn dev_without_changes(model_name: &str) -> Warning {
    Warning::new(
        WarningKind::DevWithoutChanges,
        Severity::Warning,
        format!("Model '{}' NOT modified in git, but using --dev flag", model_name),
        "Dev table may not exist or may be outdated",
    )
    .with_suggestion("Remove --dev flag to query production table")
}

fn dev_manifest_missing(model_name: &str) -> Warning {
    Warning::new(
        WarningKind::DevManifestMissing,
        Severity::Error,
        "Dev manifest (target/manifest.json) not found",
        "Dev table cannot be queried without manifest",
    )
    .with_suggestion(format!("Run 'defer run --select {}' to build dev table", model_name))
}

fn prod_manifest_missing(path: &Path) -> Warning {
    Warning::new(
        WarningKind::ProdManifestMissing,
        Severity::Warning,
        format!("Production manifest not found: {}", path.display()),
        "Trying development manifest and BigQuery instead",
    )
    .with_suggestion("Set DBT_PROD_MANIFEST_PATH to the production manifest")
}

fn dev_manifest_fallback(model_name: &str) -> Warning {
    Warning::new(
        WarningKind::DevManifestFallback,
        Severity::Warning,
        format!("Model '{}' not found in production manifest", model_name),
        "Using dev manifest (target/manifest.json) as fallback",
    )
    .with_source(FallbackLevel::Development.label())
}

fn warehouse_fallback(model_name: &str, table: &TableRef) -> Warning {
    Warning::new(
        WarningKind::BigqueryFallback,
        Severity::Warning,
        format!("Model '{}' not in manifest", model_name),
        format!(
            "Using BigQuery table: {}. File path, tags, unique_id and dbt-only config are unavailable",
            table
        ),
    )
    .with_source(FallbackLevel::Warehouse.label())
}

fn incomplete_node_fallback(model_name: &str, table: &TableRef) -> Warning {
    Warning::new(
        WarningKind::BigqueryFallback,
        Severity::Info,
        format!("Model '{}' has no columns in manifest", model_name),
        format!("Using BigQuery table: {}", table),
    )
    .with_source(FallbackLevel::Warehouse.label())
}
