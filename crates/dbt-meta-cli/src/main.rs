use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use anyhow::Result;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use dbt_meta_core::{Config, Severity, Warning, WarningReport};
use dbt_meta_engine::{Lineage, LookupOptions, MetaQuery, Mode, Resolution, ResolveError};
use dbt_meta_manifest::{lineage, Direction, LineageTree, FLATTEN_THRESHOLD};

/// dbt-meta - metadata lookups over dbt manifests
#[derive(Parser)]
#[command(name = "meta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: dbt-meta.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every model lookup
#[derive(Args, Debug, Clone)]
struct LookupArgs {
    /// Model name (e.g., core_client__events)
    model: String,

    /// Print JSON
    #[arg(short, long)]
    json: bool,

    /// Path to a manifest.json to use instead of the configured one
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Query the development manifest and personal dataset
    #[arg(short, long)]
    dev: bool,
}

impl LookupArgs {
    fn options(&self) -> LookupOptions {
        lookup_options(self.dev, self.manifest.clone())
    }
}

/// Options for commands that read one manifest
#[derive(Args, Debug, Clone)]
struct ManifestArgs {
    /// Print JSON
    #[arg(short, long)]
    json: bool,

    /// Path to a manifest.json to use instead of the configured one
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Read the development manifest
    #[arg(short, long)]
    dev: bool,
}

impl ManifestArgs {
    fn options(&self) -> LookupOptions {
        lookup_options(self.dev, self.manifest.clone())
    }
}

fn lookup_options(dev: bool, manifest: Option<PathBuf>) -> LookupOptions {
    LookupOptions {
        mode: if dev { Mode::DevFirst } else { Mode::ProdFirst },
        manifest,
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Deployment location (database.schema.table)
    Schema(LookupArgs),

    /// Column names and types
    Columns(LookupArgs),

    /// Name, location, materialization, file and tags
    Info(LookupArgs),

    /// Full dbt config
    Config(LookupArgs),

    /// Refs, sources and macros the model uses
    Deps(LookupArgs),

    /// Compiled SQL
    Sql {
        #[command(flatten)]
        lookup: LookupArgs,

        /// Print the Jinja template instead
        #[arg(long)]
        jinja: bool,
    },

    /// Column documentation
    Docs(LookupArgs),

    /// Source file path
    Path(LookupArgs),

    /// Upstream models and sources
    Parents {
        #[command(flatten)]
        lookup: LookupArgs,

        /// All ancestors, not just direct parents
        #[arg(short, long)]
        all: bool,
    },

    /// Downstream models
    Children {
        #[command(flatten)]
        lookup: LookupArgs,

        /// All descendants, not just direct children
        #[arg(short, long)]
        all: bool,
    },

    /// List model names
    List {
        /// Case-insensitive substring filter
        pattern: Option<String>,

        #[command(flatten)]
        manifest: ManifestArgs,
    },

    /// Search model names and descriptions
    Search {
        query: String,

        #[command(flatten)]
        manifest: ManifestArgs,
    },

    /// Raw manifest node by unique_id or model name
    Node {
        identifier: String,

        #[command(flatten)]
        manifest: ManifestArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(
        prod = %config.prod_manifest_path.display(),
        dev = %config.dev_manifest_path.display(),
        dev_schema = %config.dev_schema,
        "configuration loaded"
    );

    let query = MetaQuery::from_config(Arc::new(config));

    let found = match cli.command {
        Commands::Schema(args) => {
            let result = query.schema(&args.model, &args.options()).await;
            finish(result, &args, |location| {
                if args.json {
                    print_json(location)
                } else {
                    println!("{}", location.full_name);
                    Ok(())
                }
            })?
        }
        Commands::Columns(args) => {
            let result = query.columns(&args.model, &args.options()).await;
            finish(result, &args, |columns| {
                if args.json {
                    return print_json(columns);
                }
                let width = columns.iter().map(|c| c.name.len()).max().unwrap_or(0);
                for column in columns {
                    println!("{:<width$}  {}", column.name, column.data_type.dimmed(), width = width);
                }
                Ok(())
            })?
        }
        Commands::Info(args) => {
            let result = query.info(&args.model, &args.options()).await;
            finish(result, &args, |info| {
                if args.json {
                    return print_json(info);
                }
                println!("{} {}", "Name:".bold(), info.name);
                println!("{} {}", "Table:".bold(), info.full_name.green());
                println!("{} {}", "Materialized:".bold(), info.materialized);
                println!("{} {}", "File:".bold(), info.file);
                println!("{} {}", "Tags:".bold(), info.tags.join(", "));
                println!("{} {}", "Unique ID:".bold(), info.unique_id);
                Ok(())
            })?
        }
        Commands::Config(args) => {
            let result = query.config(&args.model, &args.options()).await;
            finish(result, &args, |config| print_json(config))?
        }
        Commands::Deps(args) => {
            let result = query.deps(&args.model, &args.options()).await;
            finish(result, &args, |deps| {
                if args.json {
                    return print_json(deps);
                }
                print_section("Refs", &deps.refs);
                print_section("Sources", &deps.sources);
                print_section("Macros", &deps.macros);
                Ok(())
            })?
        }
        Commands::Sql { lookup: args, jinja } => {
            let result = query.sql(&args.model, jinja, &args.options()).await;
            finish(result, &args, |sql| {
                if args.json {
                    print_json(sql)
                } else {
                    println!("{}", sql);
                    Ok(())
                }
            })?
        }
        Commands::Docs(args) => {
            let result = query.docs(&args.model, &args.options()).await;
            finish(result, &args, |docs| {
                if args.json {
                    return print_json(docs);
                }
                for column in docs {
                    println!("{} {}", column.name.bold(), format!("({})", column.data_type).dimmed());
                    if !column.description.is_empty() {
                        println!("    {}", column.description);
                    }
                }
                Ok(())
            })?
        }
        Commands::Path(args) => {
            let result = query.path(&args.model, &args.options()).await;
            finish(result, &args, |path| {
                if args.json {
                    print_json(path)
                } else {
                    println!("{}", path);
                    Ok(())
                }
            })?
        }
        Commands::Parents { lookup: args, all } => {
            let result = query.lineage(&args.model, Direction::Parents, all, &args.options()).await;
            finish(result, &args, |lineage| print_lineage(lineage, args.json))?
        }
        Commands::Children { lookup: args, all } => {
            let result = query.lineage(&args.model, Direction::Children, all, &args.options()).await;
            finish(result, &args, |lineage| print_lineage(lineage, args.json))?
        }
        Commands::List { pattern, manifest } => {
            let names = query.list(pattern.as_deref(), &manifest.options())?;
            if manifest.json {
                print_json(&names)?;
            } else {
                for name in &names {
                    println!("{}", name);
                }
            }
            true
        }
        Commands::Search { query: text, manifest } => {
            let hits = query.search(&text, &manifest.options())?;
            if manifest.json {
                print_json(&hits)?;
            } else {
                for hit in &hits {
                    println!("{}  {}", hit.name.bold(), hit.description.dimmed());
                }
            }
            true
        }
        Commands::Node { identifier, manifest } => match query.node(&identifier, &manifest.options())? {
            Some(node) => {
                print_json(&node)?;
                true
            }
            None => {
                eprintln!("{} Node '{}' not found", "✗".red(), identifier);
                false
            }
        },
    };

    if !found {
        std::process::exit(1);
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` overrides the level
fn init_logging(verbose: bool) {
    let default_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

/// Print warnings, then the value; `Ok(false)` when nothing was found
fn finish<T>(
    result: Result<Resolution<T>, ResolveError>,
    args: &LookupArgs,
    render: impl FnOnce(&T) -> Result<()>,
) -> Result<bool> {
    match result {
        Ok(resolution) => {
            print_warnings(&resolution.warnings, args.json)?;
            match &resolution.value {
                Some(value) => {
                    render(value)?;
                    Ok(true)
                }
                None => {
                    eprintln!("{} Model '{}' not found", "✗".red(), args.model);
                    Ok(false)
                }
            }
        }
        Err(ResolveError::NotInDevelopment { model, warnings }) => {
            print_warnings(&warnings, args.json)?;
            eprintln!(
                "{} Model '{}' not found in development manifest or BigQuery",
                "✗".red(),
                model
            );
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Warnings always go to stderr so stdout stays parseable
fn print_warnings(warnings: &[Warning], json: bool) -> Result<()> {
    if warnings.is_empty() {
        return Ok(());
    }

    if json {
        eprintln!("{}", WarningReport::from_warnings(warnings.to_vec()).to_json()?);
        return Ok(());
    }

    for warning in warnings {
        let label = match warning.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warning => "WARN".yellow().bold(),
            Severity::Info => "INFO".cyan(),
        };

        eprintln!("[{}] {}", label, warning.message);
        eprintln!("    {}", warning.detail);
        if let Some(suggestion) = &warning.suggestion {
            eprintln!("    {} {}", "Suggestion:".bold(), suggestion);
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_section(title: &str, items: &[String]) {
    println!("{} ({})", title.bold(), items.len());
    for item in items {
        println!("  {}", item);
    }
}

/// JSON form of lineage; trees with more than [`FLATTEN_THRESHOLD`] nodes become a flat list
fn lineage_json(value: &Lineage) -> serde_json::Result<serde_json::Value> {
    match value {
        Lineage::Tree(trees) if lineage::count(trees) > FLATTEN_THRESHOLD => {
            serde_json::to_value(lineage::flatten(trees))
        }
        other => serde_json::to_value(other),
    }
}

fn print_lineage(value: &Lineage, json: bool) -> Result<()> {
    if json {
        return print_json(&lineage_json(value)?);
    }

    match value {
        Lineage::Direct(nodes) => {
            for node in nodes {
                println!("{} {}", node.name, format!("({})", node.resource_type).dimmed());
            }
        }
        Lineage::Tree(trees) => print_tree(trees),
    }

    if value.is_empty() {
        eprintln!("{}", "No relations".dimmed());
    }

    Ok(())
}

fn print_tree(trees: &[LineageTree]) {
    for tree in trees {
        println!(
            "{}{} {}",
            "  ".repeat(tree.level.saturating_sub(1)),
            tree.node.name,
            format!("({})", tree.node.resource_type).dimmed()
        );
        print_tree(&tree.children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbt_meta_manifest::LineageNode;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn lookup_flags() {
        let cli = Cli::try_parse_from(["meta", "schema", "core__events", "-j", "--dev"]).unwrap();
        let Commands::Schema(args) = cli.command else {
            panic!("expected schema");
        };

        assert_eq!(args.model, "core__events");
        assert!(args.json);
        assert_eq!(args.options().mode, Mode::DevFirst);
        assert_eq!(args.options().manifest, None);
    }

    #[test]
    fn lineage_and_sql_flags() {
        let cli = Cli::try_parse_from(["meta", "parents", "core__events", "--all", "--manifest", "/tmp/m.json"]).unwrap();
        let Commands::Parents { lookup, all } = cli.command else {
            panic!("expected parents");
        };
        assert!(all);
        assert_eq!(lookup.options().manifest, Some(PathBuf::from("/tmp/m.json")));
        assert_eq!(lookup.options().mode, Mode::ProdFirst);

        let cli = Cli::try_parse_from(["meta", "-v", "sql", "core__events", "--jinja"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Sql { jinja: true, .. }));
    }

    /// A single chain of `len` ancestors, `model.p.n1` at level 1
    fn chain(len: usize) -> Lineage {
        let mut tree: Vec<LineageTree> = Vec::new();
        for level in (1..=len).rev() {
            tree = vec![LineageTree {
                node: LineageNode {
                    unique_id: format!("model.p.n{}", level),
                    name: format!("n{}", level),
                    resource_type: "model".to_string(),
                    path: String::new(),
                },
                level,
                children: tree,
            }];
        }
        Lineage::Tree(tree)
    }

    #[test]
    fn large_lineage_prints_flat() {
        let json = lineage_json(&chain(FLATTEN_THRESHOLD + 1)).unwrap();
        let entries = json.as_array().unwrap();

        assert_eq!(entries.len(), FLATTEN_THRESHOLD + 1);
        assert!(entries.iter().all(|entry| entry.get("children").is_none()));
        assert_eq!(entries[0]["unique_id"], "model.p.n1");
        assert_eq!(entries[0]["level"], 1);
        assert_eq!(entries[FLATTEN_THRESHOLD]["unique_id"], "model.p.n21");
        assert_eq!(entries[FLATTEN_THRESHOLD]["level"], 21);
    }

    #[test]
    fn lineage_at_threshold_stays_nested() {
        let json = lineage_json(&chain(FLATTEN_THRESHOLD)).unwrap();
        let roots = json.as_array().unwrap();

        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["unique_id"], "model.p.n1");
        assert_eq!(roots[0]["children"][0]["unique_id"], "model.p.n2");
        assert_eq!(roots[0]["children"][0]["level"], 2);
    }

    #[test]
    fn list_pattern_is_optional() {
        let cli = Cli::try_parse_from(["meta", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List { pattern: None, .. }));

        let cli = Cli::try_parse_from(["meta", "list", "core", "-d"]).unwrap();
        let Commands::List { pattern, manifest } = cli.command else {
            panic!("expected list");
        };
        assert_eq!(pattern.as_deref(), Some("core"));
        assert_eq!(manifest.options().mode, Mode::DevFirst);
    }
}
