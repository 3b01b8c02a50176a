//! tsgroup command line tool
//!
//! Evaluates, decomposes and compares time series group definitions held in
//! JSON fixture files.
//!
//! # CLI Commands
//!
//! - `check-config` - Validate configuration file
//! - `evaluate` - Resolve a group and print its members
//! - `decompose` - Print the base/sub rows of a compound part
//! - `diff` - Report whether a group differs between two groups files
//!
//! # Configuration
//!
//! Read from `--config`, else the `TSGROUP_CONFIG` environment variable, else
//! defaults. Environment overrides apply in every case.
//!
//! # Example Usage
//!
//! ```bash
//! tsgroup evaluate --catalog catalog.json --groups groups.json --group "Hourly"
//! tsgroup decompose --catalog catalog.json --part location --sort count --mask "ALPHA-*"
//! tsgroup diff --catalog catalog.json --old saved.json --new edited.json --group "Hourly"
//! ```

mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use fixtures::{load_catalog, load_groups, GroupIds};
use tsgroup::catalog::{CatalogCache, TsCatalog};
use tsgroup::config::Config;
use tsgroup::decompose::{resolve_mask, sort_specs, CompoundPart, SortOrder};
use tsgroup::group::ChangeDetector;
use tsgroup::resolver::MembershipResolver;
use tsgroup::Error;

// =============================================================================
// CLI Definition
// =============================================================================

/// tsgroup - time series group evaluation
#[derive(Parser)]
#[command(name = "tsgroup")]
#[command(version)]
#[command(about = "Resolve, decompose and compare time series groups", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (overrides TSGROUP_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

/// How `evaluate` prints its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One path per line followed by a summary
    Text,
    /// Pretty-printed JSON object
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    CheckConfig,

    /// Resolve a group and print its members
    Evaluate {
        /// Catalog fixture (JSON)
        #[arg(long)]
        catalog: PathBuf,

        /// Groups fixture (JSON)
        #[arg(long)]
        groups: PathBuf,

        /// Name of the group to resolve
        #[arg(long)]
        group: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the base/sub rows of a compound part
    Decompose {
        /// Catalog fixture (JSON)
        #[arg(long)]
        catalog: PathBuf,

        /// Compound part (location, param, version)
        #[arg(long, default_value = "location")]
        part: String,

        /// Row order (base, sub, count)
        #[arg(long, default_value = "base")]
        sort: String,

        /// Resolve a mask such as ALPHA-* or *-1 against the rows
        #[arg(long)]
        mask: Option<String>,
    },

    /// Report whether a group differs between two groups files
    Diff {
        /// Catalog fixture (JSON)
        #[arg(long)]
        catalog: PathBuf,

        /// Groups fixture holding the saved version
        #[arg(long)]
        old: PathBuf,

        /// Groups fixture holding the edited version
        #[arg(long)]
        new: PathBuf,

        /// Name of the group to compare
        #[arg(long)]
        group: String,
    },
}

// =============================================================================
// Setup
// =============================================================================

fn load_config(cli: &Cli) -> tsgroup::Result<Config> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var("TSGROUP_CONFIG").ok().map(PathBuf::from));

    let config = match path {
        Some(path) => Config::from_file_with_env(path)?,
        None => Config::from_env(),
    };
    config.validate()?;
    Ok(config)
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.logging.with_target)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config);
    debug!(?config, "Configuration loaded");

    match &cli.command {
        Commands::CheckConfig => cmd_check_config(&config),
        Commands::Evaluate {
            catalog,
            groups,
            group,
            format,
        } => cmd_evaluate(&config, catalog, groups, group, *format),
        Commands::Decompose {
            catalog,
            part,
            sort,
            mask,
        } => cmd_decompose(catalog, part, sort, mask.as_deref()),
        Commands::Diff {
            catalog,
            old,
            new,
            group,
        } => cmd_diff(&config, catalog, old, new, group),
    }
}

// =============================================================================
// CLI Command Handlers
// =============================================================================

/// Validate configuration and print summary
fn cmd_check_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Configuration is valid!");
    println!();
    println!("Resolver:");
    println!("  Wildcards enabled: {}", config.resolver.enable_wildcards);
    println!("  Max pattern length: {}", config.resolver.max_pattern_len);
    println!("  Pattern cache size: {}", config.resolver.max_pattern_cache);
    println!();
    println!("Change detection:");
    println!(
        "  Positional filter comparison: {}",
        config.change_detection.positional_filters
    );
    println!();
    println!("Logging:");
    println!("  Level: {}", config.logging.level);

    Ok(())
}

/// Resolve one group from the fixtures
fn cmd_evaluate(
    config: &Config,
    catalog_path: &Path,
    groups_path: &Path,
    name: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Arc::new(load_catalog(catalog_path)?);
    let store = Arc::new(load_groups(groups_path, &catalog, &mut GroupIds::default())?);
    let definition = store
        .find_by_name(name)
        .ok_or_else(|| Error::Catalog(format!("group '{}' not found", name)))?;

    let cache = CatalogCache::new(catalog.clone());
    let resolver =
        MembershipResolver::with_config(cache.index()?, store.clone(), config.resolver.clone());
    let members = resolver.resolve(&definition)?;
    info!(group = %definition.name(), members = members.len(), "Group evaluated");

    let paths: Vec<String> = members.sorted().iter().map(|t| t.unique_string()).collect();
    let misses: Vec<String> = members.misses().iter().map(|m| m.to_string()).collect();

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "group": definition.name(),
            "members": paths,
            "misses": misses,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for path in &paths {
        println!("{}", path);
    }
    println!();
    println!("{} member(s) of '{}'", paths.len(), definition.name());
    if !misses.is_empty() {
        println!("{} value(s) matched nothing:", misses.len());
        for miss in &misses {
            println!("  {}", miss);
        }
    }
    Ok(())
}

/// Print base/sub rows, optionally resolving a mask
fn cmd_decompose(
    catalog_path: &Path,
    part: &str,
    sort: &str,
    mask: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let part: CompoundPart = part.parse()?;
    let order: SortOrder = sort.parse()?;

    let catalog = Arc::new(load_catalog(catalog_path)?);
    debug!(series = catalog.list_all()?.len(), "Catalog loaded");
    let cache = CatalogCache::new(catalog);

    let mut specs = cache.decomposition(part)?.as_ref().clone();
    sort_specs(&mut specs, order);

    println!("{:<20} {:<20} {:<30} {:>6}", "BASE", "SUB", "FULL", "COUNT");
    for spec in &specs {
        println!(
            "{:<20} {:<20} {:<30} {:>6}",
            spec.base, spec.sub, spec.full, spec.count
        );
    }

    if let Some(mask) = mask {
        println!();
        match resolve_mask(mask, &specs) {
            Some(selection) => {
                let (filter_part, value) = selection.to_filter(part);
                println!("Mask '{}' selects {}={}", mask, filter_part, value);
            },
            None => println!("Mask '{}' matches nothing", mask),
        }
    }
    Ok(())
}

/// Compare a group between two fixture files
fn cmd_diff(
    config: &Config,
    catalog_path: &Path,
    old_path: &Path,
    new_path: &Path,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load_catalog(catalog_path)?;
    let mut ids = GroupIds::default();
    let old_store = load_groups(old_path, &catalog, &mut ids)?;
    let new_store = load_groups(new_path, &catalog, &mut ids)?;

    let find = |store: &tsgroup::catalog::InMemoryGroupStore, file: &Path| {
        store.find_by_name(name).ok_or_else(|| {
            Error::Catalog(format!("group '{}' not found in {}", name, file.display()))
        })
    };
    let old = find(&old_store, old_path)?;
    let new = find(&new_store, new_path)?;

    let detector = ChangeDetector::from_config(&config.change_detection);
    match detector.first_difference(&old, &new) {
        Some(change) => println!("'{}' changed: {}", name, change),
        None => println!("'{}' unchanged", name),
    }
    Ok(())
}
