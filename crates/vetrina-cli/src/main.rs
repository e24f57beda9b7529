//! Operator CLI for the vetrina site materialization engine.
//!
//! Works against a workspace directory (default `.vetrina/`) holding the
//! preset store, site registry, and materialized modules:
//!
//! ```text
//! .vetrina/
//!   presets/   one JSON document per preset
//!   sites/     one JSON document per tenant site
//!   modules/   materialized page module descriptors, per site
//! ```
//!
//! # Examples
//!
//! ```sh
//! # Seed the store with the starter templates
//! vetrina preset seed
//!
//! # Run an enrichment batch (offline content authoring)
//! vetrina enrich --transforms enrich.json --dry-run
//! vetrina enrich --transforms enrich.json
//!
//! # Provision a tenant and materialize its pages
//! vetrina site create --id 16 --preset restaurant-v1 --slug mia-azienda-srl
//! vetrina materialize 16
//!
//! # Inspect what a page renders
//! vetrina resolve 16 menu
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use vetrina::prelude::*;
use vetrina::preset::starter;
use vetrina::retry::{RetryConfig, with_store_retries};

/// Operator CLI for the vetrina site materialization engine.
#[derive(Parser)]
#[command(name = "vetrina")]
struct Cli {
    /// Workspace directory holding presets, sites, and modules.
    #[arg(long, default_value = ".vetrina", global = true)]
    root: PathBuf,

    /// Retries for transient store failures.
    #[arg(long, default_value_t = 3, global = true)]
    retries: u32,

    /// Verbose logging (debug level; use RUST_LOG for finer control).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage the preset store.
    #[command(subcommand)]
    Preset(PresetCommand),

    /// Run an enrichment transform batch against the preset store.
    Enrich {
        /// JSON file with the ordered transform declarations.
        #[arg(long)]
        transforms: PathBuf,

        /// Report the would-be changes without committing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage tenant site instances.
    #[command(subcommand)]
    Site(SiteCommand),

    /// Materialize a site's page modules (idempotent full replace).
    Materialize {
        /// Site id.
        site_id: u64,
    },

    /// Resolve one page's render-time content.
    Resolve {
        /// Site id.
        site_id: u64,
        /// Page slug within the site's preset.
        page_slug: String,
    },
}

#[derive(Subcommand)]
enum PresetCommand {
    /// List presets, optionally filtered by business vertical.
    List {
        #[arg(long)]
        vertical: Option<String>,
    },
    /// Print one preset document.
    Show { id: String },
    /// Seed the store with the built-in starter templates.
    Seed,
    /// Import a preset document from a JSON file.
    Import { file: PathBuf },
    /// Delete a preset. Refused while any site still references it.
    Remove { id: String },
}

#[derive(Subcommand)]
enum SiteCommand {
    /// Provision a tenant site from a preset.
    Create {
        /// Site id, assigned by the provisioning platform.
        #[arg(long)]
        id: u64,
        /// Preset to instantiate.
        #[arg(long)]
        preset: String,
        /// Tenant-facing slug, unique across all sites.
        #[arg(long)]
        slug: String,
    },
    /// List tenant sites.
    List,
    /// Set (or clear) a page content override.
    Override {
        #[arg(long)]
        id: u64,
        #[arg(long)]
        page: String,
        /// JSON file with the full replacement content.
        #[arg(long, conflicts_with = "clear")]
        file: Option<PathBuf>,
        /// Drop the override, reverting to the preset default.
        #[arg(long)]
        clear: bool,
    },
    /// Decommission a site and clean up its page modules.
    Remove {
        #[arg(long)]
        id: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let retry = RetryConfig::with_retries(cli.retries);
    let store = FsPresetStore::new(cli.root.join("presets"))?;

    match &cli.command {
        Command::Preset(cmd) => {
            let registry = SiteRegistry::new(cli.root.join("sites"), &store)?;
            run_preset(cmd, &store, &registry, &retry)
        }
        Command::Enrich {
            transforms,
            dry_run,
        } => run_enrich(transforms, *dry_run, &store),
        Command::Site(cmd) => {
            let registry = SiteRegistry::new(cli.root.join("sites"), &store)?;
            let materializer = Materializer::new(cli.root.join("modules"))?;
            run_site(cmd, &registry, &materializer)
        }
        Command::Materialize { site_id } => {
            let registry = SiteRegistry::new(cli.root.join("sites"), &store)?;
            let materializer = Materializer::new(cli.root.join("modules"))?;
            let result = materializer.rematerialize(&registry, SiteId(*site_id))?;
            for module in &result.descriptors {
                println!("/{}  [{}]", module.slug, module.component_key);
            }
            println!(
                "{} page module(s), {} orphan(s) removed",
                result.descriptors.len(),
                result.orphans_removed
            );
            Ok(())
        }
        Command::Resolve { site_id, page_slug } => {
            let registry = SiteRegistry::new(cli.root.join("sites"), &store)?;
            let resolver = ContentResolver::new(&registry);
            let resolved = resolver.resolve(SiteId(*site_id), page_slug)?;
            println!("{}", serde_json::to_string_pretty(&resolved).unwrap_or_default());
            Ok(())
        }
    }
}

fn run_preset(
    cmd: &PresetCommand,
    store: &FsPresetStore,
    registry: &SiteRegistry<'_, FsPresetStore>,
    retry: &RetryConfig,
) -> Result<()> {
    match cmd {
        PresetCommand::List { vertical } => {
            let summaries = with_store_retries(retry, || store.list(vertical.as_deref()))?;
            if summaries.is_empty() {
                println!("(no presets — run `vetrina preset seed`)");
            }
            for s in summaries {
                println!("{:<16} v{:<3} {:<12} {} page(s)  {}", s.id, s.version, s.vertical, s.page_count, s.name);
            }
            Ok(())
        }
        PresetCommand::Show { id } => {
            let preset = with_store_retries(retry, || store.get(id))?;
            println!("{}", serde_json::to_string_pretty(&preset).unwrap_or_default());
            Ok(())
        }
        PresetCommand::Seed => {
            for preset in starter::all()? {
                let id = preset.id.clone();
                match store.insert(preset) {
                    Ok(stored) => println!("seeded '{}' v{}", stored.id, stored.version),
                    Err(Error::PresetExists(_)) => println!("'{id}' already present, skipped"),
                    Err(e) => return Err(e),
                }
            }
            Ok(())
        }
        PresetCommand::Import { file } => {
            let json = std::fs::read_to_string(file)
                .map_err(|e| Error::StoreUnavailable(format!("failed to read {}: {e}", file.display())))?;
            let preset: Preset = serde_json::from_str(&json)
                .map_err(|e| Error::SchemaViolation(format!("invalid preset document: {e}")))?;
            let stored = store.insert(preset)?;
            println!("imported '{}' v{}", stored.id, stored.version);
            Ok(())
        }
        PresetCommand::Remove { id } => {
            registry.remove_preset(id)?;
            println!("removed preset '{id}'");
            Ok(())
        }
    }
}

fn run_enrich(transforms: &Path, dry_run: bool, store: &FsPresetStore) -> Result<()> {
    let json = std::fs::read_to_string(transforms).map_err(|e| {
        Error::StoreUnavailable(format!("failed to read {}: {e}", transforms.display()))
    })?;
    let specs: Vec<TransformSpec> = serde_json::from_str(&json)
        .map_err(|e| Error::SchemaViolation(format!("invalid transform declarations: {e}")))?;

    let batch = TransformBatch::from_specs(specs);
    if batch.is_empty() {
        println!("no transforms declared, nothing to do");
        return Ok(());
    }

    let report = batch.run(store, dry_run)?;
    for change in &report.changes {
        println!(
            "{}{}: '{}' touched {} page(s)",
            if dry_run { "[dry run] " } else { "" },
            change.preset_id,
            change.transform,
            change.pages_changed
        );
    }
    if report.changes.is_empty() {
        println!("no changes — store already enriched");
    } else if !dry_run {
        println!("{} preset(s) committed", report.presets_committed);
    }
    Ok(())
}

fn run_site(
    cmd: &SiteCommand,
    registry: &SiteRegistry<'_, FsPresetStore>,
    materializer: &Materializer,
) -> Result<()> {
    match cmd {
        SiteCommand::Create { id, preset, slug } => {
            let site = registry.create(SiteId(*id), preset, slug)?;
            println!("created site {} ('{}') from '{}'", site.site_id, site.slug, site.preset_id);
            Ok(())
        }
        SiteCommand::List => {
            for site in registry.list()? {
                println!(
                    "{:<6} {:<24} preset '{}'  {} override(s)",
                    site.site_id.to_string(),
                    site.slug,
                    site.preset_id,
                    site.page_overrides.len()
                );
            }
            Ok(())
        }
        SiteCommand::Override {
            id,
            page,
            file,
            clear,
        } => {
            if *clear {
                registry.clear_page_override(SiteId(*id), page)?;
                println!("cleared override for page '{page}' on site {id}");
                return Ok(());
            }
            let Some(file) = file else {
                return Err(Error::SchemaViolation(
                    "pass --file with the replacement content, or --clear".into(),
                ));
            };
            let json = std::fs::read_to_string(file).map_err(|e| {
                Error::StoreUnavailable(format!("failed to read {}: {e}", file.display()))
            })?;
            let content: serde_json::Value = serde_json::from_str(&json)
                .map_err(|e| Error::SchemaViolation(format!("invalid content JSON: {e}")))?;
            registry.set_page_override(SiteId(*id), page, content)?;
            println!("set override for page '{page}' on site {id}");
            Ok(())
        }
        SiteCommand::Remove { id } => {
            registry.remove(SiteId(*id), materializer)?;
            println!("removed site {id}");
            Ok(())
        }
    }
}
