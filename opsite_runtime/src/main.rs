//! Opsite CLI
//!
//! Command-line front-end for the op log and the replay engine.
//!
//! # Commands
//!
//! - `import` - Append a JSON-lines file to the op log
//! - `replay` - Print one entity's projection
//! - `index` - Print the site index
//! - `build` - Print every projection plus the index
//! - `verify` - Check determinism, invariants and the latest snapshot
//! - `snapshot` - Write a snapshot of the current build

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use opsite_engine::{AccessMode, SiteIndex};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use opsite_runtime::drift::{compare_indexes, verify_determinism};
use opsite_runtime::logging::init_logging;
use opsite_runtime::replay::{rebuild_site, replay_one, validate_build};
use opsite_runtime::snapshot::{load_latest_snapshot, save_snapshot, verify_snapshot_hash};
use opsite_runtime::{EventStore, RuntimeConfig, RuntimeResult};

/// Op-log replay and site projection tools.
#[derive(Parser)]
#[command(name = "opsite")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Op log path (overrides the config file)
    #[arg(global = true, short, long)]
    log: Option<PathBuf>,

    /// Include drafts and private entities
    #[arg(global = true, short, long)]
    drafts: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a JSON-lines file to the op log
    Import {
        /// Source file, one operation record per line
        file: PathBuf,
    },

    /// Print one entity's projection as JSON
    Replay {
        /// Entity root, e.g. `wiki:operators`
        root: String,
    },

    /// Print the site index as JSON
    Index,

    /// Print the full site build as JSON
    Build,

    /// Replay twice, validate invariants and check the latest snapshot
    Verify,

    /// Write a snapshot of the current build
    Snapshot,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(log) = cli.log {
        config.log_path = log;
    }
    if cli.drafts {
        config.replay.mode = AccessMode::Drafts;
    }

    run(cli.command, &config)?;
    Ok(())
}

fn run(command: Commands, config: &RuntimeConfig) -> RuntimeResult<()> {
    let mut store = EventStore::open(&config.log_path)?;

    match command {
        Commands::Import { file } => {
            let appended = store.import_jsonl(&file)?;
            println!(
                "imported {} operations into {} ({} in log)",
                appended,
                store.path().display(),
                store.len()
            );
        }
        Commands::Replay { root } => {
            let ops = store.load_all()?;
            let overrides = config.load_overrides()?;
            match replay_one(&root, &ops, &overrides, &config.replay)? {
                Some(projection) => print_json(&projection)?,
                None => println!("null"),
            }
        }
        Commands::Index => {
            let ops = store.load_all()?;
            let build = rebuild_site(&ops, &config.load_overrides()?, &config.replay);
            print_json(&build.index)?;
        }
        Commands::Build => {
            let ops = store.load_all()?;
            let build = rebuild_site(&ops, &config.load_overrides()?, &config.replay);
            print_json(&build)?;
        }
        Commands::Verify => {
            let ops = store.load_all()?;
            let overrides = config.load_overrides()?;
            let hash = verify_determinism(&ops, &overrides, &config.replay)?;
            let build = rebuild_site(&ops, &overrides, &config.replay);
            validate_build(&build)?;
            println!("deterministic: {}", hash);

            if let Some(snap) = load_latest_snapshot(&config.snapshot_dir)? {
                if !verify_snapshot_hash(&snap) {
                    warn!(op_count = snap.op_count, "snapshot content does not match its hash");
                    println!("snapshot {}: CORRUPT", snap.op_count);
                } else if snap.op_count == ops.len() as u64 && snap.hash != hash {
                    warn!(op_count = snap.op_count, "snapshot disagrees with replay");
                    println!("snapshot {}: STALE (rebuild from log)", snap.op_count);
                } else {
                    println!("snapshot {}: ok", snap.op_count);
                }
            }
        }
        Commands::Snapshot => {
            let ops = store.load_all()?;
            let previous = load_latest_snapshot(&config.snapshot_dir)?;
            let build = rebuild_site(&ops, &config.load_overrides()?, &config.replay);
            validate_build(&build)?;
            let path = save_snapshot(&config.snapshot_dir, ops.len() as u64, &build)?;
            println!("{}", path.display());

            if let Some(prev) = previous {
                let before = serde_json::from_str::<SnapshotIndex>(&prev.canonical_json)?.index;
                let drift = compare_indexes(&before, &build.index);
                info!(
                    added = drift.added.len(),
                    removed = drift.removed.len(),
                    published = drift.published.len(),
                    unpublished = drift.unpublished.len(),
                    archived = drift.archived.len(),
                    "index drift since previous snapshot"
                );
            }
        }
    }
    Ok(())
}

/// Just the index half of a snapshot's canonical JSON.
#[derive(Deserialize)]
struct SnapshotIndex {
    index: SiteIndex,
}

fn print_json<T: Serialize>(value: &T) -> RuntimeResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
