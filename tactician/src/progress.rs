//! tactician-progress - manage puzzle progress and the puzzle catalog
//!
//! Shows, exports, imports and clears the progress ledger, and gathers the
//! puzzle directory into the catalog the trainer reads.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tactician_core::progress::solved_symbol;
use tactician_core::{Catalog, Config, Favorites, ProgressLedger, SqliteStore, SuccessMode};

#[derive(Parser)]
#[command(name = "tactician-progress")]
#[command(about = "Manage puzzle progress and the puzzle catalog")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show recorded results and the success rate
    Show {
        /// Score by moves instead of whole puzzles
        #[arg(long)]
        moves: bool,
    },
    /// Write progress as JSON to stdout or a file
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace progress with the entries of a JSON file
    Import { input: PathBuf },
    /// Forget every recorded result
    Clear,
    /// Scan the puzzle directory and rebuild the catalog
    Gather {
        /// Puzzle directory, overriding paths.puzzles
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        tactician_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("tactician-progress starting");

    let open_store = || -> Result<Arc<SqliteStore>> {
        let store_path = config.store_path();
        tracing::info!(path = %store_path.display(), "Opening store");
        Ok(Arc::new(
            SqliteStore::open(&store_path).context("failed to open store")?,
        ))
    };
    let load_ledger = |store: &Arc<SqliteStore>| {
        ProgressLedger::load(Arc::clone(store)).context("failed to load progress")
    };

    match args.command {
        Commands::Gather { dir } => gather(&config, dir),
        Commands::Show { moves } => {
            let store = open_store()?;
            let ledger = load_ledger(&store)?;
            let favorites =
                Favorites::load(Arc::clone(&store)).context("failed to load favorites")?;
            let mode = if moves || config.trainer.count_moves_instead_of_puzzles {
                SuccessMode::Moves
            } else {
                SuccessMode::Puzzles
            };
            show(&config, &ledger, &favorites, mode)
        }
        Commands::Export { output } => {
            let ledger = load_ledger(&open_store()?)?;
            let json = ledger.export_json().context("failed to export progress")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Exported {} result(s) to {}", ledger.len(), path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        Commands::Import { input } => {
            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let mut ledger = load_ledger(&open_store()?)?;
            let count = ledger
                .import_json(&text)
                .context("failed to import progress")?;
            println!("Imported {} result(s)", count);
            Ok(())
        }
        Commands::Clear => {
            let mut ledger = load_ledger(&open_store()?)?;
            let count = ledger.len();
            ledger.clear().context("failed to clear progress")?;
            println!("Cleared {} result(s)", count);
            Ok(())
        }
    }
}

fn show(
    config: &Config,
    ledger: &ProgressLedger<Arc<SqliteStore>>,
    favorites: &Favorites<Arc<SqliteStore>>,
    mode: SuccessMode,
) -> Result<()> {
    let catalog_path = config.catalog_path();
    let catalog = if catalog_path.exists() {
        Catalog::load(&catalog_path).context("failed to load catalog")?
    } else {
        Catalog::default()
    };

    println!("Catalog: {} puzzle(s)", catalog.len());
    println!("Results: {}", ledger.len());
    println!("Favorites: {}", favorites.len());

    for (id, value) in ledger.iter() {
        match catalog.get(id) {
            Some(info) => println!(
                "  {} {} [{}] {}",
                solved_symbol(Some(value), info.moves),
                info.name,
                info.puzzle_type,
                info.path
            ),
            None => println!("  {} (not in catalog): {}", id, value),
        }
    }

    let rate = ledger.success_rate(&catalog, mode);
    println!(
        "Success rate: {:.1}% ({}/{})",
        rate.percent(),
        rate.solved,
        rate.attempted
    );
    Ok(())
}

/// Describe every puzzle file with a progress bar and save the catalog
fn gather(config: &Config, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| config.puzzles_dir());
    let paths = Catalog::discover(&dir).context("failed to scan puzzle directory")?;
    println!("Found {} puzzle file(s) in {}", paths.len(), dir.display());

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("#>-"),
    );

    let mut entries = Vec::with_capacity(paths.len());
    let mut skipped = Vec::new();
    for path in &paths {
        pb.set_message(
            path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("...")
                .to_string(),
        );
        match Catalog::describe(&dir, path) {
            Ok(info) => entries.push(info),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping puzzle");
                skipped.push((path.clone(), e));
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let mut catalog = Catalog::new(entries);
    catalog.sort();
    let catalog_path = config.catalog_path();
    catalog
        .save(&catalog_path)
        .context("failed to save catalog")?;

    println!("Gathered {} puzzle(s) into {}", catalog.len(), catalog_path.display());
    for (path, e) in &skipped {
        println!("  Skipped {}: {}", path.display(), e);
    }
    tracing::info!(puzzles = catalog.len(), skipped = skipped.len(), "Catalog gathered");
    Ok(())
}
