//! tactician - chess puzzle trainer
//!
//! Serves random puzzles from the gathered catalog and judges moves typed
//! on stdin. Progress and favorites persist in the key-value store.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Store: $XDG_DATA_HOME/tactician/store.db (~/.local/share/tactician/store.db)
//! - Catalog: $XDG_DATA_HOME/tactician/puzzles.json
//! - Logs: $XDG_STATE_HOME/tactician/tactician.log (~/.local/state/tactician/tactician.log)
//! - Config: $XDG_CONFIG_HOME/tactician/config.toml (~/.config/tactician/config.toml)

mod app;
mod input;
mod ui;

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tactician_core::{
    Catalog, Config, Favorites, KeyValueStore, ProgressLedger, PuzzleSession, PuzzleType,
    SqliteStore,
};

use crate::app::App;
use crate::input::Command;

#[derive(Parser)]
#[command(name = "tactician")]
#[command(about = "Solve chess puzzles from the gathered catalog")]
#[command(version)]
struct Args {
    /// Open this puzzle (catalog hash) instead of a random one
    #[arg(long)]
    puzzle: Option<String>,

    /// Only serve puzzles without a recorded result
    #[arg(long)]
    unsolved: bool,

    /// Restrict to a theme (repeatable), e.g. --theme checkmate
    #[arg(long = "theme")]
    themes: Vec<PuzzleType>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        tactician_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("tactician starting");

    let store_path = config.store_path();
    tracing::info!(path = %store_path.display(), "Opening store");
    let store = Arc::new(SqliteStore::open(&store_path).context("failed to open store")?);

    let catalog_path = config.catalog_path();
    let catalog = if catalog_path.exists() {
        Catalog::load(&catalog_path).context("failed to load catalog")?
    } else {
        println!(
            "No catalog at {}. Run `tactician-progress gather` first.",
            catalog_path.display()
        );
        Catalog::default()
    };

    let mut filter = config.filter.clone();
    if args.unsolved {
        filter.only_unsolved = true;
    }
    if !args.themes.is_empty() {
        filter.themes = args.themes.clone();
    }

    let ledger = ProgressLedger::load(Arc::clone(&store)).context("failed to load progress")?;
    let favorites = Favorites::load(Arc::clone(&store)).context("failed to load favorites")?;
    let session = PuzzleSession::new(
        config.trainer.clone(),
        filter,
        catalog,
        config.puzzles_dir(),
        ledger,
        favorites,
    );
    let mut app = App::new(session);

    print_lines(
        app.start(args.puzzle.as_deref(), Instant::now())
            .context("failed to open puzzle")?,
    );
    println!("Type a move (e.g. e2e4) or `help`.");

    let result = run_app(&mut app);

    tracing::info!("tactician shutting down");
    result
}

/// Run the main application loop.
fn run_app<S: KeyValueStore>(app: &mut App<S>) -> Result<()> {
    // Set up signal handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    // Stdin blocks, so lines arrive from a reader thread
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(|l| l.ok()) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut input_open = true;
    while running.load(Ordering::SeqCst) && !app.should_quit {
        if input_open {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(line) if line.trim().is_empty() => {}
                Ok(line) => match line.parse::<Command>() {
                    Ok(command) => print_lines(app.handle(command, Instant::now())?),
                    Err(e) => println!("{}", e),
                },
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => input_open = false,
            }
        } else {
            // Input closed: play out what is pending, then stop
            match app.next_due() {
                Some(due) if app.is_busy() => {
                    thread::sleep(due.saturating_duration_since(Instant::now()))
                }
                _ => break,
            }
        }

        print_lines(app.tick(Instant::now())?);
    }

    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}
