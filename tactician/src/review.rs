//! tactician-review - step through an engine-reviewed game
//!
//! Loads a PGN game and the review JSON produced for it, prints accuracy
//! and the annotated move list, and shows the evaluation and engine lines
//! for any position.

mod input;
mod ui;

use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tactician_core::{Config, ReviewedGame, Side};

use crate::input::{Command, HELP};

#[derive(Parser)]
#[command(name = "tactician-review")]
#[command(about = "Browse an engine-reviewed game")]
#[command(version)]
struct Args {
    /// PGN file of the game
    pgn: PathBuf,

    /// Review JSON for the game
    review: PathBuf,

    /// Show this position (0 is the starting position)
    #[arg(long, default_value = "0")]
    ply: usize,

    /// Draw the board from Black's side
    #[arg(long)]
    flip: bool,

    /// Read navigation commands from stdin
    #[arg(short, long)]
    interactive: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        tactician_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(pgn = %args.pgn.display(), "tactician-review starting");

    let pgn = std::fs::read_to_string(&args.pgn)
        .with_context(|| format!("failed to read {}", args.pgn.display()))?;
    let review = std::fs::read_to_string(&args.review)
        .with_context(|| format!("failed to read {}", args.review.display()))?;
    let mut game = ReviewedGame::parse(&pgn, &review).context("failed to load review")?;

    println!("{}", game.title());
    let accuracy = game.accuracy();
    println!(
        "Accuracy: White {}, Black {}",
        percent(accuracy.white),
        percent(accuracy.black)
    );

    if !game.jump(args.ply) {
        anyhow::bail!(
            "ply {} is out of range (game has {} positions)",
            args.ply,
            game.timeline().len()
        );
    }
    let side = if args.flip { Side::Black } else { Side::White };
    print_position(&game, side);

    if args.interactive {
        for line in io::stdin().lock().lines() {
            let line = line.context("failed to read stdin")?;
            if line.trim().is_empty() {
                continue;
            }
            let moved = match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(Command::Back) => game.backward(),
                Ok(Command::Forward) => game.forward(),
                Ok(Command::Jump(index)) => game.jump(index),
                Ok(Command::Status) => true,
                Ok(Command::Help) => {
                    println!("{}", HELP);
                    continue;
                }
                Ok(_) => {
                    println!("Not available in review mode.");
                    continue;
                }
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };
            if moved {
                print_position(&game, side);
            } else {
                println!("Cannot move there now.");
            }
        }
    }

    tracing::info!("tactician-review shutting down");
    Ok(())
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}%", 100.0 * v))
        .unwrap_or_else(|| "-".to_string())
}

fn print_position(game: &ReviewedGame, side: Side) {
    let timeline = game.timeline();
    let index = timeline.current_index();

    println!();
    println!("{}", ui::render_board(timeline.position(), side));
    print!("{}", ui::render_moves(game.moves(), index.checked_sub(1)));

    if let Some(review) = game.current_review() {
        let cell = game.moves().get(index - 1);
        let mut line = format!("{} is {}", cell.san, review.classification.quality.as_str());
        if !review.classification.description.is_empty() {
            line.push_str(&format!(": {}", review.classification.description));
        }
        println!("{}", line);
    }
    if let Some((evaluation, scale)) = game.evaluation() {
        println!("Evaluation {} {}", ui::render_bar(scale, 20), evaluation);
    }

    let lines = game.engine_lines();
    if !lines.is_empty() {
        println!("Engine lines:");
        for line in lines {
            let marker = if line.played { "*" } else { " " };
            let evaluation = line
                .evaluation
                .map(|e| e.to_string())
                .unwrap_or_else(|| "?".to_string());
            println!(" {} {:<8} {}", marker, line.san, evaluation);
        }
    }
}
