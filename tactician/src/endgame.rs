//! tactician-endgame - play out tablebase endgames against the move service
//!
//! Asks the configured backend for a study position, then alternates the
//! user's moves with the backend's replies. Every move is rated and shows
//! the distance to mate.

mod input;
mod ui;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tactician_core::endgame::{PlayOutcome, StudyOptions};
use tactician_core::{Config, EndgameLayout, EndgameSession, HttpMoveService, MoveService};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::input::{Command, HELP};

#[derive(Clone, Copy, ValueEnum)]
enum Color {
    White,
    Black,
}

#[derive(Clone, Copy, ValueEnum)]
enum BishopColor {
    Light,
    Dark,
}

#[derive(Parser)]
#[command(name = "tactician-endgame")]
#[command(about = "Practice tablebase endgames against the move service")]
#[command(version)]
struct Args {
    /// Material layout (KRvK, KQvK, KPvK, KRRvK, KBBvK, KBNvK)
    #[arg(default_value = "KQvK")]
    layout: EndgameLayout,

    /// Length of the forced mate, in moves (defaults to the layout maximum)
    #[arg(long)]
    mate_in: Option<u32>,

    /// Side to play (random when omitted)
    #[arg(long, value_enum)]
    side: Option<Color>,

    /// Bishop square color for single-bishop layouts
    #[arg(long, value_enum)]
    bishop: Option<BishopColor>,

    /// Opponent strength in [0, 1], overriding endgame.difficulty
    #[arg(long)]
    difficulty: Option<f64>,

    /// Move service URL, overriding endgame.server_url
    #[arg(long)]
    server: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard =
        tactician_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("tactician-endgame starting");

    let mut endgame = config.endgame.clone();
    if let Some(server) = args.server {
        endgame.server_url = Some(server);
    }
    if let Some(difficulty) = args.difficulty {
        endgame.difficulty = difficulty;
    }

    let service = HttpMoveService::new(&endgame).context("invalid endgame configuration")?;
    println!("Move service: {}", service.base_url());

    let options = StudyOptions {
        layout: args.layout,
        mate_in: args.mate_in.unwrap_or(args.layout.max_mate_in()),
        white: args.side.map(|c| matches!(c, Color::White)),
        bishop_color: args.bishop.map(|b| matches!(b, BishopColor::Light)),
    };
    let mut session = EndgameSession::start(service, &options, &endgame)
        .await
        .context("failed to start endgame study")?;

    println!(
        "{}, mate in {}. You play {}.",
        options.layout,
        options.mate_in,
        session.player().display_name()
    );
    print_position(&session);
    println!("Type a move (e.g. e2e4) or `help`.");

    let result = run(&mut session).await;

    tracing::info!("tactician-endgame shutting down");
    result
}

async fn run<M: MoveService>(session: &mut EndgameSession<M>) -> Result<()> {
    // Set up signal handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    while running.load(Ordering::SeqCst) {
        if input_open {
            tokio::select! {
                line = lines.next_line() => match line.context("failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match line.parse::<Command>() {
                        Ok(Command::Quit) => break,
                        Ok(command) => handle(session, command).await,
                        Err(e) => println!("{}", e),
                    },
                    None => input_open = false,
                },
                _ = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
        } else {
            match session.next_due() {
                Some(due) if session.is_busy() => {
                    tokio::time::sleep(due.saturating_duration_since(Instant::now())).await
                }
                _ => break,
            }
        }

        if let Some(record) = session.poll(Instant::now()) {
            println!("Opponent plays {}.", record.san);
            print_position(session);
        }
    }

    Ok(())
}

async fn handle<M: MoveService>(session: &mut EndgameSession<M>, command: Command) {
    match command {
        Command::Move(spec) => match session.play(&spec).await {
            Ok(PlayOutcome::Played {
                record,
                reply_pending,
            }) => {
                println!("You play {}.", record.san);
                print_position(session);
                if reply_pending {
                    println!("Waiting for the opponent...");
                }
            }
            Ok(PlayOutcome::Illegal) => println!("{} is not legal here.", spec),
            Ok(PlayOutcome::Busy) => println!("Wait for the opponent's move."),
            Ok(PlayOutcome::NotYourTurn) => println!("Not your turn."),
            Ok(PlayOutcome::Stale) => {}
            Err(e) => println!("Move service unavailable: {}", e),
        },
        Command::Back => navigated(session, |s| s.backward()),
        Command::Forward => navigated(session, |s| s.forward()),
        Command::Jump(index) => navigated(session, |s| s.jump(index)),
        Command::Status => print_position(session),
        Command::Help => println!("{}", HELP),
        _ => println!("Not available in endgame mode."),
    }
}

fn navigated<M: MoveService>(
    session: &mut EndgameSession<M>,
    step: impl FnOnce(&mut EndgameSession<M>) -> bool,
) {
    if step(session) {
        print_position(session);
    } else {
        println!("Cannot move there now.");
    }
}

fn print_position<M: MoveService>(session: &EndgameSession<M>) {
    let timeline = session.timeline();
    println!("{}", ui::render_board(timeline.position(), session.player()));
    let current = timeline.current_index().checked_sub(1);
    print!("{}", ui::render_moves(session.moves(), current));
    println!("Mate counter: {}", session.mate_counter());
}
