//! Application state for the puzzle trainer.

use std::time::Instant;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tactician_core::progress::solved_symbol;
use tactician_core::session::{Refusal, Submission};
use tactician_core::{KeyValueStore, PuzzleSession, Side};

use crate::input::{Command, HELP};
use crate::ui;

pub struct App<S> {
    session: PuzzleSession<S>,
    rng: StdRng,
    /// Whether the app should quit
    pub should_quit: bool,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(session: PuzzleSession<S>) -> Self {
        Self::with_rng(session, StdRng::from_entropy())
    }

    pub fn with_rng(session: PuzzleSession<S>, rng: StdRng) -> Self {
        Self {
            session,
            rng,
            should_quit: false,
        }
    }

    /// Open `puzzle`, or a random one passing the filter.
    pub fn start(&mut self, puzzle: Option<&str>, now: Instant) -> Result<Vec<String>> {
        match puzzle {
            Some(id) => self.session.open(id, true, now)?,
            None => {
                if self.session.next_puzzle(&mut self.rng, now)?.is_none() {
                    return Ok(vec![format!(
                        "No puzzle matches the filter ({} in catalog).",
                        self.session.catalog().len()
                    )]);
                }
            }
        }
        Ok(self.loaded())
    }

    pub fn handle(&mut self, command: Command, now: Instant) -> Result<Vec<String>> {
        let lines = match command {
            Command::Move(spec) => match self.session.submit(&spec, now)? {
                Submission::Refused(reason) => vec![refusal(reason).to_string()],
                Submission::SnapBack => vec![format!("{} is not legal here.", spec)],
                Submission::Incorrect(record) => vec![format!("{}: Incorrect move!", record.san)],
                Submission::Correct { record, solved } => {
                    let mut lines = vec![format!("{}: correct.", record.san)];
                    if solved {
                        lines.push(self.render());
                        lines.push("Puzzle solved!".to_string());
                    }
                    lines
                }
            },
            Command::Back => {
                let moved = self.session.backward();
                self.moved(moved)
            }
            Command::Forward => {
                let moved = self.session.forward()?;
                self.moved(moved)
            }
            Command::Hint | Command::Solution if self.session.is_busy() => {
                vec![refusal(Refusal::Busy).to_string()]
            }
            Command::Hint => match self.session.hint(now) {
                Some(_) => self.feedback(),
                None => vec!["No hint available.".to_string()],
            },
            Command::Solution => match self.session.solution(now) {
                Some(_) => self.feedback(),
                None => vec!["No solution available.".to_string()],
            },
            Command::Next => {
                if self.session.next_record(now)? {
                    self.loaded()
                } else {
                    self.start(None, now)?
                }
            }
            Command::Previous => {
                if self.session.previous_record(now)? {
                    self.loaded()
                } else {
                    vec!["Already at the first puzzle.".to_string()]
                }
            }
            Command::Reset => {
                if self.session.reset(now)? {
                    self.loaded()
                } else {
                    vec![refusal(Refusal::NoPuzzle).to_string()]
                }
            }
            Command::Favorite => match self.session.toggle_favorite()? {
                Some(true) => vec!["Added to favorites.".to_string()],
                Some(false) => vec!["Removed from favorites.".to_string()],
                None => vec![refusal(Refusal::NoPuzzle).to_string()],
            },
            Command::Jump(_) => vec!["Jumping is not available in puzzles.".to_string()],
            Command::Status => vec![self.render()],
            Command::Help => vec![HELP.to_string()],
            Command::Quit => {
                self.should_quit = true;
                Vec::new()
            }
        };
        Ok(lines)
    }

    /// Apply the due scheduled action and describe what changed.
    pub fn tick(&mut self, now: Instant) -> Result<Vec<String>> {
        use tactician_core::session::PuzzleAction;

        let lines = match self.session.poll(now, &mut self.rng)? {
            None | Some(PuzzleAction::ClearFeedback) => Vec::new(),
            Some(PuzzleAction::LoadNext) => self.loaded(),
            Some(PuzzleAction::PlayReply) if self.session.is_solved() => {
                vec![self.render(), "Puzzle solved!".to_string()]
            }
            Some(_) => vec![self.render()],
        };
        Ok(lines)
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.session.next_due()
    }

    fn loaded(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(info) = self
            .session
            .current_id()
            .and_then(|id| self.session.catalog().get(id))
        {
            let star = if self.session.is_favorite() { " ★" } else { "" };
            lines.push(format!(
                "{}{} [{}, {} move(s), hardness {:.2}] {}",
                info.name,
                star,
                info.puzzle_type,
                info.moves,
                info.hardness,
                solved_symbol(self.session.ledger().get(&info.hash), info.moves)
            ));
        }
        lines.push(self.render());
        lines
    }

    fn moved(&self, moved: bool) -> Vec<String> {
        if moved {
            vec![self.render()]
        } else {
            vec!["Cannot move there now.".to_string()]
        }
    }

    fn feedback(&self) -> Vec<String> {
        self.session
            .feedback()
            .map(|f| vec![f.to_string()])
            .unwrap_or_default()
    }

    /// Board from the solver's side, status line and success rate
    pub fn render(&self) -> String {
        let Some(fen) = self.session.board_fen() else {
            return self.session.status();
        };
        let side = self.session.player().unwrap_or(Side::White);
        let rate = self.session.success_rate();
        format!(
            "{}\n{}\nSuccess rate: {:.1}% ({}/{})",
            ui::render_board(&fen, side),
            self.session.status(),
            rate.percent(),
            rate.solved,
            rate.attempted
        )
    }
}

fn refusal(reason: Refusal) -> &'static str {
    match reason {
        Refusal::NoPuzzle => "No puzzle loaded.",
        Refusal::Busy => "Wait for the board to settle.",
        Refusal::Solved => "Puzzle already solved; type next.",
        Refusal::NotYourTurn => "Not your turn.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tactician_core::config::{FilterConfig, TrainerConfig};
    use tactician_core::{Catalog, Favorites, MemoryStore, ProgressLedger, PuzzleInfo};
    use tempfile::TempDir;

    const PUZZLE: &str = r#"[White "Ramos"]
[Black "Lindqvist"]
[Date "2023.11.04"]
[FEN "r1bqkbnr/pppp1ppp/2n5/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 3 3"]
[PuzzleType "checkmate"]

3... Nf6 4. Qxf7# 1-0
"#;

    fn app(temp: &TempDir) -> (App<Arc<MemoryStore>>, String) {
        std::fs::write(temp.path().join("mate.pgn"), PUZZLE).unwrap();
        let info = PuzzleInfo::from_pgn("mate.pgn", PUZZLE).unwrap();
        let id = info.hash.clone();

        let store = Arc::new(MemoryStore::new());
        let session = PuzzleSession::new(
            TrainerConfig {
                keep_playing: false,
                delay_ms: 10,
                ..Default::default()
            },
            FilterConfig::default(),
            Catalog::new(vec![info]),
            temp.path().to_path_buf(),
            ProgressLedger::load(Arc::clone(&store)).unwrap(),
            Favorites::load(store).unwrap(),
        );
        (App::with_rng(session, StdRng::seed_from_u64(3)), id)
    }

    #[test]
    fn test_start_random_puzzle() {
        let temp = TempDir::new().unwrap();
        let (mut app, _) = app(&temp);
        let lines = app.start(None, Instant::now()).unwrap();
        assert!(lines[0].starts_with("Ramos vs. Lindqvist"));
        assert!(lines[1].contains("White to move"));
    }

    #[test]
    fn test_solve_and_quit() {
        let temp = TempDir::new().unwrap();
        let (mut app, id) = app(&temp);
        let now = Instant::now();
        app.start(Some(&id), now).unwrap();

        let lines = app.handle("h5f7".parse().unwrap(), now).unwrap();
        assert_eq!(lines[0], "Qxf7#: correct.");
        assert_eq!(lines.last().unwrap(), "Puzzle solved!");

        let lines = app.handle("h5f7".parse().unwrap(), now).unwrap();
        assert_eq!(lines, vec!["Puzzle already solved; type next."]);

        app.handle(Command::Quit, now).unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_wrong_move_then_revert() {
        let temp = TempDir::new().unwrap();
        let (mut app, id) = app(&temp);
        let now = Instant::now();
        app.start(Some(&id), now).unwrap();

        let lines = app.handle("c4f7".parse().unwrap(), now).unwrap();
        assert_eq!(lines, vec!["Bxf7+: Incorrect move!"]);
        assert!(app.is_busy());

        let lines = app.tick(now + Duration::from_millis(50)).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(!app.is_busy());
    }

    #[test]
    fn test_hint_shows_piece() {
        let temp = TempDir::new().unwrap();
        let (mut app, id) = app(&temp);
        let now = Instant::now();
        app.start(Some(&id), now).unwrap();

        let lines = app.handle(Command::Hint, now).unwrap();
        assert_eq!(lines, vec!["Hint: queen"]);
    }

    #[test]
    fn test_next_returns_to_forward_history() {
        let temp = TempDir::new().unwrap();
        let (mut app, id) = app(&temp);
        let now = Instant::now();
        app.start(Some(&id), now).unwrap();
        app.handle(Command::Next, now).unwrap();
        assert_eq!(app.session.history().len(), 2);

        let lines = app.handle(Command::Previous, now).unwrap();
        assert!(lines[0].starts_with("Ramos vs. Lindqvist"));

        let lines = app.handle(Command::Next, now).unwrap();
        assert!(lines[0].starts_with("Ramos vs. Lindqvist"));
        assert_eq!(app.session.history().len(), 2);
    }

    #[test]
    fn test_hint_refused_while_reverting() {
        let temp = TempDir::new().unwrap();
        let (mut app, id) = app(&temp);
        let now = Instant::now();
        app.start(Some(&id), now).unwrap();

        app.handle("c4f7".parse().unwrap(), now).unwrap();
        let lines = app.handle(Command::Hint, now).unwrap();
        assert_eq!(lines, vec!["Wait for the board to settle."]);
    }
}
