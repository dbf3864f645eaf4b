//! Puzzle trainer session
//!
//! [`PuzzleSession`] wires a [`PuzzleSolver`] to a speculative [`Board`]
//! that the user moves on, the [`ActionScheduler`] that paces feedback and
//! opponent replies, and the progress/favorites/history collaborators.
//!
//! ## Flow
//!
//! ```text
//! load ──► setup move (now, or after a delay)
//!   └─► submit ──► illegal: snap back
//!              ├─► wrong: record failure depth, revert after a delay
//!              └─► correct: opponent reply after a delay ──► ... ──► solved
//!                                                        └─► next puzzle
//! ```

use crate::catalog::Catalog;
use crate::config::{FilterConfig, TrainerConfig};
use crate::error::{Error, Result};
use crate::favorites::Favorites;
use crate::history::BrowseHistory;
use crate::pgn::GameRecord;
use crate::progress::{ProgressLedger, SuccessRate};
use crate::puzzle::{Attempt, Hint, PuzzleSolver, Rejection, Solution};
use crate::rules::{Board, ShakmatyRules};
use crate::scheduler::ActionScheduler;
use crate::store::KeyValueStore;
use crate::types::{GameResult, HistoryEntry, MoveRecord, MoveSpec, Side};
use rand::Rng;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Delayed effects of the puzzle trainer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuzzleAction {
    ClearFeedback,
    /// Take the wrong move back off the board
    Revert,
    /// Play the opponent's expected reply
    PlayReply,
    /// Play the setup move when it is not shown immediately
    ShowSetupMove,
    LoadNext,
}

/// Why a submission was not considered at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    NoPuzzle,
    Busy,
    Solved,
    NotYourTurn,
}

/// Result of [`PuzzleSession::submit`]
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Refused(Refusal),
    /// Illegal move: the piece goes back where it came from
    SnapBack,
    /// Legal but wrong; a revert is scheduled
    Incorrect(MoveRecord),
    Correct { record: MoveRecord, solved: bool },
}

/// Transient message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Incorrect,
    Solved,
    Hint(Hint),
    Solution(Solution),
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Incorrect => write!(f, "Incorrect move!"),
            Feedback::Solved => write!(f, "Puzzle solved!"),
            Feedback::Hint(hint) => write!(f, "Hint: {}", piece_name(hint.piece)),
            Feedback::Solution(solution) => write!(f, "Hint: {}", solution.san),
        }
    }
}

fn piece_name(piece: char) -> &'static str {
    match piece {
        'K' => "king",
        'Q' => "queen",
        'R' => "rook",
        'B' => "bishop",
        'N' => "knight",
        _ => "pawn",
    }
}

struct LoadedPuzzle {
    id: String,
    locator: String,
    text: String,
    solver: PuzzleSolver<ShakmatyRules>,
    board: Board,
    player: Side,
}

/// Puzzle trainer controller
pub struct PuzzleSession<S> {
    options: TrainerConfig,
    filter: FilterConfig,
    catalog: Catalog,
    puzzles_dir: PathBuf,
    ledger: ProgressLedger<S>,
    favorites: Favorites<S>,
    history: BrowseHistory<HistoryEntry>,
    scheduler: ActionScheduler<PuzzleAction>,
    current: Option<LoadedPuzzle>,
    feedback: Option<Feedback>,
}

impl<S: KeyValueStore> PuzzleSession<S> {
    pub fn new(
        options: TrainerConfig,
        filter: FilterConfig,
        catalog: Catalog,
        puzzles_dir: PathBuf,
        ledger: ProgressLedger<S>,
        favorites: Favorites<S>,
    ) -> Self {
        Self {
            options,
            filter,
            catalog,
            puzzles_dir,
            ledger,
            favorites,
            history: BrowseHistory::new(),
            scheduler: ActionScheduler::new(),
            current: None,
            feedback: None,
        }
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.options.delay_ms)
    }

    // ============================================
    // Loading
    // ============================================

    /// Load a puzzle from its PGN text. Pending actions of the previous
    /// puzzle are cancelled.
    pub fn load(
        &mut self,
        locator: &str,
        id: &str,
        text: &str,
        add_to_history: bool,
        now: Instant,
    ) -> Result<()> {
        let record = GameRecord::parse(text)?;
        let start = record.starting_position().to_string();
        let solver = PuzzleSolver::new(ShakmatyRules::new(), &start, record.moves)?;

        let mut board = Board::from_fen(&start)?;
        let setup = solver
            .timeline()
            .entry(1)
            .and_then(|entry| entry.played.as_ref())
            .map(MoveRecord::spec)
            .ok_or_else(|| Error::Position("setup move missing".to_string()))?;

        self.scheduler.invalidate();
        self.feedback = None;

        if self.options.hide_first_move {
            board
                .play(&setup)
                .ok_or_else(|| Error::Position(format!("setup move {} is not legal", setup)))?;
        } else {
            self.scheduler
                .schedule_at(PuzzleAction::ShowSetupMove, now, self.delay());
        }

        // The solver plays the side that does not make the setup move
        let player = if self.options.hide_first_move {
            board.turn()
        } else {
            board.turn().opposite()
        };

        tracing::info!(id, locator, moves = solver.total_moves(), "Puzzle loaded");

        self.current = Some(LoadedPuzzle {
            id: id.to_string(),
            locator: locator.to_string(),
            text: text.to_string(),
            solver,
            board,
            player,
        });

        if add_to_history {
            self.history.add(HistoryEntry::new(locator, id));
        }
        Ok(())
    }

    /// Load the catalog puzzle with hash `id` from the puzzles directory.
    pub fn open(&mut self, id: &str, add_to_history: bool, now: Instant) -> Result<()> {
        let info = self
            .catalog
            .get(id)
            .ok_or_else(|| Error::PuzzleNotFound(id.to_string()))?;
        let locator = info.path.clone();
        let text = std::fs::read_to_string(self.puzzles_dir.join(&locator))?;
        self.load(&locator, id, &text, add_to_history, now)
    }

    /// Open a random puzzle passing the filter. Returns its id, or `None`
    /// when nothing matches.
    pub fn next_puzzle<G: Rng + ?Sized>(&mut self, rng: &mut G, now: Instant) -> Result<Option<String>> {
        let Some(info) = self.catalog.pick_random(&self.filter, &self.ledger, rng) else {
            tracing::info!("No puzzle matches the filter");
            return Ok(None);
        };
        let id = info.hash.clone();
        self.open(&id, true, now)?;
        Ok(Some(id))
    }

    /// Reload the current puzzle from scratch.
    pub fn reset(&mut self, now: Instant) -> Result<bool> {
        let Some(current) = self.current.as_ref() else {
            return Ok(false);
        };
        let (locator, id, text) = (current.locator.clone(), current.id.clone(), current.text.clone());
        self.load(&locator, &id, &text, false, now)?;
        Ok(true)
    }

    pub fn previous_record(&mut self, now: Instant) -> Result<bool> {
        let Some(entry) = self.history.previous().cloned() else {
            return Ok(false);
        };
        self.load_history_entry(&entry, now)?;
        Ok(true)
    }

    pub fn next_record(&mut self, now: Instant) -> Result<bool> {
        let Some(entry) = self.history.next().cloned() else {
            return Ok(false);
        };
        self.load_history_entry(&entry, now)?;
        Ok(true)
    }

    fn load_history_entry(&mut self, entry: &HistoryEntry, now: Instant) -> Result<()> {
        let text = std::fs::read_to_string(self.puzzles_dir.join(&entry.locator))?;
        self.load(&entry.locator, &entry.identifier, &text, false, now)
    }

    // ============================================
    // Playing
    // ============================================

    /// Judge a move made on the board.
    pub fn submit(&mut self, spec: &MoveSpec, now: Instant) -> Result<Submission> {
        let busy = self.scheduler.is_busy();
        let delay = self.delay();
        let Some(current) = self.current.as_mut() else {
            return Ok(Submission::Refused(Refusal::NoPuzzle));
        };
        if busy {
            return Ok(Submission::Refused(Refusal::Busy));
        }
        if current.solver.is_solved() {
            return Ok(Submission::Refused(Refusal::Solved));
        }
        if current.board.turn() != current.player || current.board.result().is_some() {
            return Ok(Submission::Refused(Refusal::NotYourTurn));
        }

        let Some(record) = current.board.play(spec) else {
            return Ok(Submission::SnapBack);
        };

        match current.solver.attempt_move(spec) {
            Attempt::Incorrect(Rejection::Illegal) => {
                current.board.undo();
                Ok(Submission::SnapBack)
            }
            Attempt::Incorrect(Rejection::WrongMove) => {
                let (id, depth) = (current.id.clone(), current.solver.progress_value());
                self.feedback = Some(Feedback::Incorrect);
                self.scheduler.schedule_at(PuzzleAction::Revert, now, delay);
                self.ledger.save_if_first(&id, depth)?;
                tracing::info!(id = %id, depth, attempted = %record.san, "Incorrect puzzle move");
                Ok(Submission::Incorrect(record))
            }
            Attempt::Correct(record) => {
                let solved = current.solver.is_solved();
                if solved {
                    self.on_solved(now)?;
                } else {
                    self.scheduler.schedule_at(PuzzleAction::PlayReply, now, delay);
                }
                Ok(Submission::Correct { record, solved })
            }
        }
    }

    /// Apply the due action, if any.
    pub fn poll<G: Rng + ?Sized>(&mut self, now: Instant, rng: &mut G) -> Result<Option<PuzzleAction>> {
        let Some(action) = self.scheduler.poll(now) else {
            return Ok(None);
        };
        tracing::debug!(?action, "Applying scheduled action");

        match action {
            PuzzleAction::ClearFeedback => self.feedback = None,
            PuzzleAction::Revert => {
                if let Some(current) = self.current.as_mut() {
                    current.board.undo();
                }
                self.feedback = None;
            }
            PuzzleAction::PlayReply => {
                let mut solved = false;
                if let Some(current) = self.current.as_mut() {
                    if let Some(record) = current.solver.play_expected() {
                        current.board.play(&record.spec());
                    }
                    solved = current.solver.is_solved();
                }
                if solved {
                    self.on_solved(now)?;
                }
            }
            PuzzleAction::ShowSetupMove => {
                if let Some(current) = self.current.as_mut() {
                    let setup = current
                        .solver
                        .timeline()
                        .entry(1)
                        .and_then(|entry| entry.played.as_ref())
                        .map(MoveRecord::spec);
                    if let Some(setup) = setup {
                        current.board.play(&setup);
                    }
                }
            }
            PuzzleAction::LoadNext => {
                self.next_puzzle(rng, now)?;
            }
        }
        Ok(Some(action))
    }

    /// Play the next expected move (the "forward" button). Using it before
    /// the puzzle is solved records the depth reached as a failure.
    pub fn forward(&mut self) -> Result<bool> {
        if self.scheduler.is_busy() {
            return Ok(false);
        }
        let Some(current) = self.current.as_mut() else {
            return Ok(false);
        };
        if current.solver.is_solved() {
            return Ok(false);
        }

        let (id, depth) = (current.id.clone(), current.solver.progress_value());
        let Some(record) = current.solver.play_expected() else {
            return Ok(false);
        };
        current.board.play(&record.spec());
        self.ledger.save_if_first(&id, depth)?;
        Ok(true)
    }

    /// Take back one move of the line.
    pub fn backward(&mut self) -> bool {
        if self.scheduler.is_busy() {
            return false;
        }
        let Some(current) = self.current.as_mut() else {
            return false;
        };
        if !current.solver.retreat() {
            return false;
        }
        current.board.undo();
        true
    }

    /// Show the piece to move. Refused while an action is pending, since
    /// the feedback timer would supersede it.
    pub fn hint(&mut self, now: Instant) -> Option<Hint> {
        if self.scheduler.is_busy() {
            return None;
        }
        let hint = self.current.as_ref()?.solver.hint()?;
        self.feedback = Some(Feedback::Hint(hint.clone()));
        self.scheduler
            .schedule_at(PuzzleAction::ClearFeedback, now, self.delay());
        Some(hint)
    }

    pub fn solution(&mut self, now: Instant) -> Option<Solution> {
        if self.scheduler.is_busy() {
            return None;
        }
        let solution = self.current.as_ref()?.solver.solution()?;
        self.feedback = Some(Feedback::Solution(solution.clone()));
        self.scheduler
            .schedule_at(PuzzleAction::ClearFeedback, now, self.delay());
        Some(solution)
    }

    /// Flip the favorite flag of the loaded puzzle.
    pub fn toggle_favorite(&mut self) -> Result<Option<bool>> {
        let Some(id) = self.current.as_ref().map(|c| c.id.clone()) else {
            return Ok(None);
        };
        self.favorites.toggle(&id).map(Some)
    }

    fn on_solved(&mut self, now: Instant) -> Result<()> {
        let Some(current) = self.current.as_ref() else {
            return Ok(());
        };
        let (id, value) = (current.id.clone(), current.solver.progress_value());

        self.feedback = Some(Feedback::Solved);
        self.ledger.save_if_first(&id, value)?;
        tracing::info!(id = %id, value, "Puzzle solved");

        if self.options.keep_playing {
            self.scheduler
                .schedule_at(PuzzleAction::LoadNext, now, self.delay());
        }
        Ok(())
    }

    // ============================================
    // Queries
    // ============================================

    pub fn is_busy(&self) -> bool {
        self.scheduler.is_busy()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.scheduler.next_due()
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.id.as_str())
    }

    /// FEN shown on the board
    pub fn board_fen(&self) -> Option<String> {
        self.current.as_ref().map(|c| c.board.fen())
    }

    pub fn player(&self) -> Option<Side> {
        self.current.as_ref().map(|c| c.player)
    }

    pub fn solver(&self) -> Option<&PuzzleSolver<ShakmatyRules>> {
        self.current.as_ref().map(|c| &c.solver)
    }

    pub fn is_solved(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.solver.is_solved())
    }

    pub fn is_favorite(&self) -> bool {
        self.current_id().is_some_and(|id| self.favorites.contains(id))
    }

    /// Status line: side to move or game-over text
    pub fn status(&self) -> String {
        let Some(current) = self.current.as_ref() else {
            return "No puzzle loaded".to_string();
        };
        let turn = current.board.turn();
        let marker = if turn == Side::Black { "◉" } else { "○" };
        match current.board.result() {
            Some(GameResult::Draw) => format!("{} Game over, drawn position", marker),
            Some(_) => format!("{} Game over, {} is checkmated.", marker, turn.display_name()),
            None => format!("{} {} to move", marker, turn.display_name()),
        }
    }

    pub fn success_rate(&self) -> SuccessRate {
        self.ledger
            .success_rate(&self.catalog, self.options.success_mode())
    }

    /// Number of catalog puzzles passing the filter
    pub fn filtered_count(&self) -> usize {
        self.catalog.filter(&self.filter, &self.ledger).len()
    }

    pub fn ledger(&self) -> &ProgressLedger<S> {
        &self.ledger
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &BrowseHistory<HistoryEntry> {
        &self.history
    }
}
