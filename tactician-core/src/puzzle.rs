//! Puzzle solving
//!
//! A [`PuzzleSolver`] wraps a [`Timeline`] constrained to one known-correct
//! line. The first move of the line is the opponent's setup move and is
//! played on construction; each later move must match the expected one.

use crate::error::{Error, Result};
use crate::rules::{self, RulesEngine};
use crate::timeline::{MoveOutcome, Timeline};
use crate::types::{MoveRecord, MoveSpec};

/// Why an attempt was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Not a legal move in the current position
    Illegal,
    /// Legal, but not the move the puzzle expects
    WrongMove,
}

/// Result of [`PuzzleSolver::attempt`]
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Correct(MoveRecord),
    Incorrect(Rejection),
}

impl Attempt {
    pub fn is_correct(&self) -> bool {
        matches!(self, Attempt::Correct(_))
    }
}

/// Piece and square to nudge the user towards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    /// Uppercase piece letter (`P` for pawns)
    pub piece: char,
    pub square: String,
}

/// The expected move, spelled out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub san: String,
    pub from: String,
    pub to: String,
}

/// State machine over one puzzle line.
#[derive(Debug, Clone)]
pub struct PuzzleSolver<R> {
    timeline: Timeline<R>,
    expected: Vec<String>,
    move_index: usize,
    solved: bool,
}

impl<R: RulesEngine> PuzzleSolver<R> {
    /// Build a solver at `start` and play the setup move (`expected[0]`).
    pub fn new(rules: R, start: &str, expected: Vec<String>) -> Result<Self> {
        let Some(setup) = expected.first() else {
            return Err(Error::Pgn("puzzle line has no moves".to_string()));
        };

        let spec = rules
            .resolve_san(start, setup)
            .ok_or_else(|| Error::Position(format!("setup move {} is not legal", setup)))?;

        let mut timeline = Timeline::new(rules, start, None);
        if !timeline.advance(&spec, None).is_applied() {
            return Err(Error::Position(format!("setup move {} is not legal", setup)));
        }

        let solved = expected.len() == 1;
        Ok(Self {
            timeline,
            expected,
            move_index: 0,
            solved,
        })
    }

    /// Try a SAN move against the expected continuation.
    pub fn attempt(&mut self, san: &str) -> Attempt {
        match self.timeline.rules().resolve_san(self.timeline.position(), san) {
            Some(spec) => self.attempt_move(&spec),
            None => Attempt::Incorrect(Rejection::Illegal),
        }
    }

    /// Try a concrete move against the expected continuation.
    pub fn attempt_move(&mut self, spec: &MoveSpec) -> Attempt {
        let rules = self.timeline.rules();
        let position = self.timeline.position();
        let Some(candidate) = rules.apply_move(position, spec) else {
            return Attempt::Incorrect(Rejection::Illegal);
        };

        let matches = self
            .expected_spec()
            .is_some_and(|expected| expected == candidate.record.spec());
        if !matches {
            tracing::debug!(
                attempted = %candidate.record.san,
                expected = ?self.next_expected(),
                move_index = self.move_index,
                "Wrong puzzle move"
            );
            return Attempt::Incorrect(Rejection::WrongMove);
        }

        match self.step(spec) {
            Some(record) => Attempt::Correct(record),
            None => Attempt::Incorrect(Rejection::Illegal),
        }
    }

    /// Play the next expected move regardless of whose turn it is.
    pub fn play_expected(&mut self) -> Option<MoveRecord> {
        let spec = self.expected_spec()?;
        self.step(&spec)
    }

    /// Take back the last move of the line. The setup move cannot be taken back.
    pub fn retreat(&mut self) -> bool {
        if self.move_index == 0 {
            return false;
        }
        self.timeline.retreat();
        self.move_index -= 1;
        self.solved = false;
        true
    }

    pub fn hint(&self) -> Option<Hint> {
        let spec = self.expected_spec()?;
        let piece = rules::piece_at(self.timeline.position(), &spec.from)?;
        Some(Hint {
            piece,
            square: spec.from,
        })
    }

    pub fn solution(&self) -> Option<Solution> {
        let spec = self.expected_spec()?;
        let san = self.next_expected()?.to_string();
        Some(Solution {
            san,
            from: spec.from,
            to: spec.to,
        })
    }

    /// Depth reached, in solver moves, as stored in the progress ledger
    pub fn progress_value(&self) -> u32 {
        ((self.move_index + 1) / 2) as u32
    }

    /// Number of moves the solver has to find
    pub fn total_moves(&self) -> u32 {
        (self.expected.len() / 2) as u32
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn move_index(&self) -> usize {
        self.move_index
    }

    pub fn expected(&self) -> &[String] {
        &self.expected
    }

    /// SAN of the move the puzzle expects next
    pub fn next_expected(&self) -> Option<&str> {
        if self.solved {
            return None;
        }
        self.expected.get(self.move_index + 1).map(String::as_str)
    }

    pub fn timeline(&self) -> &Timeline<R> {
        &self.timeline
    }

    pub fn position(&self) -> &str {
        self.timeline.position()
    }

    fn expected_spec(&self) -> Option<MoveSpec> {
        let san = self.next_expected()?;
        let spec = self
            .timeline
            .rules()
            .resolve_san(self.timeline.position(), rules::strip_annotations(san));
        if spec.is_none() {
            tracing::warn!(san, move_index = self.move_index, "Expected move is not legal");
        }
        spec
    }

    fn step(&mut self, spec: &MoveSpec) -> Option<MoveRecord> {
        match self.timeline.advance(spec, None) {
            MoveOutcome::Applied { record, .. } => {
                self.move_index += 1;
                if self.move_index + 1 == self.expected.len() {
                    self.solved = true;
                    tracing::debug!(moves = self.total_moves(), "Puzzle solved");
                }
                Some(record)
            }
            MoveOutcome::Illegal => None,
        }
    }
}
