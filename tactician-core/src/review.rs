//! Engine-reviewed games
//!
//! A [`ReviewedGame`] pairs a PGN record with a review document produced by
//! an external analysis run. Review move `i` describes the `i`-th played
//! move, so it annotates timeline entry `i + 1`.

use crate::error::{Error, Result};
use crate::moves_list::MoveAnnotationList;
use crate::pgn::GameRecord;
use crate::rules::{strip_annotations, RulesEngine, ShakmatyRules};
use crate::timeline::{MoveOutcome, Timeline};
use crate::types::{Annotation, Evaluation, MoveQuality};
use serde::{Deserialize, Deserializer};

/// Review document as written by the analysis tool
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewDocument {
    #[serde(default)]
    pub moves: Vec<ReviewMove>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewMove {
    #[serde(rename = "move", default)]
    pub uci: Option<String>,
    /// `true` when White made the move
    #[serde(default)]
    pub turn: bool,
    #[serde(default)]
    pub evaluation: Option<Evaluation>,
    #[serde(default)]
    pub classification: Classification,
    /// Engine candidates from the position before this move, as `[san, eval]`
    #[serde(default)]
    pub best_moves: Vec<(String, Evaluation)>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Classification {
    #[serde(rename = "type", default)]
    pub quality: MoveQuality,
    #[serde(default)]
    pub description: String,
    /// Fraction in `[0, 1]`; written as either a number or a string
    #[serde(default, deserialize_with = "number_or_string")]
    pub accuracy: Option<f64>,
}

fn number_or_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(value)) => Some(value),
        Some(Raw::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

/// Average accuracy per side; `None` when the side made no reviewed move
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accuracy {
    pub white: Option<f64>,
    pub black: Option<f64>,
}

/// A row of the engine-lines table
#[derive(Debug, Clone, PartialEq)]
pub struct EngineLine {
    pub san: String,
    pub evaluation: Option<Evaluation>,
    /// The move actually played in the game
    pub played: bool,
}

/// Game under review, navigable like any other timeline
pub struct ReviewedGame<R = ShakmatyRules> {
    record: GameRecord,
    review: ReviewDocument,
    timeline: Timeline<R>,
    moves: MoveAnnotationList,
}

impl ReviewedGame<ShakmatyRules> {
    /// Load from PGN text and review JSON.
    pub fn parse(pgn: &str, review_json: &str) -> Result<Self> {
        let record = GameRecord::parse(pgn)?;
        let review: ReviewDocument = serde_json::from_str(review_json)?;
        Self::new(ShakmatyRules::new(), record, review)
    }
}

impl<R: RulesEngine> ReviewedGame<R> {
    pub fn new(rules: R, record: GameRecord, review: ReviewDocument) -> Result<Self> {
        if review.moves.len() != record.moves.len() {
            tracing::warn!(
                played = record.moves.len(),
                reviewed = review.moves.len(),
                "Review does not cover every move"
            );
        }

        let mut timeline = Timeline::new(rules, record.starting_position(), None);
        for (ply, san) in record.moves.iter().enumerate() {
            let spec = timeline
                .rules()
                .resolve_san(timeline.position(), san)
                .ok_or_else(|| Error::Pgn(format!("illegal move {} at ply {}", san, ply + 1)))?;

            let annotation = review.moves.get(ply).map(annotation_of);
            if let MoveOutcome::Illegal = timeline.advance(&spec, annotation) {
                return Err(Error::Pgn(format!(
                    "illegal move {} at ply {}",
                    san,
                    ply + 1
                )));
            }
        }
        timeline.jump(0);

        let moves = MoveAnnotationList::from_timeline(&timeline);
        tracing::debug!(plies = record.moves.len(), "Reviewed game loaded");

        Ok(Self {
            record,
            review,
            timeline,
            moves,
        })
    }

    pub fn forward(&mut self) -> bool {
        self.timeline.replay_forward()
    }

    pub fn backward(&mut self) -> bool {
        self.timeline.retreat()
    }

    pub fn jump(&mut self, index: usize) -> bool {
        self.timeline.jump(index)
    }

    pub fn accuracy(&self) -> Accuracy {
        let mut white = (0.0, 0u32);
        let mut black = (0.0, 0u32);
        for m in &self.review.moves {
            let Some(accuracy) = m.classification.accuracy else {
                continue;
            };
            let side = if m.turn { &mut white } else { &mut black };
            side.0 += accuracy;
            side.1 += 1;
        }

        let average = |(sum, count): (f64, u32)| (count > 0).then(|| sum / f64::from(count));
        Accuracy {
            white: average(white),
            black: average(black),
        }
    }

    /// Review of the move that led to the current position
    pub fn current_review(&self) -> Option<&ReviewMove> {
        let index = self.timeline.current_index().checked_sub(1)?;
        self.review.moves.get(index)
    }

    /// Evaluation after the current move and its bar fill in `[-1, 1]`.
    ///
    /// A mate delivered on the board (mate in 0) fills the bar towards the
    /// side that moved.
    pub fn evaluation(&self) -> Option<(Evaluation, f64)> {
        let reviewed = self.current_review()?;
        let evaluation = reviewed.evaluation?;
        let scale = match evaluation {
            Evaluation::Mate(0) if reviewed.turn => 1.0,
            Evaluation::Mate(0) => -1.0,
            other => other.bar_scale(),
        };
        Some((evaluation, scale))
    }

    /// Engine candidates for the next move, with the game move marked.
    ///
    /// When the game move is not among the candidates it is appended with
    /// its own evaluation.
    pub fn engine_lines(&self) -> Vec<EngineLine> {
        let index = self.timeline.current_index();
        let Some(next) = self.review.moves.get(index) else {
            return Vec::new();
        };
        let played = self.record.moves.get(index).map(|san| strip_annotations(san));

        let mut lines: Vec<EngineLine> = next
            .best_moves
            .iter()
            .map(|(san, evaluation)| EngineLine {
                san: san.clone(),
                evaluation: Some(*evaluation),
                played: played == Some(strip_annotations(san)),
            })
            .collect();

        if !lines.iter().any(|line| line.played) && next.uci.is_some() {
            if let Some(san) = self.record.moves.get(index) {
                lines.push(EngineLine {
                    san: san.clone(),
                    evaluation: next.evaluation,
                    played: true,
                });
            }
        }
        lines
    }

    pub fn title(&self) -> String {
        self.record.title()
    }

    pub fn record(&self) -> &GameRecord {
        &self.record
    }

    pub fn timeline(&self) -> &Timeline<R> {
        &self.timeline
    }

    pub fn moves(&self) -> &MoveAnnotationList {
        &self.moves
    }
}

fn annotation_of(reviewed: &ReviewMove) -> Annotation {
    Annotation {
        quality: reviewed.classification.quality,
        description: reviewed.classification.description.clone(),
        evaluation: reviewed.evaluation,
        tablebase: None,
    }
}
