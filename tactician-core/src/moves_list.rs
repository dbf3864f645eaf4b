//! Presentation index over a timeline's moves
//!
//! List index `i` corresponds to timeline entry `i + 1`. When the root
//! position has Black to move, `first_move` is 1 and the first row starts
//! with an empty White cell.

use crate::rules::RulesEngine;
use crate::timeline::Timeline;
use crate::types::{Annotation, MoveQuality, Side};

/// One played move and its review
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReview {
    pub uci: String,
    pub annotation: Option<Annotation>,
}

/// Display cell for a half-move
#[derive(Debug, Clone, PartialEq)]
pub struct MoveCell {
    /// List index, `None` for a placeholder
    pub index: Option<usize>,
    pub side: Side,
    pub san: String,
    /// SAN with the piece letter replaced by its figurine
    pub figurine: String,
    pub quality: MoveQuality,
    pub description: String,
}

impl MoveCell {
    fn placeholder(side: Side) -> Self {
        Self {
            index: None,
            side,
            san: String::new(),
            figurine: String::new(),
            quality: MoveQuality::None,
            description: String::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.index.is_none()
    }

    /// Quality glyph (`!!`, `?`, ...)
    pub fn symbol(&self) -> &'static str {
        self.quality.symbol()
    }
}

/// A full-move row
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRow {
    pub number: usize,
    pub white: MoveCell,
    pub black: MoveCell,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveAnnotationList {
    moves: Vec<String>,
    reviews: Vec<MoveReview>,
    first_move: usize,
}

impl MoveAnnotationList {
    pub fn new(black_moves_first: bool) -> Self {
        Self {
            moves: Vec::new(),
            reviews: Vec::new(),
            first_move: usize::from(black_moves_first),
        }
    }

    /// Mirror every played entry of `timeline`.
    pub fn from_timeline<R: RulesEngine>(timeline: &Timeline<R>) -> Self {
        let entries = timeline.entries();
        let black_first =
            timeline.rules().side_to_move(&entries[0].position) == Some(Side::Black);

        let mut list = Self::new(black_first);
        for entry in &entries[1..] {
            if let Some(record) = &entry.played {
                list.add_move(&record.uci, &record.san, entry.annotation.clone());
            }
        }
        list
    }

    /// Append a move, returning its list index.
    pub fn add_move(&mut self, uci: &str, san: &str, annotation: Option<Annotation>) -> usize {
        self.moves.push(san.to_string());
        self.reviews.push(MoveReview {
            uci: uci.to_string(),
            annotation,
        });
        self.moves.len() - 1
    }

    /// Set the classification of an existing move, keeping its evaluation.
    pub fn update_review(
        &mut self,
        index: usize,
        quality: MoveQuality,
        description: impl Into<String>,
    ) -> bool {
        let Some(review) = self.reviews.get_mut(index) else {
            return false;
        };
        let annotation = review.annotation.get_or_insert_with(Annotation::default);
        annotation.quality = quality;
        annotation.description = description.into();
        true
    }

    /// Replace the whole annotation of an existing move.
    pub fn set_annotation(&mut self, index: usize, annotation: Annotation) -> bool {
        match self.reviews.get_mut(index) {
            Some(review) => {
                review.annotation = Some(annotation);
                true
            }
            None => false,
        }
    }

    /// Keep only the first `len` moves.
    pub fn truncate(&mut self, len: usize) {
        self.moves.truncate(len);
        self.reviews.truncate(len);
    }

    /// Cell for list index `index`; past the end yields a placeholder.
    pub fn get(&self, index: usize) -> MoveCell {
        let side = self.side(index);
        let Some(san) = self.moves.get(index) else {
            return MoveCell::placeholder(side);
        };

        let annotation = self.reviews.get(index).and_then(|r| r.annotation.as_ref());
        MoveCell {
            index: Some(index),
            side,
            san: san.clone(),
            figurine: figurine(san, side),
            quality: annotation.map(|a| a.quality).unwrap_or_default(),
            description: annotation.map(|a| a.description.clone()).unwrap_or_default(),
        }
    }

    pub fn review(&self, index: usize) -> Option<&MoveReview> {
        self.reviews.get(index)
    }

    /// Full-move number of list index `index`
    pub fn move_number(&self, index: usize) -> usize {
        (index + self.first_move) / 2 + 1
    }

    pub fn side(&self, index: usize) -> Side {
        if (index + self.first_move) % 2 == 0 {
            Side::White
        } else {
            Side::Black
        }
    }

    /// Rows of white/black cells, starting with an empty white cell when
    /// Black moved first.
    pub fn rows(&self) -> Vec<MoveRow> {
        let slots = self.moves.len() + self.first_move;
        let mut rows = Vec::with_capacity(slots.div_ceil(2));

        for row in 0..slots.div_ceil(2) {
            let white_slot = row * 2;
            let white = match white_slot.checked_sub(self.first_move) {
                Some(index) => self.get(index),
                None => MoveCell::placeholder(Side::White),
            };
            let black = self.get(white_slot + 1 - self.first_move);
            rows.push(MoveRow {
                number: row + 1,
                white,
                black,
            });
        }
        rows
    }

    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn first_move(&self) -> usize {
        self.first_move
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Replace the leading piece letter of `san` with a figurine.
pub fn figurine(san: &str, side: Side) -> String {
    let mut chars = san.chars();
    let symbol = match (chars.next(), side) {
        (Some('K'), Side::White) => '♔',
        (Some('Q'), Side::White) => '♕',
        (Some('R'), Side::White) => '♖',
        (Some('B'), Side::White) => '♗',
        (Some('N'), Side::White) => '♘',
        (Some('K'), Side::Black) => '♚',
        (Some('Q'), Side::Black) => '♛',
        (Some('R'), Side::Black) => '♜',
        (Some('B'), Side::Black) => '♝',
        (Some('N'), Side::Black) => '♞',
        _ => return san.to_string(),
    };
    let mut text = String::with_capacity(san.len() + 2);
    text.push(symbol);
    text.push_str(chars.as_str());
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ShakmatyRules;
    use crate::types::{MoveSpec, STARTING_POSITION};

    #[test]
    fn test_figurines() {
        assert_eq!(figurine("Nf3", Side::White), "♘f3");
        assert_eq!(figurine("Qxh2#", Side::Black), "♛xh2#");
        assert_eq!(figurine("e4", Side::White), "e4");
        assert_eq!(figurine("O-O", Side::Black), "O-O");
    }

    #[test]
    fn test_black_first_rows() {
        let mut list = MoveAnnotationList::new(true);
        list.add_move("e7e5", "e5", None);
        list.add_move("g1f3", "Nf3", None);
        list.add_move("b8c6", "Nc6", None);

        assert_eq!(list.move_number(0), 1);
        assert_eq!(list.move_number(1), 2);
        assert_eq!(list.side(0), Side::Black);

        let rows = list.rows();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].white.is_placeholder());
        assert_eq!(rows[0].black.san, "e5");
        assert_eq!(rows[1].white.figurine, "♘f3");
        assert_eq!(rows[1].black.figurine, "♞c6");
    }

    #[test]
    fn test_placeholder_past_end() {
        let list = MoveAnnotationList::new(false);
        let cell = list.get(3);
        assert!(cell.is_placeholder());
        assert_eq!(cell.symbol(), "");
    }

    #[test]
    fn test_update_review_and_truncate() {
        let mut list = MoveAnnotationList::new(false);
        list.add_move("e2e4", "e4", None);
        list.add_move("e7e5", "e5", None);

        assert!(list.update_review(1, MoveQuality::Mistake, "Loses a tempo"));
        assert!(!list.update_review(2, MoveQuality::Best, ""));
        assert_eq!(list.get(1).symbol(), "?");
        assert_eq!(list.get(1).description, "Loses a tempo");

        list.truncate(1);
        assert_eq!(list.len(), 1);
        assert!(list.get(1).is_placeholder());
    }

    #[test]
    fn test_from_timeline() {
        let mut timeline = Timeline::new(ShakmatyRules::new(), STARTING_POSITION, None);
        timeline.advance(&MoveSpec::new("e2", "e4"), None);
        timeline.advance(
            &MoveSpec::new("e7", "e5"),
            Some(Annotation::classified(MoveQuality::Best, "")),
        );

        let list = MoveAnnotationList::from_timeline(&timeline);
        assert_eq!(list.first_move(), 0);
        assert_eq!(list.moves(), &["e4".to_string(), "e5".to_string()]);
        assert_eq!(list.review(0).unwrap().uci, "e2e4");
        assert_eq!(list.get(1).quality, MoveQuality::Best);
    }
}
