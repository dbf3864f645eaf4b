//! Navigable sequence of positions
//!
//! A [`Timeline`] holds every position explored in a session plus a pointer
//! to the one on display. Entries after the pointer form a continuation that
//! survives navigation; only [`Timeline::advance`] ever discards them, and
//! only when the user plays a move away from the last entry.

use crate::rules::RulesEngine;
use crate::types::{Annotation, GameResult, MoveRecord, MoveSpec, PositionEntry};

/// Outcome of [`Timeline::advance`]
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Move was legal and is now the last entry
    Applied {
        index: usize,
        record: MoveRecord,
        /// Number of later entries discarded first
        truncated: usize,
    },
    /// Rules engine rejected the move; nothing changed
    Illegal,
}

impl MoveOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MoveOutcome::Applied { .. })
    }
}

/// Ordered positions with a current pointer. Never empty.
#[derive(Debug, Clone)]
pub struct Timeline<R> {
    rules: R,
    entries: Vec<PositionEntry>,
    current: usize,
}

impl<R: RulesEngine> Timeline<R> {
    pub fn new(rules: R, start: impl Into<String>, annotation: Option<Annotation>) -> Self {
        Self {
            rules,
            entries: vec![PositionEntry::root(start, annotation)],
            current: 0,
        }
    }

    /// Play `spec` from the current entry.
    pub fn advance(&mut self, spec: &MoveSpec, seed: Option<Annotation>) -> MoveOutcome {
        let Some(applied) = self.rules.apply_move(self.position(), spec) else {
            tracing::debug!(uci = %spec, index = self.current, "Illegal move rejected");
            return MoveOutcome::Illegal;
        };

        let truncated = self.entries.len() - self.current - 1;
        if truncated > 0 {
            self.entries.truncate(self.current + 1);
            tracing::debug!(truncated, index = self.current, "Discarded explored continuation");
        }

        self.entries.push(PositionEntry {
            position: applied.position,
            played: Some(applied.record.clone()),
            annotation: seed,
        });
        self.current = self.entries.len() - 1;

        MoveOutcome::Applied {
            index: self.current,
            record: applied.record,
            truncated,
        }
    }

    /// Step back one entry. Never removes entries.
    pub fn retreat(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Step forward one entry, replaying its recorded move.
    pub fn replay_forward(&mut self) -> bool {
        if self.is_last() {
            return false;
        }

        let next = &self.entries[self.current + 1];
        if let Some(record) = &next.played {
            match self.rules.apply_move(&self.entries[self.current].position, &record.spec()) {
                Some(applied) if applied.position == next.position => {}
                Some(applied) => tracing::warn!(
                    index = self.current + 1,
                    expected = %next.position,
                    actual = %applied.position,
                    "Replayed move produced a different position"
                ),
                None => tracing::warn!(
                    index = self.current + 1,
                    uci = %record.uci,
                    "Recorded move no longer replays"
                ),
            }
        }

        self.current += 1;
        true
    }

    /// Navigate to `index` one step at a time. Never truncates.
    pub fn jump(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        while self.current > index {
            self.retreat();
        }
        while self.current < index {
            self.replay_forward();
        }
        true
    }

    /// Overwrite the annotation at `index` without moving the pointer.
    pub fn annotate(&mut self, index: usize, annotation: Annotation) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.annotation = Some(annotation);
                true
            }
            None => false,
        }
    }

    /// Result at the current entry, asked fresh from the rules engine
    pub fn result(&self) -> Option<GameResult> {
        self.rules.result(self.position())
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.entries.len()
    }

    /// FEN of the current entry
    pub fn position(&self) -> &str {
        &self.entries[self.current].position
    }

    pub fn current_entry(&self) -> &PositionEntry {
        &self.entries[self.current]
    }

    pub fn entry(&self, index: usize) -> Option<&PositionEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[PositionEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ShakmatyRules;
    use crate::types::{MoveQuality, STARTING_POSITION};

    fn timeline() -> Timeline<ShakmatyRules> {
        Timeline::new(ShakmatyRules::new(), STARTING_POSITION, None)
    }

    fn uci(text: &str) -> MoveSpec {
        MoveSpec::parse_uci(text).unwrap()
    }

    #[test]
    fn test_advance_appends() {
        let mut tl = timeline();
        let outcome = tl.advance(&uci("e2e4"), None);
        assert!(outcome.is_applied());
        assert_eq!(tl.len(), 2);
        assert_eq!(tl.current_index(), 1);
        assert!(tl.is_last());
        assert_eq!(tl.current_entry().played.as_ref().unwrap().san, "e4");
    }

    #[test]
    fn test_illegal_move_is_noop() {
        let mut tl = timeline();
        assert_eq!(tl.advance(&uci("e2e5"), None), MoveOutcome::Illegal);
        assert_eq!(tl.len(), 1);
        assert_eq!(tl.current_index(), 0);
    }

    #[test]
    fn test_truncate_on_deviation() {
        let mut tl = timeline();
        for m in ["e2e4", "e7e5", "g1f3"] {
            tl.advance(&uci(m), None);
        }
        assert!(tl.jump(1));
        assert_eq!(tl.len(), 4);

        let outcome = tl.advance(&uci("c7c5"), None);
        match outcome {
            MoveOutcome::Applied { index, truncated, .. } => {
                assert_eq!(index, 2);
                assert_eq!(truncated, 2);
            }
            MoveOutcome::Illegal => panic!("c5 is legal"),
        }
        assert_eq!(tl.len(), 3);
        assert!(tl.is_last());
    }

    #[test]
    fn test_navigation_keeps_entries() {
        let mut tl = timeline();
        for m in ["d2d4", "d7d5"] {
            tl.advance(&uci(m), None);
        }
        let before = tl.entries().to_vec();

        assert!(tl.retreat());
        assert!(tl.retreat());
        assert!(!tl.retreat());
        assert!(tl.replay_forward());
        assert!(tl.replay_forward());
        assert!(!tl.replay_forward());

        assert_eq!(tl.entries(), before.as_slice());
        assert_eq!(tl.current_index(), 2);
    }

    #[test]
    fn test_jump_out_of_range() {
        let mut tl = timeline();
        tl.advance(&uci("e2e4"), None);
        assert!(!tl.jump(2));
        assert_eq!(tl.current_index(), 1);
        assert!(tl.jump(0));
        assert_eq!(tl.position(), STARTING_POSITION);
    }

    #[test]
    fn test_annotate_in_place() {
        let mut tl = timeline();
        tl.advance(&uci("e2e4"), None);
        tl.retreat();

        let annotation = Annotation::classified(MoveQuality::Best, "Book move");
        assert!(tl.annotate(1, annotation.clone()));
        assert_eq!(tl.current_index(), 0);
        assert_eq!(tl.entry(1).unwrap().annotation.as_ref(), Some(&annotation));
        assert!(!tl.annotate(5, annotation));
    }

    #[test]
    fn test_result_follows_current_entry() {
        let mut tl = timeline();
        for m in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            assert!(tl.advance(&uci(m), None).is_applied());
        }
        assert_eq!(tl.result(), Some(GameResult::BlackWins));
        tl.retreat();
        assert_eq!(tl.result(), None);
    }
}
