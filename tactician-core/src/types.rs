//! Core domain types for tactician
//!
//! These types are shared by every session kind (puzzles, endgames, reviews)
//! and carry no rules knowledge: positions are FEN strings and moves are
//! square pairs. Legality is decided by a [`crate::rules::RulesEngine`].
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Position** | A FEN string describing a full board state |
//! | **Timeline** | The navigable sequence of positions explored in one session |
//! | **Annotation** | Evaluation, move quality and tablebase distance attached to a move |
//! | **Puzzle** | A position plus one known-correct continuation |
//! | **Record** | A loadable game record (PGN) identified by a content hash |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// FEN of the standard starting position
pub const STARTING_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// ============================================
// Moves
// ============================================

/// Side to move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }
}

/// A move request: origin square, target square and optional promotion piece.
///
/// Squares are lowercase algebraic (`e2`). Promotion is a lowercase piece
/// letter (`q`, `r`, `b`, `n`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MoveSpec {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<char>,
}

impl MoveSpec {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, piece: char) -> Self {
        self.promotion = Some(piece.to_ascii_lowercase());
        self
    }

    /// Parse a UCI move (`e2e4`, `e7e8q`). Returns `None` for malformed text.
    pub fn parse_uci(text: &str) -> Option<MoveSpec> {
        let text = text.trim();
        if !text.is_ascii() || !(text.len() == 4 || text.len() == 5) {
            return None;
        }

        let from = &text[0..2];
        let to = &text[2..4];
        if !is_square(from) || !is_square(to) {
            return None;
        }

        let promotion = match text[4..].chars().next() {
            None => None,
            Some(c) if matches!(c.to_ascii_lowercase(), 'q' | 'r' | 'b' | 'n') => {
                Some(c.to_ascii_lowercase())
            }
            Some(_) => return None,
        };

        Some(MoveSpec {
            from: from.to_string(),
            to: to.to_string(),
            promotion,
        })
    }

    /// UCI text for this move
    pub fn to_uci(&self) -> String {
        match self.promotion {
            Some(piece) => format!("{}{}{}", self.from, self.to, piece),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

impl fmt::Display for MoveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

fn is_square(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 2 && (b'a'..=b'h').contains(&bytes[0]) && (b'1'..=b'8').contains(&bytes[1])
}

/// A move as played, described by the rules engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// UCI notation (`e2e4`, castling as king move `e1g1`)
    pub uci: String,
    /// Standard algebraic notation including `+`/`#` suffix
    pub san: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<char>,
    #[serde(default)]
    pub capture: bool,
    #[serde(default)]
    pub check: bool,
    #[serde(default)]
    pub checkmate: bool,
}

impl MoveRecord {
    /// The request that reproduces this move
    pub fn spec(&self) -> MoveSpec {
        MoveSpec {
            from: self.from.clone(),
            to: self.to.clone(),
            promotion: self.promotion,
        }
    }
}

/// Result of applying a legal move to a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    /// FEN after the move
    pub position: String,
    pub record: MoveRecord,
}

/// Terminal result of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameResult {
    /// PGN result token
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
        }
    }

    /// Short form used in counters and status lines
    pub fn display(&self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "½-½",
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// Annotations
// ============================================

/// Move-quality classification assigned by a reviewer or tablebase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveQuality {
    Brilliant,
    Great,
    Best,
    Inaccuracy,
    Mistake,
    Miss,
    Blunder,
    Forced,
    #[default]
    #[serde(other)]
    None,
}

impl MoveQuality {
    /// Annotation glyph shown next to the move
    pub fn symbol(&self) -> &'static str {
        match self {
            MoveQuality::Brilliant => "!!",
            MoveQuality::Great => "!",
            MoveQuality::Best => "★",
            MoveQuality::Inaccuracy => "?!",
            MoveQuality::Mistake => "?",
            MoveQuality::Miss => "×",
            MoveQuality::Blunder => "??",
            MoveQuality::Forced => "⮕",
            MoveQuality::None => "",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveQuality::Brilliant => "brilliant",
            MoveQuality::Great => "great",
            MoveQuality::Best => "best",
            MoveQuality::Inaccuracy => "inaccuracy",
            MoveQuality::Mistake => "mistake",
            MoveQuality::Miss => "miss",
            MoveQuality::Blunder => "blunder",
            MoveQuality::Forced => "forced",
            MoveQuality::None => "none",
        }
    }
}

impl FromStr for MoveQuality {
    type Err = std::convert::Infallible;

    /// Unknown and empty labels map to [`MoveQuality::None`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "brilliant" => MoveQuality::Brilliant,
            "great" => MoveQuality::Great,
            "best" => MoveQuality::Best,
            "inaccuracy" => MoveQuality::Inaccuracy,
            "mistake" => MoveQuality::Mistake,
            "miss" => MoveQuality::Miss,
            "blunder" => MoveQuality::Blunder,
            "forced" => MoveQuality::Forced,
            _ => MoveQuality::None,
        })
    }
}

/// Engine evaluation from White's point of view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Evaluation {
    /// Score in pawns
    Pawns(f64),
    /// Signed distance to mate in moves
    Mate(i32),
}

impl Evaluation {
    /// Evaluation-bar fill in `[-1, 1]`; positive favors White.
    pub fn bar_scale(&self) -> f64 {
        match *self {
            Evaluation::Pawns(value) => {
                let scaled = 0.4 * value;
                scaled / (1.0 + scaled.abs())
            }
            Evaluation::Mate(moves) => f64::from(moves.signum()),
        }
    }
}

impl FromStr for Evaluation {
    type Err = String;

    /// Review files store pawn scores with a decimal point and mates as bare
    /// integers (`"0.35"`, `"-3"`); `M3` is accepted as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('.') {
            return s
                .parse::<f64>()
                .map(Evaluation::Pawns)
                .map_err(|e| format!("invalid evaluation {:?}: {}", s, e));
        }

        let digits = s
            .strip_prefix('M')
            .or_else(|| s.strip_prefix('#'))
            .unwrap_or(s);
        digits
            .parse::<i32>()
            .map(Evaluation::Mate)
            .map_err(|e| format!("invalid evaluation {:?}: {}", s, e))
    }
}

impl TryFrom<String> for Evaluation {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Evaluation> for String {
    fn from(value: Evaluation) -> Self {
        match value {
            Evaluation::Pawns(pawns) => format!("{:.2}", pawns),
            Evaluation::Mate(moves) => moves.to_string(),
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Pawns(pawns) => write!(f, "{:.2}", pawns),
            Evaluation::Mate(moves) => write!(f, "M{}", moves),
        }
    }
}

/// Tablebase distance (distance-to-mate or distance-to-zero) in plies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TablebaseDistance(pub i32);

impl TablebaseDistance {
    /// Mate counter text: `M3`, `-M2`, or `-` for zero
    pub fn mate_counter(&self) -> String {
        if self.0 == 0 {
            return "-".to_string();
        }

        let sign = if self.0 < 0 { "-" } else { "" };
        let moves_to_mate = (self.0.unsigned_abs() + 2) / 2;
        format!("{}M{}", sign, moves_to_mate)
    }
}

/// Per-move overlay attached to a timeline entry after the fact
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub quality: MoveQuality,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tablebase: Option<TablebaseDistance>,
}

impl Annotation {
    pub fn classified(quality: MoveQuality, description: impl Into<String>) -> Self {
        Self {
            quality,
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_evaluation(mut self, evaluation: Evaluation) -> Self {
        self.evaluation = Some(evaluation);
        self
    }

    pub fn with_tablebase(mut self, distance: i32) -> Self {
        self.tablebase = Some(TablebaseDistance(distance));
        self
    }
}

// ============================================
// Timeline entries
// ============================================

/// One element of a timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionEntry {
    /// FEN of this position
    pub position: String,
    /// The move that produced this entry; `None` only for the root
    pub played: Option<MoveRecord>,
    pub annotation: Option<Annotation>,
}

impl PositionEntry {
    pub fn root(position: impl Into<String>, annotation: Option<Annotation>) -> Self {
        Self {
            position: position.into(),
            played: None,
            annotation,
        }
    }
}

// ============================================
// Puzzle catalog
// ============================================

/// Puzzle theme as produced by the puzzle finder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PuzzleType {
    #[serde(rename = "checkmate")]
    Checkmate,
    #[serde(rename = "mating net")]
    MatingNet,
    #[serde(rename = "material advantage")]
    MaterialAdvantage,
    #[serde(rename = "insufficient material")]
    InsufficientMaterial,
    #[serde(rename = "repetition")]
    Repetition,
    #[serde(rename = "stalemate")]
    Stalemate,
    #[serde(rename = "unknown", other)]
    Unknown,
}

impl PuzzleType {
    /// Themes a user can select
    pub const THEMES: [PuzzleType; 6] = [
        PuzzleType::Checkmate,
        PuzzleType::MatingNet,
        PuzzleType::MaterialAdvantage,
        PuzzleType::InsufficientMaterial,
        PuzzleType::Repetition,
        PuzzleType::Stalemate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PuzzleType::Checkmate => "checkmate",
            PuzzleType::MatingNet => "mating net",
            PuzzleType::MaterialAdvantage => "material advantage",
            PuzzleType::InsufficientMaterial => "insufficient material",
            PuzzleType::Repetition => "repetition",
            PuzzleType::Stalemate => "stalemate",
            PuzzleType::Unknown => "unknown",
        }
    }

    /// Sort rank used when listing puzzles (unknown first, stalemates last)
    pub fn sort_rank(&self) -> u8 {
        match self {
            PuzzleType::Unknown => 0,
            PuzzleType::MatingNet => 1,
            PuzzleType::InsufficientMaterial => 2,
            PuzzleType::MaterialAdvantage => 3,
            PuzzleType::Repetition => 4,
            PuzzleType::Checkmate => 5,
            PuzzleType::Stalemate => 6,
        }
    }
}

impl FromStr for PuzzleType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', " ");
        Ok(PuzzleType::THEMES
            .into_iter()
            .find(|theme| theme.as_str() == normalized)
            .unwrap_or(PuzzleType::Unknown))
    }
}

impl fmt::Display for PuzzleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which record is loaded: where to fetch it and its identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub locator: String,
    pub identifier: String,
}

impl HistoryEntry {
    pub fn new(locator: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            identifier: identifier.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uci() {
        let spec = MoveSpec::parse_uci("e2e4").unwrap();
        assert_eq!(spec, MoveSpec::new("e2", "e4"));

        let spec = MoveSpec::parse_uci("e7e8Q").unwrap();
        assert_eq!(spec.promotion, Some('q'));
        assert_eq!(spec.to_uci(), "e7e8q");

        assert!(MoveSpec::parse_uci("e2e9").is_none());
        assert!(MoveSpec::parse_uci("e7e8k").is_none());
        assert!(MoveSpec::parse_uci("Nf3").is_none());
    }

    #[test]
    fn test_move_quality_symbols() {
        assert_eq!(MoveQuality::Brilliant.symbol(), "!!");
        assert_eq!(MoveQuality::Blunder.symbol(), "??");
        assert_eq!(MoveQuality::None.symbol(), "");
        assert_eq!("Mistake".parse::<MoveQuality>().unwrap(), MoveQuality::Mistake);
        assert_eq!("".parse::<MoveQuality>().unwrap(), MoveQuality::None);
    }

    #[test]
    fn test_move_quality_deserializes_unknown_as_none() {
        let quality: MoveQuality = serde_json::from_str("\"great\"").unwrap();
        assert_eq!(quality, MoveQuality::Great);
        let quality: MoveQuality = serde_json::from_str("\"\"").unwrap();
        assert_eq!(quality, MoveQuality::None);
    }

    #[test]
    fn test_parse_evaluation() {
        assert_eq!("0.35".parse::<Evaluation>().unwrap(), Evaluation::Pawns(0.35));
        assert_eq!("-3".parse::<Evaluation>().unwrap(), Evaluation::Mate(-3));
        assert_eq!("M2".parse::<Evaluation>().unwrap(), Evaluation::Mate(2));
        assert!("abc".parse::<Evaluation>().is_err());

        assert_eq!(Evaluation::Mate(-3).to_string(), "M-3");
        assert_eq!(Evaluation::Pawns(1.0).to_string(), "1.00");
    }

    #[test]
    fn test_evaluation_bar_scale() {
        assert_eq!(Evaluation::Pawns(0.0).bar_scale(), 0.0);
        let scale = Evaluation::Pawns(2.5).bar_scale();
        assert!((scale - 0.5).abs() < 1e-9);
        assert_eq!(Evaluation::Mate(-4).bar_scale(), -1.0);
    }

    #[test]
    fn test_mate_counter() {
        assert_eq!(TablebaseDistance(0).mate_counter(), "-");
        assert_eq!(TablebaseDistance(1).mate_counter(), "M1");
        assert_eq!(TablebaseDistance(5).mate_counter(), "M3");
        assert_eq!(TablebaseDistance(-4).mate_counter(), "-M3");
    }

    #[test]
    fn test_puzzle_type_serde() {
        let theme: PuzzleType = serde_json::from_str("\"mating net\"").unwrap();
        assert_eq!(theme, PuzzleType::MatingNet);
        let theme: PuzzleType = serde_json::from_str("\"zugzwang\"").unwrap();
        assert_eq!(theme, PuzzleType::Unknown);
        assert_eq!("material_advantage".parse::<PuzzleType>().unwrap(), PuzzleType::MaterialAdvantage);
    }
}
