//! Chess rules collaborator
//!
//! Everything above this module treats positions as FEN strings and moves as
//! [`MoveSpec`]s. Legality, check and game-over detection are answered by a
//! [`RulesEngine`]; [`ShakmatyRules`] is the production implementation.

use crate::error::{Error, Result};
use crate::types::{AppliedMove, GameResult, MoveRecord, MoveSpec, Side};
use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Role, Square};

/// Rules oracle consulted for every move.
pub trait RulesEngine {
    /// Apply `spec` to `position`. Returns `None` when the position is
    /// malformed or the move is illegal.
    fn apply_move(&self, position: &str, spec: &MoveSpec) -> Option<AppliedMove>;

    /// Whether the game is over at `position`
    fn is_over(&self, position: &str) -> bool {
        self.result(position).is_some()
    }

    /// Terminal result at `position`, if any
    fn result(&self, position: &str) -> Option<GameResult>;

    /// Side to move at `position`
    fn side_to_move(&self, position: &str) -> Option<Side>;

    /// Translate a SAN token into a concrete move at `position`.
    fn resolve_san(&self, position: &str, san: &str) -> Option<MoveSpec>;
}

/// [`RulesEngine`] backed by shakmaty, standard chess only
#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyRules;

impl ShakmatyRules {
    pub fn new() -> Self {
        Self
    }
}

impl RulesEngine for ShakmatyRules {
    fn apply_move(&self, position: &str, spec: &MoveSpec) -> Option<AppliedMove> {
        let pos = parse_position(position).ok()?;
        let m = find_move(&pos, spec)?;
        let (after, record) = play(&pos, &m);
        Some(AppliedMove {
            position: to_fen(&after),
            record,
        })
    }

    fn result(&self, position: &str) -> Option<GameResult> {
        let pos = parse_position(position).ok()?;
        terminal_result(&pos)
    }

    fn side_to_move(&self, position: &str) -> Option<Side> {
        let pos = parse_position(position).ok()?;
        Some(side(pos.turn()))
    }

    fn resolve_san(&self, position: &str, san: &str) -> Option<MoveSpec> {
        let pos = parse_position(position).ok()?;
        let m = parse_san(&pos, san)?;
        Some(spec_of(&m))
    }
}

/// Stateful board with undo, used as the speculative instance a front-end
/// moves pieces on before the session has judged the move.
#[derive(Debug, Clone)]
pub struct Board {
    stack: Vec<Chess>,
}

impl Board {
    pub fn new() -> Self {
        Self {
            stack: vec![Chess::default()],
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self> {
        Ok(Self {
            stack: vec![parse_position(fen)?],
        })
    }

    /// Replace the whole state with `fen`, discarding undo history.
    pub fn load(&mut self, fen: &str) -> Result<()> {
        self.stack = vec![parse_position(fen)?];
        Ok(())
    }

    pub fn fen(&self) -> String {
        to_fen(self.current())
    }

    pub fn turn(&self) -> Side {
        side(self.current().turn())
    }

    /// Play a move; `None` if illegal (board unchanged).
    pub fn play(&mut self, spec: &MoveSpec) -> Option<MoveRecord> {
        let m = find_move(self.current(), spec)?;
        let (after, record) = play(self.current(), &m);
        self.stack.push(after);
        Some(record)
    }

    /// Play a SAN move; `None` if it does not resolve to a legal move.
    pub fn play_san(&mut self, san: &str) -> Option<MoveRecord> {
        let m = parse_san(self.current(), san)?;
        let (after, record) = play(self.current(), &m);
        self.stack.push(after);
        Some(record)
    }

    /// Take back the last move. Returns `false` at the loaded position.
    pub fn undo(&mut self) -> bool {
        if self.stack.len() > 1 {
            self.stack.pop();
            true
        } else {
            false
        }
    }

    pub fn history_len(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn result(&self) -> Option<GameResult> {
        terminal_result(self.current())
    }

    fn current(&self) -> &Chess {
        // The stack always holds at least the loaded position
        &self.stack[self.stack.len() - 1]
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================
// shakmaty glue
// ============================================

fn parse_position(fen: &str) -> Result<Chess> {
    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| Error::Position(format!("invalid FEN {:?}: {}", fen, e)))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| Error::Position(format!("illegal position {:?}: {}", fen, e)))
}

/// Normalize a FEN through the rules engine, rejecting illegal setups.
pub fn normalize_fen(fen: &str) -> Result<String> {
    parse_position(fen).map(|pos| to_fen(&pos))
}

fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string()
}

fn side(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

fn terminal_result(pos: &Chess) -> Option<GameResult> {
    if pos.is_checkmate() {
        return Some(match pos.turn() {
            Color::White => GameResult::BlackWins,
            Color::Black => GameResult::WhiteWins,
        });
    }
    if pos.is_stalemate() || pos.is_insufficient_material() || pos.halfmoves() >= 100 {
        return Some(GameResult::Draw);
    }
    None
}

/// Target square as a front-end sees it: castling is the king's two-square
/// move rather than king-takes-rook.
fn display_target(m: &Move) -> Square {
    match *m {
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() {
                File::G
            } else {
                File::C
            };
            Square::from_coords(file, king.rank())
        }
        _ => m.to(),
    }
}

fn spec_of(m: &Move) -> MoveSpec {
    let from = m.from().map(|sq| sq.to_string()).unwrap_or_default();
    MoveSpec {
        from,
        to: display_target(m).to_string(),
        promotion: m.promotion().map(|role| role.char()),
    }
}

fn find_move(pos: &Chess, spec: &MoveSpec) -> Option<Move> {
    let from: Square = spec.from.parse().ok()?;
    let to: Square = spec.to.parse().ok()?;
    let promotion = match spec.promotion {
        Some(c) => Some(Role::from_char(c.to_ascii_lowercase())?),
        None => None,
    };

    pos.legal_moves().into_iter().find(|m| {
        m.from() == Some(from)
            && (m.to() == to || display_target(m) == to)
            && m.promotion() == promotion
    })
}

fn parse_san(pos: &Chess, text: &str) -> Option<Move> {
    let cleaned = strip_annotations(text);
    let parsed: SanPlus = cleaned.parse().ok()?;
    parsed.san.to_move(pos).ok()
}

/// Drop check and annotation suffixes (`+`, `#`, `!`, `?`) from a SAN token.
pub fn strip_annotations(san: &str) -> &str {
    san.trim().trim_end_matches(['+', '#', '!', '?'])
}

fn play(pos: &Chess, m: &Move) -> (Chess, MoveRecord) {
    let san = San::from_move(pos, m).to_string();
    let capture = m.is_capture();

    let mut after = pos.clone();
    after.play_unchecked(m);

    let checkmate = after.is_checkmate();
    let check = after.is_check();
    let suffix = if checkmate {
        "#"
    } else if check {
        "+"
    } else {
        ""
    };

    let spec = spec_of(m);
    let record = MoveRecord {
        uci: spec.to_uci(),
        san: format!("{}{}", san, suffix),
        from: spec.from,
        to: spec.to,
        promotion: spec.promotion,
        capture,
        check,
        checkmate,
    };
    (after, record)
}

/// Piece letter moving from `square` at `position` (`K`, `Q`, `R`, `B`, `N`, `P`).
pub fn piece_at(position: &str, square: &str) -> Option<char> {
    let pos = parse_position(position).ok()?;
    let sq: Square = square.parse().ok()?;
    pos.board()
        .piece_at(sq)
        .map(|piece| piece.role.char().to_ascii_uppercase())
}
