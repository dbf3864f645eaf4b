//! Minimal PGN reader
//!
//! Reads tag pairs and the SAN mainline of a single game. Comments,
//! variations, NAGs, move numbers and the result token are skipped.

use crate::error::{Error, Result};
use crate::types::{GameResult, STARTING_POSITION};
use std::collections::BTreeMap;

/// A loaded game record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameRecord {
    pub headers: BTreeMap<String, String>,
    /// Mainline moves in SAN
    pub moves: Vec<String>,
}

impl GameRecord {
    /// Parse the first game in `text`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut headers = BTreeMap::new();
        let mut movetext = String::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('[') && movetext.trim().is_empty() {
                let (key, value) = parse_tag(trimmed)?;
                headers.insert(key, value);
            } else if trimmed.starts_with('[') {
                // Start of the next game
                break;
            } else if !trimmed.starts_with('%') {
                movetext.push_str(line);
                movetext.push('\n');
            }
        }

        let moves = parse_movetext(&movetext)?;
        if headers.is_empty() && moves.is_empty() {
            return Err(Error::Pgn("no game found".to_string()));
        }

        Ok(Self { headers, moves })
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Position the movetext starts from: the `FEN` tag, or the standard start
    pub fn starting_position(&self) -> &str {
        self.header("FEN").unwrap_or(STARTING_POSITION)
    }

    pub fn result(&self) -> Option<GameResult> {
        match self.header("Result")? {
            "1-0" => Some(GameResult::WhiteWins),
            "0-1" => Some(GameResult::BlackWins),
            "1/2-1/2" => Some(GameResult::Draw),
            _ => None,
        }
    }

    /// `White vs. Black (Date)` with `?` placeholders for missing tags
    pub fn title(&self) -> String {
        format!(
            "{} vs. {} ({})",
            self.header("White").unwrap_or("?"),
            self.header("Black").unwrap_or("?"),
            self.header("Date").unwrap_or("????.??.??")
        )
    }
}

fn parse_tag(line: &str) -> Result<(String, String)> {
    let inner = line
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| Error::Pgn(format!("malformed tag pair: {}", line)))?;

    let (key, value) = inner
        .split_once(char::is_whitespace)
        .ok_or_else(|| Error::Pgn(format!("malformed tag pair: {}", line)))?;

    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| Error::Pgn(format!("unquoted tag value: {}", line)))?;

    Ok((key.to_string(), value.replace("\\\"", "\"")))
}

fn parse_movetext(text: &str) -> Result<Vec<String>> {
    let mut moves = Vec::new();
    let mut token = String::new();
    let mut depth = 0usize;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                flush(&mut token, &mut moves, depth);
                // Brace comments do not nest
                if !chars.by_ref().any(|c| c == '}') {
                    return Err(Error::Pgn("unterminated comment".to_string()));
                }
            }
            ';' => {
                flush(&mut token, &mut moves, depth);
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => {
                flush(&mut token, &mut moves, depth);
                depth += 1;
            }
            ')' => {
                flush(&mut token, &mut moves, depth);
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::Pgn("unbalanced variation".to_string()))?;
            }
            c if c.is_whitespace() => flush(&mut token, &mut moves, depth),
            c => token.push(c),
        }
    }
    flush(&mut token, &mut moves, depth);

    if depth != 0 {
        return Err(Error::Pgn("unterminated variation".to_string()));
    }
    Ok(moves)
}

fn flush(token: &mut String, moves: &mut Vec<String>, depth: usize) {
    if token.is_empty() {
        return;
    }
    let taken = std::mem::take(token);
    if depth > 0 || is_result(&taken) {
        return;
    }
    let san = strip_move_number(&taken);
    if san.is_empty() || san.starts_with('$') {
        return;
    }
    if san.starts_with("0-0") {
        moves.push(san.replace('0', "O"));
    } else {
        moves.push(san.to_string());
    }
}

/// "12.e4" and "12...e5" carry the move glued to its number. Digits not
/// followed by a dot ("0-0") are part of the move.
fn strip_move_number(token: &str) -> &str {
    let digits = token.len() - token.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = &token[digits..];
    if digits > 0 && rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else {
        token
    }
}

fn is_result(token: &str) -> bool {
    matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*")
}
