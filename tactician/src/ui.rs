//! Plain-text rendering for the terminal binaries

use tactician_core::moves_list::MoveCell;
use tactician_core::{MoveAnnotationList, Side};

/// Draw the piece-placement field of `fen` as an 8x8 grid, from `side`'s
/// point of view.
pub fn render_board(fen: &str, side: Side) -> String {
    let placement = fen.split_whitespace().next().unwrap_or_default();
    let mut ranks: Vec<Vec<char>> = placement
        .split('/')
        .map(|rank| {
            let mut squares = Vec::with_capacity(8);
            for c in rank.chars() {
                match c.to_digit(10) {
                    Some(empty) => squares.extend(std::iter::repeat('.').take(empty as usize)),
                    None => squares.push(c),
                }
            }
            squares
        })
        .collect();

    let mut files: Vec<char> = ('a'..='h').collect();
    let mut numbers: Vec<u32> = (1..=8).rev().collect();
    if side == Side::Black {
        ranks.reverse();
        ranks.iter_mut().for_each(|rank| rank.reverse());
        files.reverse();
        numbers.reverse();
    }

    let mut out = String::new();
    for (rank, number) in ranks.iter().zip(&numbers) {
        out.push_str(&format!("{} ", number));
        for square in rank {
            out.push(' ');
            out.push(*square);
        }
        out.push('\n');
    }
    out.push_str("  ");
    for file in files {
        out.push(' ');
        out.push(file);
    }
    out
}

fn cell(cell: &MoveCell) -> String {
    match (cell.is_placeholder(), cell.side) {
        // Black moved first
        (true, Side::White) => return "...".to_string(),
        (true, Side::Black) => return String::new(),
        _ => {}
    }
    format!("{}{}", cell.figurine, cell.symbol())
}

/// Numbered move table, two half-moves per row. `current` is the list
/// index of the move on display and is bracketed.
#[allow(dead_code)]
pub fn render_moves(moves: &MoveAnnotationList, current: Option<usize>) -> String {
    let mut out = String::new();
    for row in moves.rows() {
        let mut line = format!("{:>3}.", row.number);
        for half in [&row.white, &row.black] {
            let text = cell(half);
            if half.index.is_some() && half.index == current {
                line.push_str(&format!(" [{:<8}]", text));
            } else {
                line.push_str(&format!("  {:<8} ", text));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Horizontal evaluation bar for a fill in `[-1, 1]`
#[allow(dead_code)]
pub fn render_bar(scale: f64, width: usize) -> String {
    let filled = (((scale.clamp(-1.0, 1.0) + 1.0) / 2.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled.min(width)))
}
