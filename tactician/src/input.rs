//! Line commands shared by the interactive binaries
//!
//! Moves are typed in UCI notation (`e2e4`, `e7e8q`); everything else is a
//! short word with an optional one-letter alias.

use std::str::FromStr;
use tactician_core::MoveSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Move(MoveSpec),
    Back,
    Forward,
    /// Go to a timeline index
    Jump(usize),
    Hint,
    Solution,
    Next,
    Previous,
    Favorite,
    Reset,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err("empty command".to_string());
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "back" | "b" => Command::Back,
            "forward" | "f" => Command::Forward,
            "jump" | "j" => {
                let index = words
                    .next()
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| "usage: jump <index>".to_string())?;
                Command::Jump(index)
            }
            "hint" | "h" => Command::Hint,
            "solution" | "s" => Command::Solution,
            "next" | "n" => Command::Next,
            "prev" | "p" => Command::Previous,
            "fav" => Command::Favorite,
            "reset" | "r" => Command::Reset,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => MoveSpec::parse_uci(other)
                .map(Command::Move)
                .ok_or_else(|| format!("unknown command: {} (type help)", other))?,
        };
        Ok(command)
    }
}

pub const HELP: &str = "\
Commands:
  <uci>        play a move, e.g. e2e4 or e7e8q
  back, b      step back one move
  forward, f   step forward one move
  jump N, j N  go to position N
  hint, h      show which piece to move
  solution, s  show the expected move
  next, n      load a random puzzle
  prev, p      previous puzzle in history
  fav          toggle favorite
  reset, r     restart the current puzzle
  status       show the position again
  quit, q      exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_moves() {
        assert_eq!(
            "e2e4".parse::<Command>().unwrap(),
            Command::Move(MoveSpec::new("e2", "e4"))
        );
        assert_eq!(
            " e7e8q ".parse::<Command>().unwrap(),
            Command::Move(MoveSpec::new("e7", "e8").with_promotion('q'))
        );
    }

    #[test]
    fn test_parse_words() {
        assert_eq!("b".parse::<Command>().unwrap(), Command::Back);
        assert_eq!("QUIT".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!("jump 3".parse::<Command>().unwrap(), Command::Jump(3));
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Command>().is_err());
        assert!("jump".parse::<Command>().is_err());
        assert!("castle".parse::<Command>().is_err());
    }
}
