//! Puzzle catalog
//!
//! The catalog is a JSON array of [`PuzzleInfo`] entries describing every
//! puzzle file under the puzzles directory. It is produced by
//! [`Catalog::gather`] and only ever read by sessions.

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::pgn::GameRecord;
use crate::progress::ProgressLedger;
use crate::rules::{RulesEngine, ShakmatyRules};
use crate::store::KeyValueStore;
use crate::types::{PuzzleType, Side};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Catalog entry for one puzzle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PuzzleInfo {
    /// Content hash of the puzzle file
    pub hash: String,
    /// Path relative to the puzzles directory
    pub path: String,
    /// Moves the solver has to find
    pub moves: u32,
    /// Share of hard moves, in `[0, 1]`
    pub hardness: f64,
    pub puzzle_type: PuzzleType,
    pub white_to_move: bool,
    pub name: String,
    pub white: String,
    pub black: String,
    pub date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub initial_evaluation: String,
}

impl Default for PuzzleInfo {
    fn default() -> Self {
        Self {
            hash: String::new(),
            path: String::new(),
            moves: 0,
            hardness: 0.0,
            puzzle_type: PuzzleType::Unknown,
            white_to_move: true,
            name: String::new(),
            white: "?".to_string(),
            black: "?".to_string(),
            date: "????.??.??".to_string(),
            initial_evaluation: String::new(),
        }
    }
}

impl PuzzleInfo {
    /// Describe the puzzle stored at `path` (relative) with contents `text`.
    ///
    /// Theme and hardness come from the `PuzzleType` and `Hardness` tags.
    pub fn from_pgn(path: &str, text: &str) -> Result<Self> {
        let record = GameRecord::parse(text)?;
        let setup = record
            .moves
            .first()
            .ok_or_else(|| Error::Pgn(format!("{}: puzzle has no moves", path)))?;

        let rules = ShakmatyRules::new();
        let start = record.starting_position();
        let solver_side = rules
            .resolve_san(start, setup)
            .and_then(|spec| rules.apply_move(start, &spec))
            .and_then(|applied| rules.side_to_move(&applied.position))
            .ok_or_else(|| Error::Pgn(format!("{}: setup move {} is not legal", path, setup)))?;

        let hardness = record
            .header("Hardness")
            .and_then(|h| h.parse::<f64>().ok())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);
        let puzzle_type = record
            .header("PuzzleType")
            .map(|t| t.parse().unwrap_or(PuzzleType::Unknown))
            .unwrap_or(PuzzleType::Unknown);

        Ok(Self {
            hash: content_hash(text),
            path: path.to_string(),
            moves: (record.moves.len() / 2) as u32,
            hardness,
            puzzle_type,
            white_to_move: solver_side == Side::White,
            name: record.title(),
            white: record.header("White").unwrap_or("?").to_string(),
            black: record.header("Black").unwrap_or("?").to_string(),
            date: record.header("Date").unwrap_or("????.??.??").to_string(),
            initial_evaluation: record.header("Evaluation").unwrap_or_default().to_string(),
        })
    }

    /// Whether the entry passes `filter`, given whether it was attempted
    pub fn matches(&self, filter: &FilterConfig, attempted: bool) -> bool {
        filter.themes.contains(&self.puzzle_type)
            && (!filter.only_unsolved || !attempted)
            && self.moves >= filter.min_moves
            && self.moves <= filter.max_moves
            && self.hardness >= filter.min_hardness
            && self.hardness <= filter.max_hardness
    }
}

/// Identifier of a puzzle file: first 16 bytes of SHA-256, hex-encoded
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let result = hasher.finalize();

    hex::encode(&result[..16])
}

/// Every known puzzle, indexed by hash
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<PuzzleInfo>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(entries: Vec<PuzzleInfo>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.hash.clone(), i))
            .collect();
        Self { entries, index }
    }

    /// Load a catalog JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let entries: Vec<PuzzleInfo> = serde_json::from_str(&text)?;
        tracing::info!(path = %path.display(), puzzles = entries.len(), "Catalog loaded");
        Ok(Self::new(entries))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }

    /// Every `*.pgn` file below `dir`, sorted
    pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
        let pattern = dir.join("**").join("*.pgn");
        let pattern_str = pattern.to_string_lossy();
        let entries = glob::glob(&pattern_str)
            .map_err(|e| Error::Config(format!("invalid puzzle pattern: {}", e)))?;

        let mut paths: Vec<PathBuf> = entries.flatten().collect();
        paths.sort();
        Ok(paths)
    }

    /// Build a catalog from every puzzle file below `dir`. Files that fail
    /// to parse are logged and skipped.
    pub fn gather(dir: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        for path in Self::discover(dir)? {
            match Self::describe(dir, &path) {
                Ok(info) => entries.push(info),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping puzzle"),
            }
        }

        let mut catalog = Self::new(entries);
        catalog.sort();
        tracing::info!(dir = %dir.display(), puzzles = catalog.len(), "Catalog gathered");
        Ok(catalog)
    }

    /// Describe one discovered file relative to `dir`.
    pub fn describe(dir: &Path, path: &Path) -> Result<PuzzleInfo> {
        let text = std::fs::read_to_string(path)?;
        let relative = path.strip_prefix(dir).unwrap_or(path);
        PuzzleInfo::from_pgn(&relative.to_string_lossy(), &text)
    }

    /// Order by theme, then hardness, then length
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            a.puzzle_type
                .sort_rank()
                .cmp(&b.puzzle_type.sort_rank())
                .then(a.hardness.total_cmp(&b.hardness))
                .then(a.moves.cmp(&b.moves))
        });
        *self = Self::new(std::mem::take(&mut self.entries));
    }

    pub fn get(&self, hash: &str) -> Option<&PuzzleInfo> {
        self.index.get(hash).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[PuzzleInfo] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries passing `filter`
    pub fn filter<S: KeyValueStore>(
        &self,
        filter: &FilterConfig,
        ledger: &ProgressLedger<S>,
    ) -> Vec<&PuzzleInfo> {
        self.entries
            .iter()
            .filter(|p| p.matches(filter, ledger.contains(&p.hash)))
            .collect()
    }

    /// Uniformly random entry among those passing `filter`
    pub fn pick_random<S: KeyValueStore, G: Rng + ?Sized>(
        &self,
        filter: &FilterConfig,
        ledger: &ProgressLedger<S>,
        rng: &mut G,
    ) -> Option<&PuzzleInfo> {
        let candidates = self.filter(filter, ledger);
        candidates.choose(rng).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    const PUZZLE: &str = r#"[White "Alpha"]
[Black "Beta"]
[Date "2024.01.01"]
[PuzzleType "mating net"]
[Hardness "0.5"]

1. e4 e5 2. Qh5 Nc6 *
"#;

    fn info(hash: &str, moves: u32, hardness: f64, puzzle_type: PuzzleType) -> PuzzleInfo {
        PuzzleInfo {
            hash: hash.to_string(),
            moves,
            hardness,
            puzzle_type,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_pgn() {
        let info = PuzzleInfo::from_pgn("a/one.pgn", PUZZLE).unwrap();
        assert_eq!(info.moves, 2);
        assert_eq!(info.hardness, 0.5);
        assert_eq!(info.puzzle_type, PuzzleType::MatingNet);
        assert!(!info.white_to_move);
        assert_eq!(info.name, "Alpha vs. Beta (2024.01.01)");
        assert_eq!(info.hash.len(), 32);
        assert_eq!(info.hash, content_hash(PUZZLE));
    }

    #[test]
    fn test_from_pgn_rejects_illegal_setup() {
        assert!(PuzzleInfo::from_pgn("bad.pgn", "1. e5 *").is_err());
    }

    #[test]
    fn test_catalog_json_uses_camel_case() {
        let json = r#"[{"hash": "h1", "path": "p.pgn", "moves": 3, "hardness": 0.25,
                        "puzzleType": "checkmate", "whiteToMove": false}]"#;
        let entries: Vec<PuzzleInfo> = serde_json::from_str(json).unwrap();
        let catalog = Catalog::new(entries);
        let entry = catalog.get("h1").unwrap();
        assert_eq!(entry.puzzle_type, PuzzleType::Checkmate);
        assert!(!entry.white_to_move);
        assert_eq!(entry.white, "?");
    }

    #[test]
    fn test_filter() {
        let catalog = Catalog::new(vec![
            info("a", 2, 0.1, PuzzleType::Checkmate),
            info("b", 5, 0.9, PuzzleType::Checkmate),
            info("c", 2, 0.1, PuzzleType::Stalemate),
        ]);
        let mut ledger = ProgressLedger::load(MemoryStore::new()).unwrap();

        let mut filter = FilterConfig {
            themes: vec![PuzzleType::Checkmate],
            max_moves: 4,
            ..Default::default()
        };
        let hashes: Vec<&str> = catalog
            .filter(&filter, &ledger)
            .iter()
            .map(|p| p.hash.as_str())
            .collect();
        assert_eq!(hashes, vec!["a"]);

        ledger.set("a", 0).unwrap();
        filter.only_unsolved = true;
        assert!(catalog.filter(&filter, &ledger).is_empty());
    }

    #[test]
    fn test_pick_random() {
        let catalog = Catalog::new(vec![
            info("a", 2, 0.1, PuzzleType::Checkmate),
            info("b", 2, 0.1, PuzzleType::Checkmate),
        ]);
        let ledger = ProgressLedger::load(MemoryStore::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let picked = catalog
            .pick_random(&FilterConfig::default(), &ledger, &mut rng)
            .unwrap();
        assert!(picked.hash == "a" || picked.hash == "b");

        let none = FilterConfig {
            min_moves: 10,
            ..Default::default()
        };
        assert!(catalog.pick_random(&none, &ledger, &mut rng).is_none());
    }

    #[test]
    fn test_gather_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("set")).unwrap();
        std::fs::write(dir.path().join("set").join("one.pgn"), PUZZLE).unwrap();
        std::fs::write(dir.path().join("broken.pgn"), "1. e5 *").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = Catalog::gather(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries()[0].path, "set/one.pgn");

        let out = dir.path().join("catalog.json");
        catalog.save(&out).unwrap();
        let loaded = Catalog::load(&out).unwrap();
        assert_eq!(loaded.entries(), catalog.entries());
    }

    #[test]
    fn test_sort_order() {
        let mut catalog = Catalog::new(vec![
            info("s", 1, 0.0, PuzzleType::Stalemate),
            info("m2", 3, 0.5, PuzzleType::MatingNet),
            info("m1", 3, 0.2, PuzzleType::MatingNet),
        ]);
        catalog.sort();
        let order: Vec<&str> = catalog.entries().iter().map(|p| p.hash.as_str()).collect();
        assert_eq!(order, vec!["m1", "m2", "s"]);
        assert_eq!(catalog.get("s").unwrap().moves, 1);
    }
}
