//! Durable puzzle progress
//!
//! The ledger maps a puzzle identifier (its content hash) to the number of
//! solver moves found. Incremental saves are first-write-wins so that a
//! second try at a failed puzzle never improves its record; imports replace
//! the whole map.

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::store::KeyValueStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Store key holding the ledger
pub const PROGRESS_KEY: &str = "progress";

/// How [`ProgressLedger::success_rate`] counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessMode {
    /// A puzzle counts as solved only when every move was found
    #[default]
    Puzzles,
    /// Found moves over total moves across attempted puzzles
    Moves,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SuccessRate {
    pub solved: u32,
    pub attempted: u32,
    pub ratio: f64,
}

impl SuccessRate {
    pub fn percent(&self) -> f64 {
        self.ratio * 100.0
    }
}

type ChangeCallback = Box<dyn FnMut(&str, Option<u32>) + Send>;

/// Map from puzzle id to best-known result, persisted on every change
pub struct ProgressLedger<S> {
    store: S,
    entries: BTreeMap<String, u32>,
    on_change: Option<ChangeCallback>,
}

impl<S: KeyValueStore> ProgressLedger<S> {
    /// Load the ledger from `store`. Corrupt data is logged and read as empty.
    pub fn load(store: S) -> Result<Self> {
        let value = store.get(PROGRESS_KEY)?;
        let entries = match decode_entries(&value) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Stored progress is unreadable, starting empty");
                BTreeMap::new()
            }
        };

        tracing::debug!(entries = entries.len(), "Progress loaded");
        Ok(Self {
            store,
            entries,
            on_change: None,
        })
    }

    /// Register the change notification sink. Removals report `None`.
    pub fn with_callback(mut self, callback: impl FnMut(&str, Option<u32>) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn get(&self, id: &str) -> Option<u32> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Record `value` unconditionally. On a store failure the ledger is
    /// left unchanged.
    pub fn set(&mut self, id: &str, value: u32) -> Result<()> {
        let mut staged = self.entries.clone();
        staged.insert(id.to_string(), value);
        self.persist(&staged)?;
        self.entries = staged;
        self.notify(id, Some(value));
        Ok(())
    }

    /// Record `value` only if `id` has no result yet. Returns whether it wrote.
    pub fn save_if_first(&mut self, id: &str, value: u32) -> Result<bool> {
        if self.entries.contains_key(id) {
            tracing::debug!(id, value, "Progress already recorded, keeping first result");
            return Ok(false);
        }
        self.set(id, value)?;
        Ok(true)
    }

    /// Replace the whole ledger with `entries`.
    pub fn merge(&mut self, entries: BTreeMap<String, u32>) -> Result<()> {
        self.persist(&entries)?;
        let previous = std::mem::replace(&mut self.entries, entries);

        for id in previous.keys() {
            if !self.entries.contains_key(id) {
                self.notify(id, None);
            }
        }
        let current: Vec<(String, u32)> =
            self.entries.iter().map(|(k, v)| (k.clone(), *v)).collect();
        for (id, value) in current {
            if previous.get(&id) != Some(&value) {
                self.notify(&id, Some(value));
            }
        }

        tracing::info!(entries = self.entries.len(), "Progress replaced");
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.merge(BTreeMap::new())
    }

    /// Pretty JSON object of every entry
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Replace the ledger with an exported JSON object. Values may be numbers
    /// or booleans. Returns the number of entries imported.
    pub fn import_json(&mut self, text: &str) -> Result<usize> {
        let value: Value = serde_json::from_str(text)?;
        let entries = decode_entries(&value)?;
        let count = entries.len();
        self.merge(entries)?;
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Success over attempted puzzles known to `catalog`. Unknown ids are ignored.
    pub fn success_rate(&self, catalog: &Catalog, mode: SuccessMode) -> SuccessRate {
        let mut solved = 0u32;
        let mut attempted = 0u32;

        for (id, value) in &self.entries {
            let Some(puzzle) = catalog.get(id) else {
                continue;
            };
            match mode {
                SuccessMode::Puzzles => {
                    attempted += 1;
                    if *value >= puzzle.moves {
                        solved += 1;
                    }
                }
                SuccessMode::Moves => {
                    attempted += puzzle.moves;
                    solved += *value;
                }
            }
        }

        let ratio = if attempted > 0 {
            f64::from(solved) / f64::from(attempted)
        } else {
            0.0
        };
        SuccessRate {
            solved,
            attempted,
            ratio,
        }
    }

    fn persist(&self, entries: &BTreeMap<String, u32>) -> Result<()> {
        let value = serde_json::to_value(entries)?;
        self.store.set(PROGRESS_KEY, &value)
    }

    fn notify(&mut self, id: &str, value: Option<u32>) {
        if let Some(callback) = self.on_change.as_mut() {
            callback(id, value);
        }
    }
}

/// Progress cell text: `found/total`, empty when never attempted
pub fn solved_symbol(value: Option<u32>, moves: u32) -> String {
    match value {
        Some(value) => format!("{}/{}", value, moves),
        None => String::new(),
    }
}

fn decode_entries(value: &Value) -> Result<BTreeMap<String, u32>> {
    let object = value
        .as_object()
        .ok_or_else(|| Error::Store("progress must be a JSON object".to_string()))?;

    let mut entries = BTreeMap::new();
    for (id, raw) in object {
        let parsed = match raw {
            Value::Bool(solved) => Some(u32::from(*solved)),
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
                .and_then(|v| u32::try_from(v).ok()),
            _ => None,
        };
        match parsed {
            Some(v) => {
                entries.insert(id.clone(), v);
            }
            None => tracing::warn!(id = %id, value = %raw, "Skipping unreadable progress entry"),
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PuzzleInfo;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn catalog() -> Catalog {
        Catalog::new(vec![
            PuzzleInfo {
                hash: "a".to_string(),
                moves: 2,
                ..Default::default()
            },
            PuzzleInfo {
                hash: "b".to_string(),
                moves: 3,
                ..Default::default()
            },
        ])
    }

    #[test]
    fn test_first_write_wins() {
        let mut ledger = ProgressLedger::load(MemoryStore::new()).unwrap();
        assert!(ledger.save_if_first("a", 1).unwrap());
        assert!(!ledger.save_if_first("a", 2).unwrap());
        assert_eq!(ledger.get("a"), Some(1));

        ledger.set("a", 2).unwrap();
        assert_eq!(ledger.get("a"), Some(2));
    }

    /// Store whose writes always fail
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Value> {
            Ok(json!({"kept": 1}))
        }

        fn set(&self, key: &str, _value: &Value) -> Result<()> {
            Err(Error::Store(format!("{} is read-only", key)))
        }
    }

    #[test]
    fn test_failed_write_leaves_ledger_unchanged() {
        let mut ledger = ProgressLedger::load(ReadOnlyStore).unwrap();

        assert!(ledger.save_if_first("a", 0).is_err());
        assert_eq!(ledger.get("a"), None);

        assert!(ledger.set("kept", 5).is_err());
        assert_eq!(ledger.get("kept"), Some(1));

        assert!(ledger.clear().is_err());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_persists_through_store() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut ledger = ProgressLedger::load(Arc::clone(&store)).unwrap();
            ledger.set("a", 2).unwrap();
        }
        let ledger = ProgressLedger::load(store).unwrap();
        assert_eq!(ledger.get("a"), Some(2));
    }

    #[test]
    fn test_corrupt_store_reads_empty() {
        let store = MemoryStore::new();
        store.insert_raw(PROGRESS_KEY, "[1, 2, 3]").unwrap();
        let ledger = ProgressLedger::load(store).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_import_accepts_booleans() {
        let mut ledger = ProgressLedger::load(MemoryStore::new()).unwrap();
        ledger.set("old", 1).unwrap();

        let count = ledger
            .import_json(r#"{"a": true, "b": false, "c": 3}"#)
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(ledger.get("a"), Some(1));
        assert_eq!(ledger.get("b"), Some(0));
        assert_eq!(ledger.get("c"), Some(3));
        assert_eq!(ledger.get("old"), None);
    }

    #[test]
    fn test_import_rejects_non_object() {
        let mut ledger = ProgressLedger::load(MemoryStore::new()).unwrap();
        ledger.set("a", 1).unwrap();
        assert!(ledger.import_json("[1]").is_err());
        assert!(ledger.import_json("not json").is_err());
        assert_eq!(ledger.get("a"), Some(1));
    }

    #[test]
    fn test_export_roundtrip() {
        let mut ledger = ProgressLedger::load(MemoryStore::new()).unwrap();
        ledger.set("a", 2).unwrap();
        let exported: Value = serde_json::from_str(&ledger.export_json().unwrap()).unwrap();
        assert_eq!(exported, json!({"a": 2}));
    }

    #[test]
    fn test_change_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut ledger = ProgressLedger::load(MemoryStore::new())
            .unwrap()
            .with_callback(move |id, value| sink.lock().unwrap().push((id.to_string(), value)));

        ledger.set("a", 1).unwrap();
        ledger.save_if_first("a", 5).unwrap();
        ledger.clear().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![("a".to_string(), Some(1)), ("a".to_string(), None)]
        );
    }

    #[test]
    fn test_success_rate_modes() {
        let mut ledger = ProgressLedger::load(MemoryStore::new()).unwrap();
        ledger.set("a", 2).unwrap();
        ledger.set("b", 1).unwrap();
        ledger.set("unknown", 7).unwrap();

        let rate = ledger.success_rate(&catalog(), SuccessMode::Puzzles);
        assert_eq!((rate.solved, rate.attempted), (1, 2));
        assert!((rate.ratio - 0.5).abs() < 1e-9);

        let rate = ledger.success_rate(&catalog(), SuccessMode::Moves);
        assert_eq!((rate.solved, rate.attempted), (3, 5));
    }

    #[test]
    fn test_success_rate_empty() {
        let ledger = ProgressLedger::load(MemoryStore::new()).unwrap();
        let rate = ledger.success_rate(&catalog(), SuccessMode::Puzzles);
        assert_eq!(rate, SuccessRate::default());
    }

    #[test]
    fn test_solved_symbol() {
        assert_eq!(solved_symbol(Some(1), 3), "1/3");
        assert_eq!(solved_symbol(None, 3), "");
    }
}
