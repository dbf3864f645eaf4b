//! Favorite puzzles, persisted as `{ id: true }` under the `favorites` key

use crate::error::Result;
use crate::store::KeyValueStore;
use serde_json::Value;
use std::collections::BTreeSet;

pub const FAVORITES_KEY: &str = "favorites";

pub struct Favorites<S> {
    store: S,
    ids: BTreeSet<String>,
}

impl<S: KeyValueStore> Favorites<S> {
    pub fn load(store: S) -> Result<Self> {
        let ids = match store.get(FAVORITES_KEY)? {
            Value::Object(map) => map
                .into_iter()
                .filter(|(_, flag)| flag.as_bool() == Some(true))
                .map(|(id, _)| id)
                .collect(),
            other => {
                tracing::warn!(value = %other, "Stored favorites are unreadable, starting empty");
                BTreeSet::new()
            }
        };
        Ok(Self { store, ids })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Flip the flag for `id`, returning the new state.
    pub fn toggle(&mut self, id: &str) -> Result<bool> {
        let mut staged = self.ids.clone();
        let now_favorite = if staged.remove(id) {
            false
        } else {
            staged.insert(id.to_string());
            true
        };
        self.persist(&staged)?;
        self.ids = staged;
        tracing::debug!(id, favorite = now_favorite, "Favorite toggled");
        Ok(now_favorite)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn persist(&self, ids: &BTreeSet<String>) -> Result<()> {
        let map: serde_json::Map<String, Value> = ids
            .iter()
            .map(|id| (id.clone(), Value::Bool(true)))
            .collect();
        self.store.set(FAVORITES_KEY, &Value::Object(map))
    }
}
