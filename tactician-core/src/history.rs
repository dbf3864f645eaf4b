//! Back/forward navigation over loaded records
//!
//! Works like a browser history: adding an entry after stepping back
//! discards everything that was ahead of the cursor.

use crate::types::HistoryEntry;

#[derive(Debug, Clone)]
pub struct BrowseHistory<T = HistoryEntry> {
    entries: Vec<T>,
    cursor: usize,
}

impl<T> BrowseHistory<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
        }
    }

    /// Append `entry` after the cursor, dropping any forward entries.
    pub fn add(&mut self, entry: T) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(entry);
        self.cursor = self.entries.len() - 1;
    }

    pub fn previous(&mut self) -> Option<&T> {
        if self.entries.is_empty() || self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    pub fn next(&mut self) -> Option<&T> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.cursor)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for BrowseHistory<T> {
    fn default() -> Self {
        Self::new()
    }
}
