//! In-memory version log.
//!
//! # Responsibility
//! - Keep every saved snapshot of every note, keyed by `HistoryKey`.
//! - Migrate a note's history when it gains an identity.
//!
//! # Invariants
//! - Sequences are append-only; entries are never edited or dropped.
//! - `rekey` moves entries after any that already live under the target key,
//!   then removes the source key.
//! - Durability is the caller's job (see `VersionRepository`).

use crate::model::version::{HistoryKey, VersionEntry};
use std::collections::BTreeMap;

/// Per-note append-only history.
#[derive(Debug, Default, Clone)]
pub struct VersionLog {
    sequences: BTreeMap<HistoryKey, Vec<VersionEntry>>,
}

impl VersionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` stamped with the current time and returns the entry.
    pub fn append(&mut self, key: &HistoryKey, text: impl Into<String>) -> VersionEntry {
        self.push(key, VersionEntry::new(text))
    }

    /// Appends a pre-built entry.
    pub fn push(&mut self, key: &HistoryKey, entry: VersionEntry) -> VersionEntry {
        self.sequences
            .entry(key.clone())
            .or_default()
            .push(entry.clone());
        entry
    }

    /// Entries under `key`, oldest first. Empty when the key is unknown.
    pub fn list(&self, key: &HistoryKey) -> &[VersionEntry] {
        self.sequences.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entry at 0-based `index`.
    pub fn get(&self, key: &HistoryKey, index: usize) -> Option<&VersionEntry> {
        self.sequences.get(key).and_then(|entries| entries.get(index))
    }

    pub fn contains_key(&self, key: &HistoryKey) -> bool {
        self.sequences.contains_key(key)
    }

    /// Installs a sequence loaded from durable storage, unless the key is
    /// already tracked in memory.
    pub fn hydrate(&mut self, key: &HistoryKey, entries: Vec<VersionEntry>) {
        if entries.is_empty() {
            return;
        }
        self.sequences.entry(key.clone()).or_insert(entries);
    }

    /// Moves all entries from `from` to `to`. Returns how many moved.
    pub fn rekey(&mut self, from: &HistoryKey, to: &HistoryKey) -> usize {
        if from == to {
            return 0;
        }
        let Some(moved) = self.sequences.remove(from) else {
            return 0;
        };
        let count = moved.len();
        self.sequences.entry(to.clone()).or_default().extend(moved);
        count
    }

    /// `#n - timestamp` labels for a version picker, oldest first.
    pub fn labels(&self, key: &HistoryKey) -> Vec<String> {
        self.list(key)
            .iter()
            .enumerate()
            .map(|(index, entry)| entry.display_label(index))
            .collect()
    }
}
