//! Version history model.
//!
//! # Invariants
//! - `VersionEntry` is immutable once created.
//! - File keys are the full note file name; session keys never end with the
//!   note extension, so the two namespaces cannot collide.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const SESSION_KEY_PREFIX: &str = "session-";

/// One saved snapshot of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub text: String,
    /// Serialized as ISO-8601 under the external `savedAt` name.
    #[serde(rename = "savedAt")]
    pub saved_at: DateTime<Utc>,
}

impl VersionEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(text: impl Into<String>) -> Self {
        Self::at(text, Utc::now())
    }

    pub fn at(text: impl Into<String>, saved_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            saved_at,
        }
    }

    /// Picker label, `#1` being the oldest entry.
    pub fn display_label(&self, index: usize) -> String {
        format!(
            "#{} - {}",
            index + 1,
            self.saved_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Key a history sequence is stored under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HistoryKey(String);

impl HistoryKey {
    /// Key for a note that has a file name (with extension).
    pub fn for_file(file_name: &str) -> Self {
        Self(file_name.to_string())
    }

    /// Session-local key used before a note has an identity.
    pub fn session(note_id: Uuid) -> Self {
        Self(format!("{SESSION_KEY_PREFIX}{note_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_session(&self) -> bool {
        self.0.starts_with(SESSION_KEY_PREFIX)
    }
}

impl Display for HistoryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
