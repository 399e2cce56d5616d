//! Note record model.
//!
//! # Responsibility
//! - Hold one note's live text plus its optional file identity.
//! - Derive display names and history keys from that identity.
//!
//! # Invariants
//! - `identity` and `backing_ref` are both `Some` or both `None`.
//! - `identity` never carries the note file extension.
//! - A note without identity keys its history under a session-local key.

use crate::model::version::HistoryKey;
use crate::store::FileRef;
use uuid::Uuid;

/// Session-local handle for a live note. Not persisted anywhere.
pub type NoteId = Uuid;

/// Fixed extension of note files inside a bound directory.
pub const NOTE_FILE_EXTENSION: &str = ".txt";

/// Label shown for notes that have not been saved to a directory yet.
pub const NEW_NOTE_DISPLAY_NAME: &str = "New Note";

/// One in-memory note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    note_id: NoteId,
    identity: Option<String>,
    backing_ref: Option<FileRef>,
    history_key: HistoryKey,
    /// Current live text, including unsaved edits.
    pub content: String,
}

impl NoteRecord {
    /// Creates an unsaved note with a fresh session key for its history.
    pub fn new(content: impl Into<String>) -> Self {
        let note_id = Uuid::new_v4();
        Self {
            note_id,
            identity: None,
            backing_ref: None,
            history_key: HistoryKey::session(note_id),
            content: content.into(),
        }
    }

    /// Creates a note from a file that already exists in the bound directory.
    pub fn hydrated(file_ref: FileRef, content: impl Into<String>) -> Self {
        let history_key = HistoryKey::for_file(file_ref.file_name());
        Self {
            note_id: Uuid::new_v4(),
            identity: Some(strip_note_extension(file_ref.file_name()).to_string()),
            backing_ref: Some(file_ref),
            history_key,
            content: content.into(),
        }
    }

    pub fn note_id(&self) -> NoteId {
        self.note_id
    }

    /// File-derived name without extension, once the note has been saved.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn backing_ref(&self) -> Option<&FileRef> {
        self.backing_ref.as_ref()
    }

    /// Full file name (with extension) of the backing file.
    pub fn file_name(&self) -> Option<&str> {
        self.backing_ref.as_ref().map(FileRef::file_name)
    }

    pub fn history_key(&self) -> &HistoryKey {
        &self.history_key
    }

    /// Human-facing label: the identity, or a placeholder before first save.
    pub fn display_name(&self) -> &str {
        self.identity().unwrap_or(NEW_NOTE_DISPLAY_NAME)
    }

    /// Whether the note is backed by a file in the bound directory.
    pub fn is_directory_backed(&self) -> bool {
        self.backing_ref.is_some()
    }

    /// Attaches the note to a backing file and returns the previous history key.
    ///
    /// Called on first successful directory save and on rename; the caller
    /// owns migrating history from the returned key.
    pub(crate) fn bind_file(&mut self, file_ref: FileRef) -> HistoryKey {
        self.identity = Some(strip_note_extension(file_ref.file_name()).to_string());
        let next_key = HistoryKey::for_file(file_ref.file_name());
        self.backing_ref = Some(file_ref);
        std::mem::replace(&mut self.history_key, next_key)
    }
}

/// Appends the note extension when absent.
pub fn with_note_extension(name: &str) -> String {
    if name.ends_with(NOTE_FILE_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{NOTE_FILE_EXTENSION}")
    }
}

/// Removes one trailing note extension, if present.
pub fn strip_note_extension(name: &str) -> &str {
    name.strip_suffix(NOTE_FILE_EXTENSION).unwrap_or(name)
}

/// Whether a directory entry name follows the note file convention.
pub fn is_note_file_name(name: &str) -> bool {
    name.len() > NOTE_FILE_EXTENSION.len() && name.ends_with(NOTE_FILE_EXTENSION)
}
