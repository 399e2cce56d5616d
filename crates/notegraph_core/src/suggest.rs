//! Mention autocompletion.
//!
//! # Responsibility
//! - Detect an open `[@` token at the editing cursor.
//! - Filter known identities against the typed partial.
//! - Run the keyboard selection state machine and splice the chosen mention
//!   back into the text.
//!
//! # Invariants
//! - Only the current line is considered; an open token never spans lines.
//! - `selected_index` is `None` or within `0..candidates.len()`; navigation
//!   clamps and never wraps.
//! - Candidate order follows the order of the known-identity list.

use crate::mention::parser::{format_mention, MENTION_CLOSE, MENTION_OPEN};
use log::debug;

/// Longest partial that still counts as an identifier being typed.
pub const MAX_PARTIAL_CHARS: usize = 64;

/// Open mention token found before the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMention {
    /// Byte offset of the `[@` marker.
    pub start: usize,
    /// Byte offset of the cursor.
    pub cursor: usize,
    /// Text typed between the marker and the cursor.
    pub partial: String,
}

/// Finds the nearest unclosed `[@` at or before `cursor` on the current line.
///
/// `cursor` is a byte offset into `text`. Returns `None` when the offset is
/// out of range or not on a char boundary, when no marker is open, or when
/// the partial fails the charset check.
pub fn open_mention_at(text: &str, cursor: usize) -> Option<OpenMention> {
    if cursor > text.len() || !text.is_char_boundary(cursor) {
        return None;
    }
    let before = &text[..cursor];
    let line_start = before.rfind('\n').map_or(0, |index| index + 1);
    let line = &before[line_start..];
    let marker = line.rfind(MENTION_OPEN)?;
    let partial = &line[marker + MENTION_OPEN.len()..];
    if !is_plausible_partial(partial) {
        return None;
    }
    Some(OpenMention {
        start: line_start + marker,
        cursor,
        partial: partial.to_string(),
    })
}

/// Partial identifier under the cursor, if a suggestion popup should show.
pub fn on_text_changed(cursor: usize, text: &str) -> Option<String> {
    open_mention_at(text, cursor).map(|open| open.partial)
}

fn is_plausible_partial(partial: &str) -> bool {
    if partial.chars().count() > MAX_PARTIAL_CHARS {
        return false;
    }
    if partial.starts_with(char::is_whitespace) {
        return false;
    }
    !partial
        .chars()
        .any(|ch| ch == MENTION_CLOSE || ch == '[' || ch.is_control())
}

/// Filters `known` to identities matching `partial`, keeping their order.
///
/// Matching is case-insensitive and anchored on the first character; the
/// rest of the partial must appear in the identity in order. An empty
/// partial matches everything.
///
/// Non-prefix matches are intended: `"ap"` matches `"alpha"` and `"ab"`
/// matches `"alphabet"`, not only identities starting with the partial.
pub fn compute_candidates<S: AsRef<str>>(partial: &str, known: &[S]) -> Vec<String> {
    known
        .iter()
        .map(|candidate| candidate.as_ref())
        .filter(|candidate: &&str| matches_anchored(partial, candidate))
        .map(str::to_string)
        .collect()
}

fn matches_anchored(partial: &str, candidate: &str) -> bool {
    let mut wanted = partial.chars().flat_map(char::to_lowercase);
    let mut have = candidate.chars().flat_map(char::to_lowercase);
    let Some(first) = wanted.next() else {
        return true;
    };
    if have.next() != Some(first) {
        return false;
    }
    wanted.all(|ch| have.any(|other| other == ch))
}

/// Keys the suggestion popup reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKey {
    Up,
    Down,
    Enter,
    Escape,
}

/// Result of one key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Selection moved; the session stays open.
    Selected(usize),
    /// A candidate was spliced into the text; the session is finished.
    Applied { text: String, cursor: usize },
    /// Closed without touching the text.
    Closed,
}

/// Suggestion state for one editing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionSession {
    open: OpenMention,
    candidates: Vec<String>,
    selected_index: Option<usize>,
}

impl SuggestionSession {
    /// Opens a session for the token under the cursor. `None` when there is
    /// no open token or nothing matches.
    pub fn open<S: AsRef<str>>(text: &str, cursor: usize, known: &[S]) -> Option<Self> {
        let open = open_mention_at(text, cursor)?;
        let candidates = compute_candidates(&open.partial, known);
        if candidates.is_empty() {
            return None;
        }
        Some(Self {
            open,
            candidates,
            selected_index: None,
        })
    }

    pub fn partial(&self) -> &str {
        &self.open.partial
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected_index
            .and_then(|index| self.candidates.get(index))
            .map(String::as_str)
    }

    /// Applies one key to the session. When `text` no longer holds the same
    /// open token at the same offsets, the session closes without editing.
    pub fn handle_key(&mut self, key: SuggestionKey, text: &str) -> KeyOutcome {
        if open_mention_at(text, self.open.cursor).as_ref() != Some(&self.open) {
            debug!("event=suggest_key module=suggest status=skipped reason=stale_text");
            return KeyOutcome::Closed;
        }
        let last = self.candidates.len().saturating_sub(1);
        match key {
            SuggestionKey::Down => {
                let next = self.selected_index.map_or(0, |index| (index + 1).min(last));
                self.selected_index = Some(next);
                KeyOutcome::Selected(next)
            }
            SuggestionKey::Up => {
                let next = self.selected_index.map_or(0, |index| index.saturating_sub(1));
                self.selected_index = Some(next);
                KeyOutcome::Selected(next)
            }
            SuggestionKey::Escape => KeyOutcome::Closed,
            SuggestionKey::Enter => match self.selected() {
                Some(identity) => match apply_candidate(text, &self.open, identity) {
                    Some((text, cursor)) => KeyOutcome::Applied { text, cursor },
                    None => {
                        debug!("event=suggest_apply module=suggest status=skipped reason=stale_text");
                        KeyOutcome::Closed
                    }
                },
                None => KeyOutcome::Closed,
            },
        }
    }
}

/// Replaces the open token with the closed mention for `identity`.
///
/// A `]` following the cursor on the same line, before any `[`, is treated as
/// the tail of the token and consumed. Returns the new text and the cursor
/// placed after the inserted mention, or `None` when `open` no longer fits
/// `text`.
pub fn apply_candidate(text: &str, open: &OpenMention, identity: &str) -> Option<(String, usize)> {
    if open.cursor > text.len()
        || !text.is_char_boundary(open.cursor)
        || !text.is_char_boundary(open.start)
        || !text[open.start..].starts_with(MENTION_OPEN)
    {
        return None;
    }
    let tail = &text[open.cursor..];
    let end = match tail.find([MENTION_CLOSE, '[', '\n']) {
        Some(offset) if tail[offset..].starts_with(MENTION_CLOSE) => {
            open.cursor + offset + MENTION_CLOSE.len_utf8()
        }
        _ => open.cursor,
    };

    let mention = format_mention(identity);
    let mut next = String::with_capacity(text.len() + mention.len());
    next.push_str(&text[..open.start]);
    next.push_str(&mention);
    next.push_str(&text[end..]);
    Some((next, open.start + mention.len()))
}
