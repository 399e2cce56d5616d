//! Mention token scanner.
//!
//! Token grammar: `[@` + one or more non-`]` characters + `]`.
//! The scan is left-to-right and non-overlapping; an unterminated `[@` never
//! matches.

use crate::model::note::strip_note_extension;
use once_cell::sync::Lazy;
use regex::Regex;

/// Opening delimiter of a mention token.
pub const MENTION_OPEN: &str = "[@";
/// Closing delimiter of a mention token.
pub const MENTION_CLOSE: char = ']';

static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[@([^\]]+)\]").expect("valid mention regex"));

/// Returns raw mention identifiers in order of appearance, duplicates kept.
pub fn extract_mentions(text: &str) -> Vec<String> {
    MENTION_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Identity a raw mention refers to: the identifier without a trailing note
/// extension. Comparison against identities stays exact and case-sensitive.
pub fn mention_target(raw: &str) -> &str {
    strip_note_extension(raw)
}

/// Formats the closed mention token for `identity`.
pub fn format_mention(identity: &str) -> String {
    format!("{MENTION_OPEN}{identity}{MENTION_CLOSE}")
}
