//! Note file identity resolution.
//!
//! # Responsibility
//! - Turn a user-proposed name into a unique, filesystem-safe note file name.
//! - Drive the re-prompt loop as an explicit state machine.
//!
//! # Invariants
//! - A resolved name always carries the note extension.
//! - A resolved name is never a member of the existing-name set
//!   (case-sensitive exact comparison on the full file name).
//! - Cancellation ends resolution; nothing is retried on the caller's behalf.

use crate::model::note::{strip_note_extension, with_note_extension};
use log::debug;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Characters that would escape the directory or break mention tokens.
const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', '\0', '[', ']'];

/// Resolution was aborted by the user. Callers treat this as "save aborted".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl Display for Cancelled {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "name entry cancelled")
    }
}

impl Error for Cancelled {}

/// Why a proposed name was rejected. Shown to the user on re-prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRejection {
    Empty,
    /// The normalized file name already exists.
    Collision(String),
    InvalidCharacter { name: String, ch: char },
    /// Dot-files are reserved for temporary and probe files.
    Reserved(String),
}

impl Display for NameRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "File name cannot be empty."),
            Self::Collision(name) => write!(
                f,
                "File name \"{name}\" already exists. Please enter a different name."
            ),
            Self::InvalidCharacter { name, ch } => {
                write!(f, "File name \"{name}\" cannot contain `{ch}`.")
            }
            Self::Reserved(name) => write!(f, "File name \"{name}\" cannot start with `.`."),
        }
    }
}

/// Interactive name source.
pub trait NamePrompter {
    /// Asks for a name. `rejection` explains why the previous answer was
    /// refused. Returns `None` when the user cancels.
    fn prompt_name(&mut self, rejection: Option<&NameRejection>) -> Option<String>;
}

/// Resolver state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveState {
    /// Waiting for input; carries the reason the last input was refused.
    Prompting(Option<NameRejection>),
    Resolved(String),
    Cancelled,
}

/// Request/response state machine for choosing a note file name.
#[derive(Debug)]
pub struct IdentityResolver<'a> {
    existing_names: &'a HashSet<String>,
    state: ResolveState,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(existing_names: &'a HashSet<String>) -> Self {
        Self {
            existing_names,
            state: ResolveState::Prompting(None),
        }
    }

    pub fn state(&self) -> &ResolveState {
        &self.state
    }

    /// Feeds one answer. `None` cancels. Answers after a terminal state are
    /// ignored.
    pub fn submit(&mut self, answer: Option<String>) -> &ResolveState {
        if !matches!(self.state, ResolveState::Prompting(_)) {
            return &self.state;
        }
        self.state = match answer {
            None => ResolveState::Cancelled,
            Some(raw) => match check_name(&raw, self.existing_names) {
                Ok(name) => ResolveState::Resolved(name),
                Err(rejection) => {
                    debug!("event=identity_reject module=identity status=rejected");
                    ResolveState::Prompting(Some(rejection))
                }
            },
        };
        &self.state
    }
}

/// Resolves a unique note file name.
///
/// `proposed_name` is tried first when present; any rejection, or a missing
/// proposal, falls through to `prompter` until a name resolves or the user
/// cancels.
pub fn resolve(
    proposed_name: Option<String>,
    existing_names: &HashSet<String>,
    prompter: &mut dyn NamePrompter,
) -> Result<String, Cancelled> {
    let mut resolver = IdentityResolver::new(existing_names);
    if let Some(name) = proposed_name {
        resolver.submit(Some(name));
    }

    loop {
        let rejection = match resolver.state() {
            ResolveState::Resolved(name) => return Ok(name.clone()),
            ResolveState::Cancelled => return Err(Cancelled),
            ResolveState::Prompting(rejection) => rejection.clone(),
        };
        let answer = prompter.prompt_name(rejection.as_ref());
        resolver.submit(answer);
    }
}

/// Validates and normalizes one answer against the existing names.
pub fn check_name(raw: &str, existing_names: &HashSet<String>) -> Result<String, NameRejection> {
    let trimmed = raw.trim();
    if strip_note_extension(trimmed).is_empty() {
        return Err(NameRejection::Empty);
    }
    if let Some(ch) = trimmed
        .chars()
        .find(|ch| FORBIDDEN_NAME_CHARS.contains(ch) || ch.is_control())
    {
        return Err(NameRejection::InvalidCharacter {
            name: trimmed.to_string(),
            ch,
        });
    }
    if trimmed.starts_with('.') {
        return Err(NameRejection::Reserved(trimmed.to_string()));
    }

    let file_name = with_note_extension(trimmed);
    if existing_names.contains(&file_name) {
        return Err(NameRejection::Collision(file_name));
    }
    Ok(file_name)
}
