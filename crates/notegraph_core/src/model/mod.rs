//! Domain model for in-memory notes and their saved history.
//!
//! # Responsibility
//! - Define the note record the workspace mutates and the graph reads.
//! - Define immutable history entries and the keys they are stored under.
//!
//! # Invariants
//! - A note's identity and backing file are assigned together, never apart.
//! - History entries are never mutated after they are appended.

pub mod note;
pub mod version;
