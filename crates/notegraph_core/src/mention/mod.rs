//! Inline mention parsing and the derived note graph.
//!
//! # Responsibility
//! - Extract `[@identity]` tokens from note text.
//! - Derive the directed mention graph and per-note send/receive counts.
//!
//! # Invariants
//! - The graph is a pure function of the loaded notes; it is rebuilt from
//!   scratch on every change and never patched in place.
//! - Mentions to unknown identities are inert, not errors.

pub mod graph;
pub mod parser;
