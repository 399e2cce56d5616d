//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate directory store, version log, repositories and the mention
//!   graph into editor-facing operations.
//! - Keep UI and CLI layers decoupled from storage details.

pub mod download;
pub mod workspace_service;

pub use download::{fallback_file_name, DownloadError, DownloadSink};
pub use workspace_service::{
    LoadReport, NoteWorkspace, SaveOutcome, WorkspaceError, WorkspaceResult,
};
