//! Versioned note persistence and mention-graph engine.
//! Notes live as plain `.txt` files in one user-granted directory; their
//! saved versions and the remembered grant live in a local SQLite file.

pub mod config;
pub mod db;
pub mod history;
pub mod identity;
pub mod logging;
pub mod mention;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod suggest;

pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use history::VersionLog;
pub use identity::{Cancelled, IdentityResolver, NamePrompter, NameRejection, ResolveState};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use mention::graph::{
    build_graph, compute_counts, Graph, GraphPayload, GraphSink, LinkCounts, MentionEdge,
};
pub use mention::parser::extract_mentions;
pub use model::note::{NoteId, NoteRecord};
pub use model::version::{HistoryKey, VersionEntry};
pub use repo::binding_repo::{BindingRepository, SqliteBindingRepository, StoredBinding};
pub use repo::version_repo::{SqliteVersionRepository, VersionRepository};
pub use repo::{RepoError, RepoResult};
pub use service::{
    DownloadError, DownloadSink, LoadReport, NoteWorkspace, SaveOutcome, WorkspaceError,
    WorkspaceResult,
};
pub use store::{
    DirectoryBinding, DirectoryStore, FileRef, FolderPicker, FsDirectoryStore, OpenMode,
    PermissionState, StoreError, StoreResult,
};
pub use suggest::{compute_candidates, KeyOutcome, SuggestionKey, SuggestionSession};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
