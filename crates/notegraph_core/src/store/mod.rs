//! Directory capability layer.
//!
//! # Responsibility
//! - Describe the user-granted writable directory (`DirectoryBinding`) and
//!   the opaque file handles (`FileRef`) minted under it.
//! - Define the `DirectoryStore` contract every storage backend implements.
//!
//! # Invariants
//! - Every operation receives the binding explicitly; there is no global
//!   "current directory".
//! - A `FileRef` is only valid against the binding that minted it. Using it
//!   against any other binding fails with `StoreError::StaleBinding`.
//! - `write_text` replaces the whole file or leaves the old content intact.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

mod fs_store;

pub use fs_store::FsDirectoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Lazy listing of note files in a bound directory.
pub type TextEntries<'a> = Box<dyn Iterator<Item = StoreResult<TextEntry>> + 'a>;

/// Errors raised by directory capability operations.
#[derive(Debug)]
pub enum StoreError {
    /// Grant refused, revoked, or missing write access.
    PermissionDenied(PathBuf),
    /// Folder selection was aborted by the user.
    UserCancelled,
    /// The handle was minted under a binding that is no longer active.
    StaleBinding { file_name: String },
    /// Creation requested for a name that already exists.
    AlreadyExists(String),
    NotFound(String),
    /// Name is not a plain note file name inside the directory.
    InvalidName(String),
    Io {
        op: &'static str,
        name: String,
        source: io::Error,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied(path) => {
                write!(f, "read-write permission denied for `{}`", path.display())
            }
            Self::UserCancelled => write!(f, "folder selection cancelled"),
            Self::StaleBinding { file_name } => write!(
                f,
                "file handle `{file_name}` belongs to a directory that is no longer bound"
            ),
            Self::AlreadyExists(name) => write!(f, "file already exists: {name}"),
            Self::NotFound(name) => write!(f, "file not found: {name}"),
            Self::InvalidName(name) => write!(f, "invalid note file name: `{name}`"),
            Self::Io { op, name, source } => write!(f, "{op} failed for `{name}`: {source}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Live access level of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    ReadWrite,
    ReadOnly,
    /// Missing, not a directory, or not listable.
    Unavailable,
}

/// Creation semantics for `DirectoryStore::create_or_open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Fail with `AlreadyExists` if the name is taken.
    CreateNew,
    /// Fail with `NotFound` if the name is absent.
    OpenExisting,
}

/// Active directory grant plus user-facing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBinding {
    binding_id: Uuid,
    root: PathBuf,
    display_name: String,
}

impl DirectoryBinding {
    /// Creates a binding with a fresh id. Handles minted under earlier
    /// bindings of the same path are not accepted by this one.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let display_name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self {
            binding_id: Uuid::new_v4(),
            root,
            display_name,
        }
    }

    pub fn binding_id(&self) -> Uuid {
        self.binding_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether `file_ref` was minted under this binding.
    pub fn owns(&self, file_ref: &FileRef) -> bool {
        file_ref.binding_id == self.binding_id
    }

    /// Mints a handle for `file_name` under this binding.
    pub fn file_ref(&self, file_name: impl Into<String>) -> FileRef {
        FileRef {
            binding_id: self.binding_id,
            file_name: file_name.into(),
        }
    }

    /// Rejects handles minted under another binding.
    pub fn ensure_owns(&self, file_ref: &FileRef) -> StoreResult<()> {
        if self.owns(file_ref) {
            Ok(())
        } else {
            Err(StoreError::StaleBinding {
                file_name: file_ref.file_name.clone(),
            })
        }
    }
}

/// Opaque handle to one note file inside a bound directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRef {
    binding_id: Uuid,
    file_name: String,
}

impl FileRef {
    /// File name including the note extension.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// One note file found while listing a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub name: String,
    pub file_ref: FileRef,
}

/// Platform folder-selection capability.
pub trait FolderPicker {
    /// Returns the chosen folder, or `None` when the user cancels.
    fn pick_folder(&mut self) -> Option<PathBuf>;
}

/// Storage backend for note files in a user-granted directory.
pub trait DirectoryStore {
    /// Asks the user for a folder and confirms read-write access to it.
    fn request_binding(&self, picker: &mut dyn FolderPicker) -> StoreResult<DirectoryBinding>;
    /// Probes live access to `root` without mutating visible entries.
    fn check_permission(&self, root: &Path) -> PermissionState;
    /// Lists note files. Order is unspecified and may differ between calls.
    fn list_text_entries<'a>(&'a self, binding: &'a DirectoryBinding)
        -> StoreResult<TextEntries<'a>>;
    fn read_text(&self, binding: &DirectoryBinding, file_ref: &FileRef) -> StoreResult<String>;
    fn create_or_open(
        &self,
        binding: &DirectoryBinding,
        name: &str,
        mode: OpenMode,
    ) -> StoreResult<FileRef>;
    /// Replaces the full content of the file.
    fn write_text(
        &self,
        binding: &DirectoryBinding,
        file_ref: &FileRef,
        text: &str,
    ) -> StoreResult<()>;
    fn remove(&self, binding: &DirectoryBinding, name: &str) -> StoreResult<()>;
}
