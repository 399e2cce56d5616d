//! Local filesystem implementation of `DirectoryStore`.
//!
//! # Invariants
//! - Only flat `*.txt` names are accepted; separators and dot-files are
//!   rejected so every handle stays inside the bound root.
//! - Writes go to a hidden sibling temp file which is renamed over the
//!   target; on failure the temp file is removed and the target untouched.

use super::{
    DirectoryBinding, DirectoryStore, FileRef, FolderPicker, OpenMode, PermissionState,
    StoreError, StoreResult, TextEntries, TextEntry,
};
use crate::model::note::is_note_file_name;
use log::{debug, info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Note store over a plain local directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsDirectoryStore;

impl FsDirectoryStore {
    pub fn new() -> Self {
        Self
    }

    /// Binds `root` directly, requiring live read-write access.
    pub fn bind_path(&self, root: &Path) -> StoreResult<DirectoryBinding> {
        match self.check_permission(root) {
            PermissionState::ReadWrite => {
                let binding = DirectoryBinding::new(root);
                info!(
                    "event=directory_bind module=store status=ok display_name={}",
                    binding.display_name()
                );
                Ok(binding)
            }
            state => {
                warn!(
                    "event=directory_bind module=store status=error error_code=permission_denied state={state:?}"
                );
                Err(StoreError::PermissionDenied(root.to_path_buf()))
            }
        }
    }
}

impl DirectoryStore for FsDirectoryStore {
    fn request_binding(&self, picker: &mut dyn FolderPicker) -> StoreResult<DirectoryBinding> {
        let Some(root) = picker.pick_folder() else {
            info!("event=directory_bind module=store status=cancelled");
            return Err(StoreError::UserCancelled);
        };
        self.bind_path(&root)
    }

    fn check_permission(&self, root: &Path) -> PermissionState {
        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => {}
            _ => return PermissionState::Unavailable,
        }
        if fs::read_dir(root).is_err() {
            return PermissionState::Unavailable;
        }

        let probe = root.join(format!(".notegraph-probe-{}", Uuid::new_v4()));
        match OpenOptions::new().write(true).create_new(true).open(&probe) {
            Ok(file) => {
                drop(file);
                if let Err(err) = fs::remove_file(&probe) {
                    warn!("event=permission_probe module=store status=error error_code=probe_cleanup_failed error={err}");
                }
                PermissionState::ReadWrite
            }
            Err(_) => PermissionState::ReadOnly,
        }
    }

    fn list_text_entries<'a>(
        &'a self,
        binding: &'a DirectoryBinding,
    ) -> StoreResult<TextEntries<'a>> {
        let entries = fs::read_dir(binding.root())
            .map_err(|source| io_error("list", binding.display_name(), source))?;

        let iter = entries.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => return Some(Err(io_error("list", binding.display_name(), source))),
            };
            let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
            let name = entry.file_name().into_string().ok()?;
            if !is_file || validate_file_name(&name).is_err() {
                return None;
            }
            Some(Ok(TextEntry {
                file_ref: binding.file_ref(name.as_str()),
                name,
            }))
        });
        Ok(Box::new(iter))
    }

    fn read_text(&self, binding: &DirectoryBinding, file_ref: &FileRef) -> StoreResult<String> {
        binding.ensure_owns(file_ref)?;
        let name = file_ref.file_name();
        fs::read_to_string(binding.root().join(name)).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(name.to_string())
            } else {
                io_error("read", name, source)
            }
        })
    }

    fn create_or_open(
        &self,
        binding: &DirectoryBinding,
        name: &str,
        mode: OpenMode,
    ) -> StoreResult<FileRef> {
        validate_file_name(name)?;
        let path = binding.root().join(name);

        match mode {
            OpenMode::CreateNew => {
                OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .map_err(|source| {
                        if source.kind() == io::ErrorKind::AlreadyExists {
                            StoreError::AlreadyExists(name.to_string())
                        } else {
                            io_error("create", name, source)
                        }
                    })?;
                debug!("event=file_create module=store status=ok");
            }
            OpenMode::OpenExisting => {
                if !path.is_file() {
                    return Err(StoreError::NotFound(name.to_string()));
                }
            }
        }

        Ok(binding.file_ref(name))
    }

    fn write_text(
        &self,
        binding: &DirectoryBinding,
        file_ref: &FileRef,
        text: &str,
    ) -> StoreResult<()> {
        binding.ensure_owns(file_ref)?;
        let name = file_ref.file_name();
        let target = binding.root().join(name);
        let temp = temp_path_for(binding.root(), name);

        let result = write_then_rename(&temp, &target, text.as_bytes());
        if let Err(source) = result {
            if let Err(err) = discard_temp(&temp) {
                warn!("event=file_write module=store status=error error_code=temp_cleanup_failed error={err}");
            }
            warn!(
                "event=file_write module=store status=error bytes={} error={source}",
                text.len()
            );
            return Err(io_error("write", name, source));
        }

        debug!("event=file_write module=store status=ok bytes={}", text.len());
        Ok(())
    }

    fn remove(&self, binding: &DirectoryBinding, name: &str) -> StoreResult<()> {
        validate_file_name(name)?;
        fs::remove_file(binding.root().join(name)).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(name.to_string())
            } else {
                io_error("remove", name, source)
            }
        })
    }
}

fn write_then_rename(temp: &Path, target: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(temp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp, target)
}

/// Removes a leftover temp file. A temp file that was never created is fine.
fn discard_temp(temp: &Path) -> io::Result<()> {
    match fs::remove_file(temp) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn temp_path_for(root: &Path, name: &str) -> PathBuf {
    root.join(format!(".{name}.{}.{}.tmp", std::process::id(), Uuid::new_v4().simple()))
}

fn validate_file_name(name: &str) -> StoreResult<()> {
    let plain = !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && Path::new(name).file_name().map(|part| part == name).unwrap_or(false);
    if plain && is_note_file_name(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

fn io_error(op: &'static str, name: &str, source: io::Error) -> StoreError {
    StoreError::Io {
        op,
        name: name.to_string(),
        source,
    }
}
