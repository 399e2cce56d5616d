#![allow(dead_code)]

use notegraph_core::store::TextEntries;
use notegraph_core::{
    DirectoryBinding, DirectoryStore, DownloadError, DownloadSink, FileRef, FolderPicker,
    FsDirectoryStore, GraphPayload, GraphSink, NamePrompter, NameRejection, OpenMode,
    PermissionState, StoreError, StoreResult,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub struct Picker(pub Option<PathBuf>);

impl Picker {
    pub fn at(path: &Path) -> Self {
        Self(Some(path.to_path_buf()))
    }
}

impl FolderPicker for Picker {
    fn pick_folder(&mut self) -> Option<PathBuf> {
        self.0.take()
    }
}

/// Replays scripted answers; `None` answers (or running out) cancel.
#[derive(Default)]
pub struct Prompter {
    answers: VecDeque<Option<String>>,
    pub rejections: Vec<Option<NameRejection>>,
}

impl Prompter {
    pub fn answering(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|answer| Some(answer.to_string())).collect(),
            rejections: Vec::new(),
        }
    }

    pub fn cancelling() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> usize {
        self.rejections.len()
    }
}

impl NamePrompter for Prompter {
    fn prompt_name(&mut self, rejection: Option<&NameRejection>) -> Option<String> {
        self.rejections.push(rejection.cloned());
        self.answers.pop_front().flatten()
    }
}

#[derive(Default)]
pub struct Downloads {
    pub offered: Vec<(String, String)>,
}

impl DownloadSink for Downloads {
    fn offer_download(&mut self, file_name: &str, text: &str) -> Result<(), DownloadError> {
        self.offered.push((file_name.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink(pub Rc<RefCell<Vec<GraphPayload>>>);

impl GraphSink for RecordingSink {
    fn publish(&mut self, payload: &GraphPayload) {
        self.0.borrow_mut().push(payload.clone());
    }
}

/// Filesystem store whose writes can be switched to fail.
pub struct FlakyStore {
    inner: FsDirectoryStore,
    pub fail_writes: Rc<Cell<bool>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: FsDirectoryStore::new(),
            fail_writes: Rc::new(Cell::new(false)),
        }
    }
}

impl DirectoryStore for FlakyStore {
    fn request_binding(&self, picker: &mut dyn FolderPicker) -> StoreResult<DirectoryBinding> {
        self.inner.request_binding(picker)
    }

    fn check_permission(&self, root: &Path) -> PermissionState {
        self.inner.check_permission(root)
    }

    fn list_text_entries<'a>(
        &'a self,
        binding: &'a DirectoryBinding,
    ) -> StoreResult<TextEntries<'a>> {
        self.inner.list_text_entries(binding)
    }

    fn read_text(&self, binding: &DirectoryBinding, file_ref: &FileRef) -> StoreResult<String> {
        self.inner.read_text(binding, file_ref)
    }

    fn create_or_open(
        &self,
        binding: &DirectoryBinding,
        name: &str,
        mode: OpenMode,
    ) -> StoreResult<FileRef> {
        self.inner.create_or_open(binding, name, mode)
    }

    fn write_text(
        &self,
        binding: &DirectoryBinding,
        file_ref: &FileRef,
        text: &str,
    ) -> StoreResult<()> {
        if self.fail_writes.get() {
            return Err(StoreError::Io {
                op: "write",
                name: file_ref.file_name().to_string(),
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.write_text(binding, file_ref, text)
    }

    fn remove(&self, binding: &DirectoryBinding, name: &str) -> StoreResult<()> {
        self.inner.remove(binding, name)
    }
}
