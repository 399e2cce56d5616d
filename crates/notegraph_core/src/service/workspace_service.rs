//! Note workspace orchestration.
//!
//! # Responsibility
//! - Own the live note set, the active directory binding and the version log.
//! - Run the save flow: snapshot, identity, write or download fallback, graph.
//! - Drive directory load, rename, delete, replay and suggestion sessions.
//!
//! # Invariants
//! - A save appends to the version log and persists it before any content
//!   write is attempted; a failed write never drops the appended entry.
//! - A note gains its identity only after its file was written successfully.
//! - History moves from the session key to the file key on first save and is
//!   persisted under the new key before the old key is deleted.
//! - Clearing or replacing the binding unloads every directory-backed note.
//! - The graph is rebuilt from scratch after every content or membership
//!   change, and each rebuild is published to every registered sink.

use crate::history::VersionLog;
use crate::identity::{self, NamePrompter};
use crate::mention::graph::{
    build_graph, compute_counts, Graph, GraphPayload, GraphSink, LinkCounts,
};
use crate::model::note::{NoteId, NoteRecord};
use crate::model::version::{HistoryKey, VersionEntry};
use crate::repo::binding_repo::{BindingRepository, StoredBinding};
use crate::repo::version_repo::VersionRepository;
use crate::repo::RepoError;
use crate::service::download::{fallback_file_name, DownloadError, DownloadSink};
use crate::store::{
    DirectoryBinding, DirectoryStore, FileRef, FolderPicker, OpenMode, PermissionState,
    StoreError, StoreResult,
};
use crate::suggest::{KeyOutcome, SuggestionKey, SuggestionSession};
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Workspace operation error.
#[derive(Debug)]
pub enum WorkspaceError {
    Store(StoreError),
    Repo(RepoError),
    Download(DownloadError),
    NoteNotFound(NoteId),
    /// Operation needs a bound directory and none is active.
    NoBinding,
    /// Operation needs a note that is backed by a file.
    NotDirectoryBacked(NoteId),
    VersionNotFound { note_id: NoteId, index: usize },
}

impl Display for WorkspaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Download(err) => write!(f, "{err}"),
            Self::NoteNotFound(note_id) => write!(f, "note not found: {note_id}"),
            Self::NoBinding => write!(f, "no directory is bound"),
            Self::NotDirectoryBacked(note_id) => {
                write!(f, "note {note_id} is not saved to the bound directory")
            }
            Self::VersionNotFound { note_id, index } => {
                write!(f, "version #{} not found for note {note_id}", index + 1)
            }
        }
    }
}

impl Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Download(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for WorkspaceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RepoError> for WorkspaceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DownloadError> for WorkspaceError {
    fn from(value: DownloadError) -> Self {
        Self::Download(value)
    }
}

/// Summary of one directory load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Entries that could not be listed or read.
    pub skipped: usize,
}

/// How a save request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Content written to the bound directory.
    Saved {
        file_name: String,
        history_persisted: bool,
    },
    /// No directory bound; content handed to the download fallback.
    Downloaded {
        file_name: String,
        history_persisted: bool,
    },
    /// Directory write failed; content handed to the download fallback.
    FellBack {
        file_name: String,
        reason: String,
        history_persisted: bool,
    },
    /// Name entry was cancelled. The snapshot stays in the version log.
    Cancelled { history_persisted: bool },
}

impl SaveOutcome {
    /// Whether the version log reached durable storage during this save.
    pub fn history_persisted(&self) -> bool {
        match self {
            Self::Saved {
                history_persisted, ..
            }
            | Self::Downloaded {
                history_persisted, ..
            }
            | Self::FellBack {
                history_persisted, ..
            }
            | Self::Cancelled { history_persisted } => *history_persisted,
        }
    }
}

/// Live note workspace over a directory store and the state repositories.
pub struct NoteWorkspace<S, V, B> {
    store: S,
    versions: V,
    bindings: B,
    binding: Option<DirectoryBinding>,
    notes: Vec<NoteRecord>,
    log: VersionLog,
    graph: Graph,
    suggestion: Option<(NoteId, SuggestionSession)>,
    sinks: Vec<Box<dyn GraphSink>>,
}

impl<S, V, B> NoteWorkspace<S, V, B>
where
    S: DirectoryStore,
    V: VersionRepository,
    B: BindingRepository,
{
    pub fn new(store: S, versions: V, bindings: B) -> Self {
        Self {
            store,
            versions,
            bindings,
            binding: None,
            notes: Vec::new(),
            log: VersionLog::new(),
            graph: Graph::default(),
            suggestion: None,
            sinks: Vec::new(),
        }
    }

    /// Registers a visualization sink. It receives every later rebuild.
    pub fn add_graph_sink(&mut self, sink: Box<dyn GraphSink>) {
        self.sinks.push(sink);
    }

    pub fn binding(&self) -> Option<&DirectoryBinding> {
        self.binding.as_ref()
    }

    /// Live notes in load/creation order.
    pub fn notes(&self) -> &[NoteRecord] {
        &self.notes
    }

    pub fn note(&self, note_id: NoteId) -> WorkspaceResult<&NoteRecord> {
        self.index_of(note_id).map(|index| &self.notes[index])
    }

    /// Finds a loaded note by identity.
    pub fn find_by_identity(&self, identity: &str) -> Option<&NoteRecord> {
        self.notes
            .iter()
            .find(|note| note.identity() == Some(identity))
    }

    // ---- binding lifecycle ----

    /// Asks the user for a directory, remembers it and loads its notes.
    pub fn grant_directory(&mut self, picker: &mut dyn FolderPicker) -> WorkspaceResult<LoadReport> {
        info!("event=directory_grant module=workspace status=start");
        let binding = self.store.request_binding(picker).map_err(|err| {
            warn!("event=directory_grant module=workspace status=error error={err}");
            err
        })?;
        self.remember_binding(&binding);
        self.activate_binding(binding)
    }

    /// Restores the remembered directory.
    ///
    /// Returns `Ok(None)` when nothing is remembered. A remembered directory
    /// without live read-write access is never used as-is: the user is asked
    /// to grant a directory again.
    pub fn restore_directory(
        &mut self,
        picker: &mut dyn FolderPicker,
    ) -> WorkspaceResult<Option<LoadReport>> {
        let Some(stored) = self.bindings.load_binding()? else {
            debug!("event=directory_restore module=workspace status=skipped reason=none_stored");
            return Ok(None);
        };

        match self.store.check_permission(&stored.root_path) {
            PermissionState::ReadWrite => {
                info!(
                    "event=directory_restore module=workspace status=ok display_name={}",
                    stored.display_name
                );
                self.activate_binding(DirectoryBinding::new(stored.root_path))
                    .map(Some)
            }
            state => {
                warn!(
                    "event=directory_restore module=workspace status=stale display_name={} state={state:?}",
                    stored.display_name
                );
                self.grant_directory(picker).map(Some)
            }
        }
    }

    /// Drops the binding and unloads directory-backed notes. Files are kept.
    /// Returns how many notes were unloaded.
    pub fn clear_binding(&mut self) -> WorkspaceResult<usize> {
        self.binding = None;
        let unloaded = self.unload_directory_notes();
        self.recompute_graph();
        self.bindings.clear_binding()?;
        info!("event=directory_clear module=workspace status=ok unloaded={unloaded}");
        Ok(unloaded)
    }

    fn remember_binding(&self, binding: &DirectoryBinding) {
        let stored = StoredBinding {
            root_path: binding.root().to_path_buf(),
            display_name: binding.display_name().to_string(),
            granted_at: Utc::now(),
        };
        if let Err(err) = self.bindings.save_binding(&stored) {
            warn!("event=directory_remember module=workspace status=error error={err}");
        }
    }

    fn activate_binding(&mut self, binding: DirectoryBinding) -> WorkspaceResult<LoadReport> {
        self.unload_directory_notes();
        self.binding = Some(binding);
        let report = self.load_directory();
        self.recompute_graph();
        report
    }

    fn unload_directory_notes(&mut self) -> usize {
        let before = self.notes.len();
        self.notes.retain(|note| !note.is_directory_backed());
        if let Some((owner, _)) = &self.suggestion {
            if !self.notes.iter().any(|note| note.note_id() == *owner) {
                self.suggestion = None;
            }
        }
        before - self.notes.len()
    }

    /// Hydrates every note file of the bound directory, with its history.
    /// Unreadable entries are skipped and counted.
    fn load_directory(&mut self) -> WorkspaceResult<LoadReport> {
        let binding = self.binding.as_ref().ok_or(WorkspaceError::NoBinding)?;
        let mut report = LoadReport::default();
        let mut loaded = Vec::new();

        for entry in self.store.list_text_entries(binding)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    report.skipped += 1;
                    warn!("event=directory_load module=workspace status=skipped error={err}");
                    continue;
                }
            };
            match self.store.read_text(binding, &entry.file_ref) {
                Ok(text) => loaded.push(NoteRecord::hydrated(entry.file_ref, text)),
                Err(err) => {
                    report.skipped += 1;
                    warn!(
                        "event=directory_load module=workspace status=skipped name={} error={err}",
                        entry.name
                    );
                }
            }
        }

        loaded.sort_by(|left, right| left.file_name().cmp(&right.file_name()));
        for note in &loaded {
            let key = note.history_key().clone();
            self.hydrate_history(&key);
        }
        report.loaded = loaded.len();
        self.notes.extend(loaded);

        info!(
            "event=directory_load module=workspace status=ok loaded={} skipped={}",
            report.loaded, report.skipped
        );
        Ok(report)
    }

    // ---- note lifecycle ----

    /// Creates an unsaved note and returns its handle.
    pub fn new_note(&mut self, content: impl Into<String>) -> NoteId {
        let note = NoteRecord::new(content);
        let note_id = note.note_id();
        self.notes.push(note);
        self.recompute_graph();
        note_id
    }

    /// Replaces the live text of a note without saving it.
    pub fn edit_content(&mut self, note_id: NoteId, text: impl Into<String>) -> WorkspaceResult<()> {
        let index = self.index_of(note_id)?;
        self.notes[index].content = text.into();
        self.close_suggestion_for(note_id);
        self.recompute_graph();
        Ok(())
    }

    /// Removes a note from the workspace. Its file and history are kept.
    pub fn close_note(&mut self, note_id: NoteId) -> WorkspaceResult<()> {
        let index = self.index_of(note_id)?;
        self.drop_note(index);
        Ok(())
    }

    /// Removes a note and its backing file. History is kept.
    pub fn delete_note(&mut self, note_id: NoteId) -> WorkspaceResult<()> {
        let index = self.index_of(note_id)?;
        if let Some(file_ref) = self.notes[index].backing_ref() {
            let binding = self.binding.as_ref().ok_or(WorkspaceError::NoBinding)?;
            binding.ensure_owns(file_ref)?;
            self.store.remove(binding, file_ref.file_name())?;
            info!("event=note_delete module=workspace status=ok");
        }
        self.drop_note(index);
        Ok(())
    }

    fn drop_note(&mut self, index: usize) {
        let note = self.notes.remove(index);
        self.close_suggestion_for(note.note_id());
        self.recompute_graph();
    }

    // ---- save flow ----

    /// Saves the live text of a note.
    ///
    /// The snapshot is appended and persisted first. Without a bound
    /// directory the user names the file and the text goes to `download`.
    /// With one, a first save resolves a unique name against the directory
    /// listing; a failed write hands the text to `download` instead.
    pub fn save_note(
        &mut self,
        note_id: NoteId,
        prompter: &mut dyn NamePrompter,
        download: &mut dyn DownloadSink,
    ) -> WorkspaceResult<SaveOutcome> {
        let index = self.index_of(note_id)?;
        let text = self.notes[index].content.clone();
        let key = self.notes[index].history_key().clone();

        self.log.append(&key, text.as_str());
        let history_persisted = self.persist_history(&key);
        debug!(
            "event=note_save module=workspace status=start versions={} history_persisted={history_persisted}",
            self.log.list(&key).len()
        );

        let outcome = match self.binding.clone() {
            None => self.download_only(&text, prompter, download, history_persisted),
            Some(binding) => self.save_to_directory(
                index,
                &binding,
                &text,
                prompter,
                download,
                history_persisted,
            ),
        };
        self.recompute_graph();

        match &outcome {
            Ok(SaveOutcome::Saved { file_name, .. }) => {
                info!("event=note_save module=workspace status=ok file_name={file_name}");
            }
            Ok(SaveOutcome::Downloaded { file_name, .. }) => {
                info!("event=note_save module=workspace status=downloaded file_name={file_name}");
            }
            Ok(SaveOutcome::FellBack { file_name, .. }) => {
                warn!("event=note_save module=workspace status=fallback file_name={file_name}");
            }
            Ok(SaveOutcome::Cancelled { .. }) => {
                info!("event=note_save module=workspace status=cancelled");
            }
            Err(err) => warn!("event=note_save module=workspace status=error error={err}"),
        }
        outcome
    }

    fn download_only(
        &self,
        text: &str,
        prompter: &mut dyn NamePrompter,
        download: &mut dyn DownloadSink,
        history_persisted: bool,
    ) -> WorkspaceResult<SaveOutcome> {
        let Ok(file_name) = identity::resolve(None, &HashSet::new(), prompter) else {
            return Ok(SaveOutcome::Cancelled { history_persisted });
        };
        download.offer_download(&file_name, text)?;
        Ok(SaveOutcome::Downloaded {
            file_name,
            history_persisted,
        })
    }

    fn save_to_directory(
        &mut self,
        index: usize,
        binding: &DirectoryBinding,
        text: &str,
        prompter: &mut dyn NamePrompter,
        download: &mut dyn DownloadSink,
        history_persisted: bool,
    ) -> WorkspaceResult<SaveOutcome> {
        if let Some(file_ref) = self.notes[index].backing_ref().cloned() {
            return match self.store.write_text(binding, &file_ref, text) {
                Ok(()) => Ok(SaveOutcome::Saved {
                    file_name: file_ref.file_name().to_string(),
                    history_persisted,
                }),
                Err(err) => self.fall_back(index, text, &err, download, history_persisted),
            };
        }

        let existing = match self.existing_names(binding) {
            Ok(names) => names,
            Err(err) => return self.fall_back(index, text, &err, download, history_persisted),
        };
        let Ok(file_name) = identity::resolve(None, &existing, prompter) else {
            return Ok(SaveOutcome::Cancelled { history_persisted });
        };

        match self.create_and_write(binding, &file_name, text) {
            Ok(file_ref) => {
                let history_persisted = self.assign_identity(index, file_ref);
                Ok(SaveOutcome::Saved {
                    file_name,
                    history_persisted,
                })
            }
            Err(err) => self.fall_back(index, text, &err, download, history_persisted),
        }
    }

    fn fall_back(
        &self,
        index: usize,
        text: &str,
        error: &StoreError,
        download: &mut dyn DownloadSink,
        history_persisted: bool,
    ) -> WorkspaceResult<SaveOutcome> {
        let file_name = self.notes[index]
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(fallback_file_name);
        warn!("event=note_write module=workspace status=error error={error}");
        download.offer_download(&file_name, text)?;
        Ok(SaveOutcome::FellBack {
            file_name,
            reason: error.to_string(),
            history_persisted,
        })
    }

    /// Creates `file_name` and writes `text` into it. A file created here is
    /// removed again when the write fails.
    fn create_and_write(
        &self,
        binding: &DirectoryBinding,
        file_name: &str,
        text: &str,
    ) -> StoreResult<FileRef> {
        let file_ref = self
            .store
            .create_or_open(binding, file_name, OpenMode::CreateNew)?;
        if let Err(err) = self.store.write_text(binding, &file_ref, text) {
            if let Err(cleanup) = self.store.remove(binding, file_name) {
                warn!("event=file_cleanup module=workspace status=error error={cleanup}");
            }
            return Err(err);
        }
        Ok(file_ref)
    }

    fn existing_names(&self, binding: &DirectoryBinding) -> StoreResult<HashSet<String>> {
        self.store
            .list_text_entries(binding)?
            .map(|entry| entry.map(|entry| entry.name))
            .collect()
    }

    /// Binds the note to `file_ref` and migrates its history to the file key.
    /// Returns whether the migrated history was persisted.
    fn assign_identity(&mut self, index: usize, file_ref: FileRef) -> bool {
        let target = HistoryKey::for_file(file_ref.file_name());
        self.hydrate_history(&target);
        let previous = self.notes[index].bind_file(file_ref);
        let moved = self.log.rekey(&previous, &target);

        let persisted = self.persist_history(&target);
        if persisted && previous != target {
            if let Err(err) = self.versions.delete_history(&previous) {
                warn!("event=history_rekey module=workspace status=error error={err}");
            }
        }
        debug!("event=history_rekey module=workspace status=ok moved={moved} persisted={persisted}");
        persisted
    }

    fn hydrate_history(&mut self, key: &HistoryKey) {
        if self.log.contains_key(key) {
            return;
        }
        match self.versions.load_history(key) {
            Ok(entries) => self.log.hydrate(key, entries),
            Err(err) => warn!("event=history_load module=workspace status=error error={err}"),
        }
    }

    fn persist_history(&self, key: &HistoryKey) -> bool {
        match self.versions.replace_history(key, self.log.list(key)) {
            Ok(()) => true,
            Err(err) => {
                warn!("event=history_persist module=workspace status=error error={err}");
                false
            }
        }
    }

    // ---- rename ----

    /// Renames a saved note through the name prompt.
    ///
    /// The live text is written under the new name, the old file is removed
    /// and history follows the note. Mentions of the old name are left as
    /// they are. Returns the new identity, or `None` when cancelled.
    pub fn rename_note(
        &mut self,
        note_id: NoteId,
        prompter: &mut dyn NamePrompter,
    ) -> WorkspaceResult<Option<String>> {
        let index = self.index_of(note_id)?;
        let old_ref = self.notes[index]
            .backing_ref()
            .cloned()
            .ok_or(WorkspaceError::NotDirectoryBacked(note_id))?;
        let binding = self.binding.clone().ok_or(WorkspaceError::NoBinding)?;
        binding.ensure_owns(&old_ref)?;

        let existing = self.existing_names(&binding)?;
        let Ok(file_name) = identity::resolve(None, &existing, prompter) else {
            info!("event=note_rename module=workspace status=cancelled");
            return Ok(None);
        };

        let text = self.notes[index].content.clone();
        let new_ref = self.create_and_write(&binding, &file_name, &text)?;
        if let Err(err) = self.store.remove(&binding, old_ref.file_name()) {
            warn!("event=note_rename module=workspace status=error error_code=old_file_kept error={err}");
        }
        self.assign_identity(index, new_ref);
        self.recompute_graph();

        info!("event=note_rename module=workspace status=ok file_name={file_name}");
        Ok(self.notes[index].identity().map(str::to_string))
    }

    // ---- history ----

    /// Saved versions of a note, oldest first.
    pub fn history(&self, note_id: NoteId) -> WorkspaceResult<&[VersionEntry]> {
        let note = self.note(note_id)?;
        Ok(self.log.list(note.history_key()))
    }

    pub fn history_labels(&self, note_id: NoteId) -> WorkspaceResult<Vec<String>> {
        let note = self.note(note_id)?;
        Ok(self.log.labels(note.history_key()))
    }

    /// Loads version `index` (0-based) into the live text and returns it.
    pub fn replay_version(&mut self, note_id: NoteId, index: usize) -> WorkspaceResult<String> {
        let position = self.index_of(note_id)?;
        let text = self
            .log
            .get(self.notes[position].history_key(), index)
            .map(|entry| entry.text.clone())
            .ok_or(WorkspaceError::VersionNotFound { note_id, index })?;
        self.notes[position].content = text.clone();
        self.close_suggestion_for(note_id);
        self.recompute_graph();
        debug!("event=version_replay module=workspace status=ok index={index}");
        Ok(text)
    }

    // ---- graph ----

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn counts(&self) -> BTreeMap<String, LinkCounts> {
        compute_counts(&self.graph)
    }

    pub fn graph_payload(&self) -> GraphPayload {
        GraphPayload::from_graph(&self.notes, &self.graph)
    }

    /// Identities of loaded notes, in note order.
    pub fn known_identities(&self) -> Vec<String> {
        self.notes
            .iter()
            .filter_map(|note| note.identity().map(str::to_string))
            .collect()
    }

    fn recompute_graph(&mut self) {
        self.graph = build_graph(&self.notes);
        debug!(
            "event=graph_recompute module=workspace status=ok nodes={} edges={}",
            self.graph.nodes.len(),
            self.graph.edges.len()
        );
        if self.sinks.is_empty() {
            return;
        }
        let payload = GraphPayload::from_graph(&self.notes, &self.graph);
        for sink in &mut self.sinks {
            sink.publish(&payload);
        }
    }

    // ---- suggestions ----

    /// Takes the editor's text and cursor for a note and refreshes the
    /// suggestion session. Returns the current candidates, empty when the
    /// popup is closed.
    pub fn on_editor_changed(
        &mut self,
        note_id: NoteId,
        cursor: usize,
        text: &str,
    ) -> WorkspaceResult<Vec<String>> {
        let index = self.index_of(note_id)?;
        self.notes[index].content = text.to_string();

        let own = self.notes[index].identity();
        let known: Vec<&str> = self
            .notes
            .iter()
            .filter_map(NoteRecord::identity)
            .filter(|identity| Some(*identity) != own)
            .collect();
        self.suggestion =
            SuggestionSession::open(text, cursor, &known).map(|session| (note_id, session));
        self.recompute_graph();

        Ok(self
            .suggestion
            .as_ref()
            .map(|(_, session)| session.candidates().to_vec())
            .unwrap_or_default())
    }

    /// Active suggestion session, if any.
    pub fn suggestion(&self) -> Option<&SuggestionSession> {
        self.suggestion.as_ref().map(|(_, session)| session)
    }

    /// Routes one key to the note's suggestion session.
    pub fn suggestion_key(
        &mut self,
        note_id: NoteId,
        key: SuggestionKey,
    ) -> WorkspaceResult<KeyOutcome> {
        let index = self.index_of(note_id)?;
        let outcome = match self.suggestion.as_mut() {
            Some((owner, session)) if *owner == note_id => {
                session.handle_key(key, &self.notes[index].content)
            }
            _ => return Ok(KeyOutcome::Closed),
        };

        match &outcome {
            KeyOutcome::Selected(_) => {}
            KeyOutcome::Applied { text, .. } => {
                self.notes[index].content = text.clone();
                self.suggestion = None;
                self.recompute_graph();
            }
            KeyOutcome::Closed => self.suggestion = None,
        }
        Ok(outcome)
    }

    /// Text changed outside the editor; the open token offsets no longer hold.
    fn close_suggestion_for(&mut self, note_id: NoteId) {
        if matches!(&self.suggestion, Some((owner, _)) if *owner == note_id) {
            self.suggestion = None;
            debug!("event=suggest_close module=workspace status=ok reason=text_replaced");
        }
    }

    fn index_of(&self, note_id: NoteId) -> WorkspaceResult<usize> {
        self.notes
            .iter()
            .position(|note| note.note_id() == note_id)
            .ok_or(WorkspaceError::NoteNotFound(note_id))
    }
}
