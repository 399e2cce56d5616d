mod common;

use common::{Downloads, FlakyStore, Picker, Prompter};
use notegraph_core::db::{open_db, open_db_in_memory};
use notegraph_core::{
    BindingRepository, KeyOutcome, NoteWorkspace, SqliteBindingRepository,
    SqliteVersionRepository, StoreError, SuggestionKey, WorkspaceError,
};
use rusqlite::Connection;
use std::fs;

type Workspace<'conn> =
    NoteWorkspace<FlakyStore, SqliteVersionRepository<'conn>, SqliteBindingRepository<'conn>>;

fn workspace(conn: &Connection) -> Workspace<'_> {
    NoteWorkspace::new(
        FlakyStore::new(),
        SqliteVersionRepository::try_new(conn).unwrap(),
        SqliteBindingRepository::try_new(conn).unwrap(),
    )
}

fn save_as(ws: &mut Workspace<'_>, content: &str, name: &str) -> notegraph_core::NoteId {
    let id = ws.new_note(content);
    ws.save_note(id, &mut Prompter::answering(&[name]), &mut Downloads::default())
        .unwrap();
    id
}

#[test]
fn directory_load_hydrates_notes_and_their_history() {
    let notes_dir = tempfile::tempdir().unwrap();
    let state_dir = tempfile::tempdir().unwrap();
    let conn = open_db(state_dir.path().join("state.sqlite3")).unwrap();

    {
        let mut ws = workspace(&conn);
        ws.grant_directory(&mut Picker::at(notes_dir.path())).unwrap();
        let id = save_as(&mut ws, "first", "kept");
        ws.edit_content(id, "second").unwrap();
        ws.save_note(id, &mut Prompter::cancelling(), &mut Downloads::default())
            .unwrap();
    }
    fs::write(notes_dir.path().join("plain.txt"), "from disk").unwrap();

    let mut ws = workspace(&conn);
    let report = ws
        .grant_directory(&mut Picker::at(notes_dir.path()))
        .unwrap();
    assert_eq!(report.loaded, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(ws.known_identities(), vec!["kept", "plain"]);

    let kept = ws.find_by_identity("kept").unwrap().note_id();
    assert_eq!(ws.note(kept).unwrap().content, "second");
    assert_eq!(ws.history_labels(kept).unwrap().len(), 2);
    let plain = ws.find_by_identity("plain").unwrap().note_id();
    assert!(ws.history(plain).unwrap().is_empty());
}

#[test]
fn restore_reuses_remembered_directory() {
    let notes_dir = tempfile::tempdir().unwrap();
    fs::write(notes_dir.path().join("a.txt"), "A").unwrap();
    let state_dir = tempfile::tempdir().unwrap();
    let conn = open_db(state_dir.path().join("state.sqlite3")).unwrap();

    workspace(&conn)
        .grant_directory(&mut Picker::at(notes_dir.path()))
        .unwrap();

    let mut ws = workspace(&conn);
    let report = ws.restore_directory(&mut Picker(None)).unwrap().unwrap();
    assert_eq!(report.loaded, 1);
    assert_eq!(ws.binding().unwrap().root(), notes_dir.path());
}

#[test]
fn restore_without_remembered_directory_is_a_no_op() {
    let state_dir = tempfile::tempdir().unwrap();
    let conn = open_db(state_dir.path().join("state.sqlite3")).unwrap();
    let mut ws = workspace(&conn);
    assert!(ws.restore_directory(&mut Picker(None)).unwrap().is_none());
    assert!(ws.binding().is_none());
}

#[test]
fn stale_remembered_directory_prompts_again() {
    let gone = tempfile::tempdir().unwrap();
    let replacement = tempfile::tempdir().unwrap();
    fs::write(replacement.path().join("r.txt"), "R").unwrap();
    let state_dir = tempfile::tempdir().unwrap();
    let conn = open_db(state_dir.path().join("state.sqlite3")).unwrap();

    workspace(&conn)
        .grant_directory(&mut Picker::at(gone.path()))
        .unwrap();
    let gone_path = gone.path().to_path_buf();
    drop(gone);
    assert!(!gone_path.exists());

    let mut ws = workspace(&conn);
    assert!(matches!(
        ws.restore_directory(&mut Picker(None)),
        Err(WorkspaceError::Store(StoreError::UserCancelled))
    ));
    assert!(ws.binding().is_none());

    let report = ws
        .restore_directory(&mut Picker::at(replacement.path()))
        .unwrap()
        .unwrap();
    assert_eq!(report.loaded, 1);
    assert_eq!(ws.binding().unwrap().root(), replacement.path());
}

#[test]
fn clearing_binding_unloads_directory_notes_but_keeps_files() {
    let notes_dir = tempfile::tempdir().unwrap();
    fs::write(notes_dir.path().join("a.txt"), "A").unwrap();
    let state_dir = tempfile::tempdir().unwrap();
    let conn = open_db(state_dir.path().join("state.sqlite3")).unwrap();
    let mut ws = workspace(&conn);
    ws.grant_directory(&mut Picker::at(notes_dir.path())).unwrap();
    let draft = ws.new_note("unsaved");

    assert_eq!(ws.clear_binding().unwrap(), 1);
    assert!(ws.binding().is_none());
    assert_eq!(ws.notes().len(), 1);
    assert_eq!(ws.notes()[0].note_id(), draft);
    assert!(ws.graph().nodes.is_empty());
    assert!(notes_dir.path().join("a.txt").exists());

    let bindings = SqliteBindingRepository::try_new(&conn).unwrap();
    assert!(bindings.load_binding().unwrap().is_none());
}

#[test]
fn delete_removes_file_and_note() {
    let notes_dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_memory().unwrap();
    let mut ws = workspace(&conn);
    ws.grant_directory(&mut Picker::at(notes_dir.path())).unwrap();
    let target = save_as(&mut ws, "bye", "target");
    let other = save_as(&mut ws, "[@target]", "other");
    assert_eq!(ws.graph().edges.len(), 1);

    ws.delete_note(target).unwrap();
    assert!(!notes_dir.path().join("target.txt").exists());
    assert!(matches!(ws.note(target), Err(WorkspaceError::NoteNotFound(_))));
    assert!(ws.graph().edges.is_empty());
    assert_eq!(ws.counts()["other"].send, 0);
    assert!(ws.note(other).is_ok());
}

#[test]
fn rename_moves_file_and_history_and_leaves_old_mentions_stale() {
    let notes_dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_memory().unwrap();
    let mut ws = workspace(&conn);
    ws.grant_directory(&mut Picker::at(notes_dir.path())).unwrap();
    let old = save_as(&mut ws, "body", "old");
    save_as(&mut ws, "see [@old]", "linker");
    assert_eq!(ws.graph().edges.len(), 1);

    let renamed = ws
        .rename_note(old, &mut Prompter::answering(&["new"]))
        .unwrap();
    assert_eq!(renamed.as_deref(), Some("new"));
    assert!(!notes_dir.path().join("old.txt").exists());
    assert_eq!(
        fs::read_to_string(notes_dir.path().join("new.txt")).unwrap(),
        "body"
    );
    assert_eq!(ws.history(old).unwrap().len(), 1);
    assert!(ws.graph().edges.is_empty());

    let cancelled = ws.rename_note(old, &mut Prompter::cancelling()).unwrap();
    assert!(cancelled.is_none());
    assert!(notes_dir.path().join("new.txt").exists());
}

#[test]
fn rename_requires_saved_note() {
    let conn = open_db_in_memory().unwrap();
    let mut ws = workspace(&conn);
    let draft = ws.new_note("x");
    assert!(matches!(
        ws.rename_note(draft, &mut Prompter::answering(&["y"])),
        Err(WorkspaceError::NotDirectoryBacked(_))
    ));
}

#[test]
fn replay_restores_past_version_into_live_text() {
    let notes_dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_memory().unwrap();
    let mut ws = workspace(&conn);
    ws.grant_directory(&mut Picker::at(notes_dir.path())).unwrap();
    save_as(&mut ws, "", "alpha");
    let id = save_as(&mut ws, "v1 [@alpha]", "hub");
    ws.edit_content(id, "v2").unwrap();
    ws.save_note(id, &mut Prompter::cancelling(), &mut Downloads::default())
        .unwrap();
    assert!(ws.graph().edges.is_empty());

    assert_eq!(ws.replay_version(id, 0).unwrap(), "v1 [@alpha]");
    assert_eq!(ws.note(id).unwrap().content, "v1 [@alpha]");
    assert_eq!(ws.graph().edges.len(), 1);
    assert!(matches!(
        ws.replay_version(id, 5),
        Err(WorkspaceError::VersionNotFound { index: 5, .. })
    ));
}

#[test]
fn editor_suggestions_complete_mentions_and_refresh_graph() {
    let notes_dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_memory().unwrap();
    let mut ws = workspace(&conn);
    ws.grant_directory(&mut Picker::at(notes_dir.path())).unwrap();
    save_as(&mut ws, "", "alpha");
    save_as(&mut ws, "", "apple");
    save_as(&mut ws, "", "beta");
    let meeting = save_as(&mut ws, "", "meeting");

    let text = "agenda [@ap";
    let candidates = ws.on_editor_changed(meeting, text.len(), text).unwrap();
    assert_eq!(candidates, vec!["alpha", "apple"]);

    assert_eq!(
        ws.suggestion_key(meeting, SuggestionKey::Down).unwrap(),
        KeyOutcome::Selected(0)
    );
    let outcome = ws.suggestion_key(meeting, SuggestionKey::Enter).unwrap();
    assert!(matches!(outcome, KeyOutcome::Applied { ref text, .. } if text == "agenda [@alpha]"));
    assert_eq!(ws.note(meeting).unwrap().content, "agenda [@alpha]");
    assert!(ws.suggestion().is_none());

    let edges = &ws.graph().edges;
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source, "meeting");
    assert_eq!(edges[0].target, "alpha");
}

#[test]
fn escape_closes_suggestions_without_editing() {
    let notes_dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_memory().unwrap();
    let mut ws = workspace(&conn);
    ws.grant_directory(&mut Picker::at(notes_dir.path())).unwrap();
    save_as(&mut ws, "", "alpha");
    let id = ws.new_note("");

    let text = "[@al";
    assert_eq!(ws.on_editor_changed(id, 4, text).unwrap(), vec!["alpha"]);
    assert_eq!(
        ws.suggestion_key(id, SuggestionKey::Escape).unwrap(),
        KeyOutcome::Closed
    );
    assert_eq!(ws.note(id).unwrap().content, "[@al");
    assert!(ws.suggestion().is_none());
}

#[test]
fn replay_and_edit_close_open_suggestions() {
    let notes_dir = tempfile::tempdir().unwrap();
    let conn = open_db_in_memory().unwrap();
    let mut ws = workspace(&conn);
    ws.grant_directory(&mut Picker::at(notes_dir.path())).unwrap();
    save_as(&mut ws, "", "alpha");
    let me = save_as(&mut ws, "[@zz] old text", "me");

    assert_eq!(ws.on_editor_changed(me, 4, "[@al").unwrap(), vec!["alpha"]);
    assert_eq!(ws.replay_version(me, 0).unwrap(), "[@zz] old text");
    assert!(ws.suggestion().is_none());
    assert_eq!(
        ws.suggestion_key(me, SuggestionKey::Down).unwrap(),
        KeyOutcome::Closed
    );
    assert_eq!(
        ws.suggestion_key(me, SuggestionKey::Enter).unwrap(),
        KeyOutcome::Closed
    );
    assert_eq!(ws.note(me).unwrap().content, "[@zz] old text");

    assert_eq!(ws.on_editor_changed(me, 4, "[@al").unwrap(), vec!["alpha"]);
    ws.edit_content(me, "rewritten [@zz]").unwrap();
    assert!(ws.suggestion().is_none());
    assert_eq!(
        ws.suggestion_key(me, SuggestionKey::Enter).unwrap(),
        KeyOutcome::Closed
    );
    assert_eq!(ws.note(me).unwrap().content, "rewritten [@zz]");
}
