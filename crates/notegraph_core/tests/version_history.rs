use chrono::{TimeZone, Utc};
use notegraph_core::db::open_db_in_memory;
use notegraph_core::repo::binding_repo::{BindingRepository, SqliteBindingRepository, StoredBinding};
use notegraph_core::repo::version_repo::{SqliteVersionRepository, VersionRepository};
use notegraph_core::{HistoryKey, RepoError, VersionEntry, VersionLog};
use rusqlite::Connection;
use std::path::PathBuf;
use uuid::Uuid;

#[test]
fn append_list_and_get_follow_save_order() {
    let mut log = VersionLog::new();
    let key = HistoryKey::for_file("k.txt");
    log.append(&key, "v1");
    log.append(&key, "v2");

    assert_eq!(log.list(&key).len(), 2);
    assert_eq!(log.get(&key, 0).unwrap().text, "v1");
    assert_eq!(log.get(&key, 1).unwrap().text, "v2");
    let labels = log.labels(&key);
    assert!(labels[0].starts_with("#1 - "));
    assert!(labels[1].starts_with("#2 - "));
}

#[test]
fn rekey_to_file_identity_preserves_entries() {
    let mut log = VersionLog::new();
    let session = HistoryKey::session(Uuid::new_v4());
    log.append(&session, "draft");
    log.append(&session, "final");

    let target = HistoryKey::for_file("note1.txt");
    assert_eq!(log.rekey(&session, &target), 2);
    assert!(log.list(&session).is_empty());
    assert_eq!(log.list(&target).len(), 2);
    assert_eq!(log.get(&target, 1).unwrap().text, "final");
}

#[test]
fn repository_round_trips_sequences_in_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVersionRepository::try_new(&conn).unwrap();
    let key = HistoryKey::for_file("a.txt");
    let entries = vec![
        VersionEntry::at("one", Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()),
        VersionEntry::at("two", Utc.timestamp_millis_opt(1_700_000_001_500).unwrap()),
    ];

    repo.replace_history(&key, &entries).unwrap();
    assert_eq!(repo.load_history(&key).unwrap(), entries);

    let shorter = vec![entries[1].clone()];
    repo.replace_history(&key, &shorter).unwrap();
    assert_eq!(repo.load_history(&key).unwrap(), shorter);
}

#[test]
fn delete_only_touches_its_own_key() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVersionRepository::try_new(&conn).unwrap();
    let file = HistoryKey::for_file("b.txt");
    let session = HistoryKey::session(Uuid::new_v4());
    repo.replace_history(&file, &[VersionEntry::new("x")]).unwrap();
    repo.replace_history(&session, &[VersionEntry::new("y")]).unwrap();

    repo.delete_history(&session).unwrap();
    assert!(repo.load_history(&session).unwrap().is_empty());
    assert_eq!(repo.load_history(&file).unwrap().len(), 1);
}

#[test]
fn unknown_key_loads_empty() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteVersionRepository::try_new(&conn).unwrap();
    assert!(repo
        .load_history(&HistoryKey::for_file("nothing.txt"))
        .unwrap()
        .is_empty());
}

#[test]
fn malformed_timestamp_is_reported_not_masked() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO version_entries (history_key, seq, text, saved_at)
         VALUES ('c.txt', 0, 'v', 'not a date');",
        [],
    )
    .unwrap();
    let repo = SqliteVersionRepository::try_new(&conn).unwrap();
    assert!(matches!(
        repo.load_history(&HistoryKey::for_file("c.txt")),
        Err(RepoError::InvalidData(_))
    ));
}

#[test]
fn repositories_refuse_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();
    assert!(matches!(
        SqliteVersionRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("version_entries"))
    ));
    assert!(matches!(
        SqliteBindingRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("directory_bindings"))
    ));
}

#[test]
fn binding_repository_keeps_one_grant() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBindingRepository::try_new(&conn).unwrap();
    assert!(repo.load_binding().unwrap().is_none());

    let first = StoredBinding {
        root_path: PathBuf::from("/home/user/notes"),
        display_name: "notes".to_string(),
        granted_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
    };
    let second = StoredBinding {
        root_path: PathBuf::from("/home/user/other"),
        display_name: "other".to_string(),
        granted_at: Utc.timestamp_millis_opt(1_700_000_100_000).unwrap(),
    };
    repo.save_binding(&first).unwrap();
    repo.save_binding(&second).unwrap();
    assert_eq!(repo.load_binding().unwrap(), Some(second));

    repo.clear_binding().unwrap();
    assert!(repo.load_binding().unwrap().is_none());
}
