//! Version history repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load and store whole history sequences keyed by `HistoryKey`.
//!
//! # Invariants
//! - `replace_history` rewrites one key's sequence in a single transaction;
//!   readers never observe a half-written sequence.
//! - Rows are returned in `seq ASC` order, oldest first.
//! - `saved_at` is stored as RFC 3339 text.

use crate::model::version::{HistoryKey, VersionEntry};
use crate::repo::{ensure_table, RepoError, RepoResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};

/// Repository interface for per-note version history.
pub trait VersionRepository {
    /// Loads the full sequence stored under `key`, oldest first.
    fn load_history(&self, key: &HistoryKey) -> RepoResult<Vec<VersionEntry>>;
    /// Replaces the full sequence stored under `key`.
    fn replace_history(&self, key: &HistoryKey, entries: &[VersionEntry]) -> RepoResult<()>;
    /// Removes every entry stored under `key`.
    fn delete_history(&self, key: &HistoryKey) -> RepoResult<()>;
}

/// SQLite-backed version history repository.
pub struct SqliteVersionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVersionRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, "version_entries")?;
        Ok(Self { conn })
    }
}

impl VersionRepository for SqliteVersionRepository<'_> {
    fn load_history(&self, key: &HistoryKey) -> RepoResult<Vec<VersionEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT text, saved_at
             FROM version_entries
             WHERE history_key = ?1
             ORDER BY seq ASC;",
        )?;
        let mut rows = stmt.query([key.as_str()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let saved_at: String = row.get("saved_at")?;
            entries.push(VersionEntry {
                text: row.get("text")?,
                saved_at: parse_saved_at(&saved_at)?,
            });
        }
        Ok(entries)
    }

    fn replace_history(&self, key: &HistoryKey, entries: &[VersionEntry]) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM version_entries WHERE history_key = ?1;",
            [key.as_str()],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO version_entries (history_key, seq, text, saved_at)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for (seq, entry) in entries.iter().enumerate() {
                let seq = i64::try_from(seq).map_err(|_| {
                    RepoError::InvalidData(format!("history `{key}` is too long to persist"))
                })?;
                insert.execute(params![
                    key.as_str(),
                    seq,
                    entry.text.as_str(),
                    format_saved_at(&entry.saved_at),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_history(&self, key: &HistoryKey) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM version_entries WHERE history_key = ?1;",
            [key.as_str()],
        )?;
        Ok(())
    }
}

fn format_saved_at(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_saved_at(value: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| {
            RepoError::InvalidData(format!("invalid saved_at `{value}` in version_entries"))
        })
}
