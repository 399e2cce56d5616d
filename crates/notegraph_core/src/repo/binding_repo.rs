//! Remembered directory grant repository.
//!
//! # Responsibility
//! - Keep at most one durable reference to the last granted directory.
//!
//! # Invariants
//! - The table holds zero or one row (`slot = 1`).
//! - A stored grant is only a hint; callers must re-check live permission
//!   before using it.

use crate::repo::{ensure_table, RepoError, RepoResult};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;

/// Durable form of a directory grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBinding {
    pub root_path: PathBuf,
    pub display_name: String,
    pub granted_at: DateTime<Utc>,
}

/// Repository interface for the remembered grant.
pub trait BindingRepository {
    fn save_binding(&self, binding: &StoredBinding) -> RepoResult<()>;
    fn load_binding(&self) -> RepoResult<Option<StoredBinding>>;
    fn clear_binding(&self) -> RepoResult<()>;
}

/// SQLite-backed remembered grant repository.
pub struct SqliteBindingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBindingRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table(conn, "directory_bindings")?;
        Ok(Self { conn })
    }
}

impl BindingRepository for SqliteBindingRepository<'_> {
    fn save_binding(&self, binding: &StoredBinding) -> RepoResult<()> {
        let root = binding.root_path.to_str().ok_or_else(|| {
            RepoError::InvalidData(format!(
                "directory path `{}` is not valid UTF-8",
                binding.root_path.display()
            ))
        })?;
        self.conn.execute(
            "INSERT INTO directory_bindings (slot, root_path, display_name, granted_at)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(slot) DO UPDATE SET
                root_path = excluded.root_path,
                display_name = excluded.display_name,
                granted_at = excluded.granted_at;",
            params![
                root,
                binding.display_name.as_str(),
                binding
                    .granted_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ],
        )?;
        Ok(())
    }

    fn load_binding(&self) -> RepoResult<Option<StoredBinding>> {
        let row = self
            .conn
            .query_row(
                "SELECT root_path, display_name, granted_at
                 FROM directory_bindings
                 WHERE slot = 1;",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>("root_path")?,
                        row.get::<_, String>("display_name")?,
                        row.get::<_, String>("granted_at")?,
                    ))
                },
            )
            .optional()?;

        let Some((root_path, display_name, granted_at)) = row else {
            return Ok(None);
        };
        let granted_at = DateTime::parse_from_rfc3339(&granted_at)
            .map_err(|_| {
                RepoError::InvalidData(format!(
                    "invalid granted_at `{granted_at}` in directory_bindings"
                ))
            })?
            .with_timezone(&Utc);

        Ok(Some(StoredBinding {
            root_path: PathBuf::from(root_path),
            display_name,
            granted_at,
        }))
    }

    fn clear_binding(&self) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM directory_bindings WHERE slot = 1;", [])?;
        Ok(())
    }
}
