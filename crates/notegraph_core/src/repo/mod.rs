//! Repository layer over the state database.
//!
//! # Responsibility
//! - Persist version history sequences and the remembered directory grant.
//! - Keep SQL details out of the workspace orchestration.
//!
//! # Invariants
//! - Repositories refuse connections that are missing their tables.
//! - Read paths reject malformed persisted rows instead of masking them.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod binding_repo;
pub mod version_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by the state repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Connection schema lacks a required table.
    MissingRequiredTable(&'static str),
    /// Persisted row cannot be decoded.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "state repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted state: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::MissingRequiredTable(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn ensure_table(conn: &rusqlite::Connection, table: &'static str) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::MissingRequiredTable(table))
    }
}
