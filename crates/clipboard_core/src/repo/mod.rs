//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate drafts before any SQL mutation.
//! - Single-entity lookups never truncate a multi-row result; they fail with
//!   `RepoError::InconsistentResult` instead.
//! - Missing rows on reads are `Ok(None)`; `NotFound` is reserved for writes.

use crate::db::DbError;
use crate::model::clipboard::ClipboardId;
use crate::model::user::UserId;
use crate::model::workspace::WorkspaceId;
use crate::model::ValidationError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod clipboard_repo;
pub mod user_repo;
pub mod workspace_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity addressed by a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    User(UserId),
    Workspace(WorkspaceId),
    Clipboard(ClipboardId),
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {id}"),
            Self::Workspace(id) => write!(f, "workspace {id}"),
            Self::Clipboard(id) => write!(f, "clipboard {id}"),
        }
    }
}

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound(EntityRef),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Query returned a shape that indicates a query-construction bug.
    InconsistentResult(String),
    /// Unique constraint violation, e.g. email already in use.
    Conflict(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::InconsistentResult(message) => write!(f, "inconsistent query result: {message}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
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

/// Collapses a row list that must hold at most one element.
pub(crate) fn at_most_one<T>(mut rows: Vec<T>, what: &str) -> RepoResult<Option<T>> {
    if rows.len() > 1 {
        return Err(RepoError::InconsistentResult(format!(
            "expected at most one {what} row, got {}",
            rows.len()
        )));
    }
    Ok(rows.pop())
}

pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

#[cfg(test)]
mod tests {
    use super::{at_most_one, RepoError};

    #[test]
    fn at_most_one_rejects_multiple_rows() {
        let err = at_most_one(vec![1, 2], "workspace").unwrap_err();
        assert!(matches!(err, RepoError::InconsistentResult(_)));
        assert_eq!(at_most_one(vec![7], "workspace").unwrap(), Some(7));
        assert_eq!(at_most_one(Vec::<i32>::new(), "workspace").unwrap(), None);
    }
}
