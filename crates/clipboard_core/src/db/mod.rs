//! SQLite storage for users, workspaces and clipboards.
//!
//! # Responsibility
//! - Open connections with foreign keys enforced and a busy timeout set.
//! - Create `users`, `authorities` and `user_authorities` (v1), `workspaces`
//!   and `workspace_members` (v2), then `clipboards` (v3).
//!
//! # Invariants
//! - `PRAGMA user_version` equals the last applied migration; a newer database is refused.
//! - Emails are unique case-insensitively; membership rows are unique per pair.
//! - Deleting a workspace cascades to its members and clipboards; deleting a
//!   user detaches owned workspaces instead of deleting them.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
