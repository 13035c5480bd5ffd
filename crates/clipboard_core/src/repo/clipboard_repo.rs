//! Clipboard repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A clipboard belongs to at most one workspace.
//! - Listing by workspace is an on-demand query ordered by `id ASC`.

use crate::model::clipboard::{Clipboard, ClipboardId};
use crate::model::workspace::WorkspaceId;
use crate::model::ValidationError;
use crate::repo::{at_most_one, ensure_tables, EntityRef, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const CLIPBOARD_CONTENT_MAX_CHARS: usize = 65_536;

/// Repository interface for clipboard entries.
pub trait ClipboardRepository {
    fn create_clipboard(
        &self,
        content: &str,
        workspace_id: Option<WorkspaceId>,
    ) -> RepoResult<Clipboard>;
    fn update_clipboard(&self, id: ClipboardId, content: &str) -> RepoResult<Clipboard>;
    fn delete_clipboard(&self, id: ClipboardId) -> RepoResult<()>;
    fn get_clipboard(&self, id: ClipboardId) -> RepoResult<Option<Clipboard>>;
    fn list_clipboards_for_workspace(&self, workspace_id: WorkspaceId)
        -> RepoResult<Vec<Clipboard>>;
}

/// SQLite-backed clipboard repository.
pub struct SqliteClipboardRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteClipboardRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["clipboards", "workspaces"])?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: ClipboardId) -> RepoResult<Clipboard> {
        self.get_clipboard(id)?
            .ok_or(RepoError::NotFound(EntityRef::Clipboard(id)))
    }
}

impl ClipboardRepository for SqliteClipboardRepository<'_> {
    fn create_clipboard(
        &self,
        content: &str,
        workspace_id: Option<WorkspaceId>,
    ) -> RepoResult<Clipboard> {
        validate_content(content)?;
        if let Some(workspace_id) = workspace_id {
            let exists: i64 = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM workspaces WHERE id = ?1);",
                [workspace_id],
                |row| row.get(0),
            )?;
            if exists != 1 {
                return Err(RepoError::NotFound(EntityRef::Workspace(workspace_id)));
            }
        }
        self.conn.execute(
            "INSERT INTO clipboards (content, workspace_id) VALUES (?1, ?2);",
            params![content, workspace_id],
        )?;
        self.load_required(self.conn.last_insert_rowid())
    }

    fn update_clipboard(&self, id: ClipboardId, content: &str) -> RepoResult<Clipboard> {
        validate_content(content)?;
        let changed = self.conn.execute(
            "UPDATE clipboards
             SET
                content = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, content],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Clipboard(id)));
        }
        self.load_required(id)
    }

    fn delete_clipboard(&self, id: ClipboardId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM clipboards WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Clipboard(id)));
        }
        Ok(())
    }

    fn get_clipboard(&self, id: ClipboardId) -> RepoResult<Option<Clipboard>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, workspace_id
             FROM clipboards
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut clipboards = Vec::new();
        while let Some(row) = rows.next()? {
            clipboards.push(parse_clipboard_row(row)?);
        }
        at_most_one(clipboards, "clipboard")
    }

    fn list_clipboards_for_workspace(
        &self,
        workspace_id: WorkspaceId,
    ) -> RepoResult<Vec<Clipboard>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, workspace_id
             FROM clipboards
             WHERE workspace_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([workspace_id])?;
        let mut clipboards = Vec::new();
        while let Some(row) = rows.next()? {
            clipboards.push(parse_clipboard_row(row)?);
        }
        Ok(clipboards)
    }
}

fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.chars().count() > CLIPBOARD_CONTENT_MAX_CHARS {
        return Err(ValidationError::TooLong {
            field: "content",
            max: CLIPBOARD_CONTENT_MAX_CHARS,
        });
    }
    Ok(())
}

fn parse_clipboard_row(row: &Row<'_>) -> RepoResult<Clipboard> {
    Ok(Clipboard {
        id: row.get("id")?,
        content: row.get("content")?,
        workspace_id: row.get("workspace_id")?,
    })
}
