//! Workspace repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Primary workspace fetches (by id, by id list, all, by owner, by page)
//!   without joins.
//! - Membership storage and the distinct (workspace, member) secondary fetch.
//!
//! # Invariants
//! - Membership rows are stored once in `workspace_members`; the inverse
//!   direction is a derived query.
//! - List reads are ordered by `id ASC`.
//! - Page metadata comes from an unjoined `COUNT(*)`.

use crate::loader::association::AssociationStore;
use crate::loader::merge::merge_in_order;
use crate::model::page::{Page, PageRequest};
use crate::model::user::{User, UserId};
use crate::model::workspace::{Workspace, WorkspaceDraft, WorkspaceId};
use crate::repo::user_repo::parse_user_row;
use crate::repo::{at_most_one, ensure_tables, EntityRef, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeSet;

const WORKSPACE_SELECT_SQL: &str = "SELECT
    id,
    name,
    owner_id
FROM workspaces";

// Stays below SQLite's historical 999 bound-parameter limit.
const ID_LIST_CHUNK: usize = 900;

/// Repository interface for workspaces and their membership relation.
pub trait WorkspaceRepository: AssociationStore {
    fn create_workspace(&self, draft: &WorkspaceDraft) -> RepoResult<Workspace>;
    fn update_workspace(&self, id: WorkspaceId, draft: &WorkspaceDraft) -> RepoResult<Workspace>;
    fn delete_workspace(&self, id: WorkspaceId) -> RepoResult<()>;
    /// Gets one workspace without members.
    fn get_workspace(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>>;
    /// Gets many workspaces without members, in the order of `ids`.
    ///
    /// Missing ids are skipped; a repeated id yields one workspace.
    fn list_workspaces_by_ids(&self, ids: &[WorkspaceId]) -> RepoResult<Vec<Workspace>>;
    fn list_workspaces(&self) -> RepoResult<Vec<Workspace>>;
    fn list_workspaces_by_owner(&self, owner: UserId) -> RepoResult<Vec<Workspace>>;
    fn list_workspace_page(&self, request: PageRequest) -> RepoResult<Page<Workspace>>;
    /// Replaces the full member set in one transaction.
    fn set_members(&self, id: WorkspaceId, members: &[UserId]) -> RepoResult<()>;
    /// Adds one member; returns `false` when already a member.
    fn add_member(&self, id: WorkspaceId, member: UserId) -> RepoResult<bool>;
    /// Removes one member; returns `false` when not a member.
    fn remove_member(&self, id: WorkspaceId, member: UserId) -> RepoResult<bool>;
    /// Derived inverse query: workspaces a user is a member of.
    fn list_workspace_ids_for_member(&self, member: UserId) -> RepoResult<Vec<WorkspaceId>>;
}

/// SQLite-backed workspace repository.
pub struct SqliteWorkspaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkspaceRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["workspaces", "workspace_members", "users"])?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: WorkspaceId) -> RepoResult<Workspace> {
        self.get_workspace(id)?
            .ok_or(RepoError::NotFound(EntityRef::Workspace(id)))
    }

    fn query_workspaces(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Workspace>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut workspaces = Vec::new();
        while let Some(row) = rows.next()? {
            workspaces.push(parse_workspace_row(row)?);
        }
        Ok(workspaces)
    }
}

impl WorkspaceRepository for SqliteWorkspaceRepository<'_> {
    fn create_workspace(&self, draft: &WorkspaceDraft) -> RepoResult<Workspace> {
        let draft = draft.normalized()?;
        if let Some(owner) = draft.owner {
            ensure_user_exists(self.conn, owner)?;
        }
        self.conn.execute(
            "INSERT INTO workspaces (name, owner_id) VALUES (?1, ?2);",
            params![draft.name.as_str(), draft.owner],
        )?;
        self.load_required(self.conn.last_insert_rowid())
    }

    fn update_workspace(&self, id: WorkspaceId, draft: &WorkspaceDraft) -> RepoResult<Workspace> {
        let draft = draft.normalized()?;
        if let Some(owner) = draft.owner {
            ensure_user_exists(self.conn, owner)?;
        }
        let changed = self.conn.execute(
            "UPDATE workspaces
             SET
                name = ?2,
                owner_id = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, draft.name.as_str(), draft.owner],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Workspace(id)));
        }
        self.load_required(id)
    }

    fn delete_workspace(&self, id: WorkspaceId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM workspaces WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::Workspace(id)));
        }
        Ok(())
    }

    fn get_workspace(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>> {
        let rows = self.query_workspaces(
            &format!("{WORKSPACE_SELECT_SQL} WHERE id = ?;"),
            vec![Value::Integer(id)],
        )?;
        at_most_one(rows, "workspace")
    }

    fn list_workspaces_by_ids(&self, ids: &[WorkspaceId]) -> RepoResult<Vec<Workspace>> {
        let distinct: Vec<WorkspaceId> = ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut keyed = Vec::with_capacity(distinct.len());
        for chunk in distinct.chunks(ID_LIST_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let rows = self.query_workspaces(
                &format!("{WORKSPACE_SELECT_SQL} WHERE id IN ({placeholders});"),
                chunk.iter().map(|id| Value::Integer(*id)).collect(),
            )?;
            keyed.extend(rows.into_iter().map(|workspace| (workspace.id, workspace)));
        }
        Ok(merge_in_order(ids, keyed))
    }

    fn list_workspaces(&self) -> RepoResult<Vec<Workspace>> {
        self.query_workspaces(&format!("{WORKSPACE_SELECT_SQL} ORDER BY id ASC;"), Vec::new())
    }

    fn list_workspaces_by_owner(&self, owner: UserId) -> RepoResult<Vec<Workspace>> {
        self.query_workspaces(
            &format!("{WORKSPACE_SELECT_SQL} WHERE owner_id = ? ORDER BY id ASC;"),
            vec![Value::Integer(owner)],
        )
    }

    fn list_workspace_page(&self, request: PageRequest) -> RepoResult<Page<Workspace>> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM workspaces;", [], |row| row.get(0))?;
        let offset = i64::try_from(request.offset()).map_err(|_| {
            RepoError::InvalidData(format!("page offset {} out of range", request.offset()))
        })?;
        let content = self.query_workspaces(
            &format!("{WORKSPACE_SELECT_SQL} ORDER BY id ASC LIMIT ? OFFSET ?;"),
            vec![
                Value::Integer(i64::from(request.size)),
                Value::Integer(offset),
            ],
        )?;
        let total = u64::try_from(total)
            .map_err(|_| RepoError::InvalidData(format!("negative workspace count {total}")))?;
        Ok(Page::new(content, request, total))
    }

    fn set_members(&self, id: WorkspaceId, members: &[UserId]) -> RepoResult<()> {
        let unique: BTreeSet<UserId> = members.iter().copied().collect();
        let tx = self.conn.unchecked_transaction()?;
        ensure_workspace_exists(&tx, id)?;
        for member in &unique {
            ensure_user_exists(&tx, *member)?;
        }

        tx.execute(
            "DELETE FROM workspace_members WHERE workspace_id = ?1;",
            [id],
        )?;
        for member in &unique {
            tx.execute(
                "INSERT INTO workspace_members (workspace_id, user_id) VALUES (?1, ?2);",
                params![id, member],
            )?;
        }
        touch_workspace(&tx, id)?;
        tx.commit()?;
        Ok(())
    }

    fn add_member(&self, id: WorkspaceId, member: UserId) -> RepoResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        ensure_workspace_exists(&tx, id)?;
        ensure_user_exists(&tx, member)?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO workspace_members (workspace_id, user_id) VALUES (?1, ?2);",
            params![id, member],
        )?;
        if inserted > 0 {
            touch_workspace(&tx, id)?;
        }
        tx.commit()?;
        Ok(inserted > 0)
    }

    fn remove_member(&self, id: WorkspaceId, member: UserId) -> RepoResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        ensure_workspace_exists(&tx, id)?;
        let removed = tx.execute(
            "DELETE FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2;",
            params![id, member],
        )?;
        if removed > 0 {
            touch_workspace(&tx, id)?;
        }
        tx.commit()?;
        Ok(removed > 0)
    }

    fn list_workspace_ids_for_member(&self, member: UserId) -> RepoResult<Vec<WorkspaceId>> {
        let mut stmt = self.conn.prepare(
            "SELECT workspace_id
             FROM workspace_members
             WHERE user_id = ?1
             ORDER BY workspace_id ASC;",
        )?;
        let mut rows = stmt.query([member])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

impl AssociationStore for SqliteWorkspaceRepository<'_> {
    fn fetch_owner(&self, id: WorkspaceId) -> RepoResult<Option<Workspace>> {
        self.get_workspace(id)
    }

    fn fetch_member_pairs(&self, owner_ids: &[WorkspaceId]) -> RepoResult<Vec<(WorkspaceId, User)>> {
        let mut pairs = Vec::new();
        for chunk in owner_ids.chunks(ID_LIST_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            // No ORDER BY: callers reorder, so the planner is free to pick any plan.
            let sql = format!(
                "SELECT DISTINCT
                    wm.workspace_id AS workspace_id,
                    u.id AS id,
                    u.email AS email,
                    u.name AS name,
                    u.image_url AS image_url,
                    u.language AS language
                 FROM workspace_members wm
                 INNER JOIN users u ON u.id = wm.user_id
                 WHERE wm.workspace_id IN ({placeholders});"
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(chunk.iter()))?;
            while let Some(row) = rows.next()? {
                let workspace_id: WorkspaceId = row.get("workspace_id")?;
                pairs.push((workspace_id, parse_user_row(row)?));
            }
        }
        Ok(pairs)
    }
}

fn parse_workspace_row(row: &Row<'_>) -> RepoResult<Workspace> {
    Ok(Workspace {
        id: row.get("id")?,
        name: row.get("name")?,
        owner: row.get("owner_id")?,
        members: Vec::new(),
    })
}

fn ensure_workspace_exists(conn: &Connection, id: WorkspaceId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM workspaces WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::NotFound(EntityRef::Workspace(id)))
    }
}

fn ensure_user_exists(conn: &Connection, id: UserId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::NotFound(EntityRef::User(id)))
    }
}

fn touch_workspace(conn: &Connection, id: WorkspaceId) -> RepoResult<()> {
    conn.execute(
        "UPDATE workspaces SET updated_at = (strftime('%s', 'now') * 1000) WHERE id = ?1;",
        [id],
    )?;
    Ok(())
}
