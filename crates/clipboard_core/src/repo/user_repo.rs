//! User repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist user profile fields and granted authorities.
//! - Resolve users by id or by normalized email with authorities hydrated.
//!
//! # Invariants
//! - Emails are normalized before every write and lookup.
//! - Authority replacement is atomic and ignores unknown authority names.

use crate::config::DEFAULT_LANGUAGE;
use crate::model::page::{Page, PageRequest};
use crate::model::user::{normalize_email, Language, User, UserDraft, UserId};
use crate::repo::{
    at_most_one, ensure_tables, is_unique_violation, EntityRef, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::{BTreeSet, HashMap};

const USER_SELECT_SQL: &str = "SELECT
    id,
    email,
    name,
    image_url,
    language
FROM users";

/// Repository interface for user accounts.
pub trait UserRepository {
    /// Inserts one user and grants the given authorities.
    fn create_user(&self, draft: &UserDraft, authorities: &BTreeSet<String>) -> RepoResult<User>;
    /// Replaces profile fields (email included) of an existing user.
    fn update_user(&self, id: UserId, draft: &UserDraft) -> RepoResult<User>;
    /// Replaces the full authority set of an existing user.
    fn set_authorities(&self, id: UserId, authorities: &BTreeSet<String>) -> RepoResult<User>;
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    /// Case-insensitive email lookup with authorities hydrated.
    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// Lists one page of users ordered by id, authorities hydrated.
    fn list_users_page(&self, request: PageRequest) -> RepoResult<Page<User>>;
    /// Returns all known authority names sorted ascending.
    fn list_authorities(&self) -> RepoResult<Vec<String>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["users", "authorities", "user_authorities"])?;
        Ok(Self { conn })
    }

    fn load_required(&self, id: UserId) -> RepoResult<User> {
        self.get_user(id)?
            .ok_or(RepoError::NotFound(EntityRef::User(id)))
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, draft: &UserDraft, authorities: &BTreeSet<String>) -> RepoResult<User> {
        let draft = draft.normalized()?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (email, name, image_url, language)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                draft.email.as_str(),
                draft.name.as_deref(),
                draft.image_url.as_deref(),
                draft.language.unwrap_or(DEFAULT_LANGUAGE).as_db_str(),
            ],
        )
        .map_err(map_email_conflict)?;
        let id = tx.last_insert_rowid();
        replace_authorities(&tx, id, authorities)?;
        tx.commit()?;

        self.load_required(id)
    }

    fn update_user(&self, id: UserId, draft: &UserDraft) -> RepoResult<User> {
        let draft = draft.normalized()?;
        let changed = self
            .conn
            .execute(
                "UPDATE users
                 SET
                    email = ?2,
                    name = ?3,
                    image_url = ?4,
                    language = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    id,
                    draft.email.as_str(),
                    draft.name.as_deref(),
                    draft.image_url.as_deref(),
                    draft.language.unwrap_or(DEFAULT_LANGUAGE).as_db_str(),
                ],
            )
            .map_err(map_email_conflict)?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::User(id)));
        }

        self.load_required(id)
    }

    fn set_authorities(&self, id: UserId, authorities: &BTreeSet<String>) -> RepoResult<User> {
        let tx = self.conn.unchecked_transaction()?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::NotFound(EntityRef::User(id)));
        }
        replace_authorities(&tx, id, authorities)?;
        tx.execute(
            "UPDATE users SET updated_at = (strftime('%s', 'now') * 1000) WHERE id = ?1;",
            [id],
        )?;
        tx.commit()?;

        self.load_required(id)
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM users WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityRef::User(id)));
        }
        Ok(())
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        match at_most_one(users, "user")? {
            Some(mut user) => {
                user.authorities = load_authorities(self.conn, user.id)?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let normalized = normalize_email(email);
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1 COLLATE NOCASE;"))?;
        let mut rows = stmt.query([normalized.as_str()])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        match at_most_one(users, "user-by-email")? {
            Some(mut user) => {
                user.authorities = load_authorities(self.conn, user.id)?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    fn list_users_page(&self, request: PageRequest) -> RepoResult<Page<User>> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))?;
        let offset = i64::try_from(request.offset()).map_err(|_| {
            RepoError::InvalidData(format!("page offset {} out of range", request.offset()))
        })?;

        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL} ORDER BY id ASC LIMIT ?1 OFFSET ?2;"
        ))?;
        let mut rows = stmt.query(params![i64::from(request.size), offset])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(parse_user_row(row)?);
        }

        let ids: Vec<UserId> = users.iter().map(|user| user.id).collect();
        let mut authorities = load_authorities_for(self.conn, &ids)?;
        for user in &mut users {
            user.authorities = authorities.remove(&user.id).unwrap_or_default();
        }

        let total = u64::try_from(total)
            .map_err(|_| RepoError::InvalidData(format!("negative user count {total}")))?;
        Ok(Page::new(users, request, total))
    }

    fn list_authorities(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM authorities ORDER BY name ASC;")?;
        let mut rows = stmt.query([])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }
}

/// Parses profile columns only; authorities are left empty.
///
/// Shared with the membership loader, which materializes members without
/// their authorities.
pub(crate) fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let language_text: String = row.get("language")?;
    let language = Language::parse(&language_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid language `{language_text}` in users.language"))
    })?;

    Ok(User {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        image_url: row.get("image_url")?,
        language,
        authorities: BTreeSet::new(),
    })
}

fn load_authorities(conn: &Connection, user_id: UserId) -> RepoResult<BTreeSet<String>> {
    let mut stmt = conn.prepare(
        "SELECT authority_name
         FROM user_authorities
         WHERE user_id = ?1;",
    )?;
    let mut rows = stmt.query([user_id])?;
    let mut names = BTreeSet::new();
    while let Some(row) = rows.next()? {
        names.insert(row.get(0)?);
    }
    Ok(names)
}

/// Loads authorities for many users in one query.
fn load_authorities_for(
    conn: &Connection,
    user_ids: &[UserId],
) -> RepoResult<HashMap<UserId, BTreeSet<String>>> {
    let mut by_user: HashMap<UserId, BTreeSet<String>> = HashMap::new();
    if user_ids.is_empty() {
        return Ok(by_user);
    }

    let placeholders = vec!["?"; user_ids.len()].join(", ");
    let mut stmt = conn.prepare(&format!(
        "SELECT user_id, authority_name
         FROM user_authorities
         WHERE user_id IN ({placeholders});"
    ))?;
    let mut rows = stmt.query(params_from_iter(
        user_ids.iter().map(|id| Value::Integer(*id)),
    ))?;
    while let Some(row) = rows.next()? {
        let user_id: UserId = row.get(0)?;
        by_user.entry(user_id).or_default().insert(row.get(1)?);
    }
    Ok(by_user)
}

fn replace_authorities(
    conn: &Connection,
    user_id: UserId,
    authorities: &BTreeSet<String>,
) -> RepoResult<()> {
    conn.execute("DELETE FROM user_authorities WHERE user_id = ?1;", [user_id])?;
    for name in authorities {
        conn.execute(
            "INSERT INTO user_authorities (user_id, authority_name)
             SELECT ?1, name
             FROM authorities
             WHERE name = ?2;",
            params![user_id, name.as_str()],
        )?;
    }
    Ok(())
}

fn map_email_conflict(err: rusqlite::Error) -> RepoError {
    if is_unique_violation(&err) {
        RepoError::Conflict("email already in use".to_string())
    } else {
        err.into()
    }
}
