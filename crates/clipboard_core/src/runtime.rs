//! Process-owned core runtime.
//!
//! # Responsibility
//! - Validate configuration, start logging and open the database once.
//! - Own the single users-by-email cache shared by every `UserService`.
//! - Hand out services bound to the owned connection.
//!
//! # Invariants
//! - Exactly one `AlternateKeyCache<User>` exists per `ClipboardCore`.
//! - The cache is dropped together with the core; nothing global holds it.

use crate::cache::AlternateKeyCache;
use crate::config::{ConfigError, CoreConfig};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::logging::{default_log_level, init_logging, LoggingError};
use crate::model::user::{User, UserDraft};
use crate::repo::clipboard_repo::SqliteClipboardRepository;
use crate::repo::user_repo::SqliteUserRepository;
use crate::repo::workspace_repo::SqliteWorkspaceRepository;
use crate::repo::RepoError;
use crate::service::clipboard_service::ClipboardService;
use crate::service::user_service::{
    Registration, UserService, UserServiceError, USERS_BY_EMAIL_CACHE,
};
use crate::service::workspace_service::{WorkspaceService, WorkspaceServiceError};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug)]
pub enum CoreError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(DbError),
    Repo(RepoError),
    User(UserServiceError),
    Workspace(WorkspaceServiceError),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid config: {err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::User(err) => write!(f, "{err}"),
            Self::Workspace(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::User(err) => Some(err),
            Self::Workspace(err) => Some(err),
        }
    }
}

impl From<ConfigError> for CoreError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CoreError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for CoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<UserServiceError> for CoreError {
    fn from(value: UserServiceError) -> Self {
        Self::User(value)
    }
}

impl From<WorkspaceServiceError> for CoreError {
    fn from(value: WorkspaceServiceError) -> Self {
        Self::Workspace(value)
    }
}

/// User service wired to SQLite storage and the core's workspace service.
pub type CoreUserService<'conn> =
    UserService<SqliteUserRepository<'conn>, WorkspaceService<SqliteWorkspaceRepository<'conn>>>;

/// Core runtime: configuration, connection and the email cache.
pub struct ClipboardCore {
    config: CoreConfig,
    conn: Connection,
    users_by_email: Arc<AlternateKeyCache<User>>,
}

impl ClipboardCore {
    /// Validates `config`, starts logging when `log_dir` is set, opens the
    /// database and creates an empty email cache.
    pub fn open(config: CoreConfig) -> Result<Self, CoreError> {
        config.validate()?;
        if let Some(log_dir) = config.log_dir.as_deref() {
            let level = config.log_level.as_deref().unwrap_or(default_log_level());
            init_logging(level, log_dir)?;
        }

        let conn = match config.db_path.as_deref() {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        info!(
            "event=app_start module=runtime status=ok in_memory={} default_page_size={} max_page_size={}",
            config.db_path.is_none(),
            config.default_page_size,
            config.max_page_size
        );

        Ok(Self {
            config,
            conn,
            users_by_email: Arc::new(AlternateKeyCache::new(USERS_BY_EMAIL_CACHE)),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Shared handle to the users-by-email cache.
    pub fn users_by_email(&self) -> Arc<AlternateKeyCache<User>> {
        Arc::clone(&self.users_by_email)
    }

    pub fn user_service(&self) -> Result<CoreUserService<'_>, CoreError> {
        let repo = SqliteUserRepository::try_new(&self.conn)?;
        Ok(UserService::new(
            repo,
            self.workspace_service()?,
            self.users_by_email(),
        ))
    }

    pub fn workspace_service(
        &self,
    ) -> Result<WorkspaceService<SqliteWorkspaceRepository<'_>>, CoreError> {
        let repo = SqliteWorkspaceRepository::try_new(&self.conn)?;
        Ok(WorkspaceService::with_page_bounds(
            repo,
            self.config.default_page_size,
            self.config.max_page_size,
        ))
    }

    pub fn clipboard_service(
        &self,
    ) -> Result<ClipboardService<SqliteClipboardRepository<'_>>, CoreError> {
        let repo = SqliteClipboardRepository::try_new(&self.conn)?;
        Ok(ClipboardService::new(repo))
    }

    /// Registers a user with the default authority and its "Home" workspace.
    pub fn register_user(&self, draft: &UserDraft) -> Result<Registration, CoreError> {
        Ok(self.user_service()?.register_user(draft)?)
    }

    /// Drops cached users and closes the connection.
    pub fn shutdown(self) -> Result<(), CoreError> {
        let cached = self.users_by_email.len();
        self.users_by_email.clear();
        self.conn
            .close()
            .map_err(|(_, err)| CoreError::Db(DbError::Sqlite(err)))?;
        info!(
            "event=app_stop module=runtime status=ok cached_entries={}",
            cached
        );
        Ok(())
    }
}
