//! User use-case service.
//!
//! # Responsibility
//! - Serve email lookups through the alternate-key cache.
//! - Perform user writes through the write coordinator.
//! - Give every created user a "Home" workspace.
//!
//! # Invariants
//! - `find_by_email` is the only caller of the cache's `get`.
//! - Every mutation evicts the affected email(s), including the old email
//!   when the email itself changes.

use crate::cache::AlternateKeyCache;
use crate::config::DEFAULT_AUTHORITY;
use crate::model::page::{Page, PageRequest};
use crate::model::user::{normalize_email, User, UserDraft, UserId};
use crate::model::workspace::Workspace;
use crate::model::ValidationError;
use crate::repo::user_repo::UserRepository;
use crate::repo::{EntityRef, RepoError, RepoResult};
use crate::service::workspace_service::{HomeWorkspaceInit, WorkspaceServiceError};
use crate::service::write_coordinator::WriteCoordinator;
use log::info;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Cache name for users addressed by normalized email.
pub const USERS_BY_EMAIL_CACHE: &str = "users_by_email";

/// Service error for user use-cases.
#[derive(Debug)]
pub enum UserServiceError {
    /// Email fails normalization/shape validation.
    InvalidEmail(String),
    /// Another user already owns this email.
    EmailAlreadyUsed,
    /// Target user does not exist.
    UserNotFound(UserId),
    /// User was stored but its home workspace could not be created.
    HomeWorkspace(WorkspaceServiceError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail(value) => write!(f, "invalid email: `{value}`"),
            Self::EmailAlreadyUsed => write!(f, "email is already in use"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::HomeWorkspace(err) => write!(f, "home workspace not created: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::HomeWorkspace(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for UserServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(EntityRef::User(id)) => Self::UserNotFound(id),
            RepoError::Conflict(_) => Self::EmailAlreadyUsed,
            RepoError::Validation(ValidationError::InvalidEmail(email)) => {
                Self::InvalidEmail(email)
            }
            other => Self::Repo(other),
        }
    }
}

/// A created user together with its home workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user: User,
    pub home: Workspace,
}

/// User service facade over a repository and the shared email cache.
pub struct UserService<R: UserRepository, H: HomeWorkspaceInit> {
    repo: R,
    homes: H,
    cache: Arc<AlternateKeyCache<User>>,
    writes: WriteCoordinator<User>,
}

impl<R: UserRepository, H: HomeWorkspaceInit> UserService<R, H> {
    /// Creates a service bound to the process-owned email cache.
    pub fn new(repo: R, homes: H, cache: Arc<AlternateKeyCache<User>>) -> Self {
        let writes = WriteCoordinator::new(Arc::clone(&cache));
        Self {
            repo,
            homes,
            cache,
            writes,
        }
    }

    /// Looks up a user with authorities by case-insensitive email.
    ///
    /// Served from cache when present; absent users are never cached.
    pub fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.cache
            .get(email, |normalized| self.repo.find_by_email(normalized))
    }

    /// Gets one user by id, bypassing the cache.
    pub fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.repo.get_user(id)
    }

    /// Lists one page of users ordered by id, bypassing the cache.
    pub fn list_users_page(&self, request: PageRequest) -> RepoResult<Page<User>> {
        self.repo.list_users_page(request)
    }

    /// Registers a self-service account with the default authority.
    pub fn register_user(&self, draft: &UserDraft) -> Result<Registration, UserServiceError> {
        let authorities = BTreeSet::from([DEFAULT_AUTHORITY.to_string()]);
        self.create_user(draft, &authorities)
    }

    /// Creates an account with explicit authorities and its home workspace.
    ///
    /// Unknown authority names are ignored. The two writes are not atomic; a
    /// failed workspace insert leaves the user stored without a home
    /// workspace and surfaces as `HomeWorkspace`.
    pub fn create_user(
        &self,
        draft: &UserDraft,
        authorities: &BTreeSet<String>,
    ) -> Result<Registration, UserServiceError> {
        let draft = draft.normalized().map_err(RepoError::from)?;
        if self.repo.find_by_email(&draft.email)?.is_some() {
            return Err(UserServiceError::EmailAlreadyUsed);
        }

        let user = self
            .writes
            .commit(&[draft.email.as_str()], || {
                self.repo.create_user(&draft, authorities)
            })?;
        let home = self
            .homes
            .init_home_workspace(user.id)
            .map_err(UserServiceError::HomeWorkspace)?;
        info!(
            "event=user_create module=service status=ok user_id={} authorities={} workspace_id={}",
            user.id,
            user.authorities.len(),
            home.id
        );
        Ok(Registration { user, home })
    }

    /// Replaces profile fields, evicting both the old and the new email.
    pub fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<User, UserServiceError> {
        let draft = draft.normalized().map_err(RepoError::from)?;
        let current = self
            .repo
            .get_user(id)?
            .ok_or(UserServiceError::UserNotFound(id))?;

        let user = self
            .writes
            .commit(&[current.email.as_str(), draft.email.as_str()], || {
                self.repo.update_user(id, &draft)
            })?;
        info!(
            "event=user_update module=service status=ok user_id={} email_changed={}",
            user.id,
            current.email != user.email
        );
        Ok(user)
    }

    /// Replaces the authority set of one user.
    pub fn set_authorities(
        &self,
        id: UserId,
        authorities: &BTreeSet<String>,
    ) -> Result<User, UserServiceError> {
        let current = self
            .repo
            .get_user(id)?
            .ok_or(UserServiceError::UserNotFound(id))?;

        let user = self.writes.commit(&[current.email.as_str()], || {
            self.repo.set_authorities(id, authorities)
        })?;
        info!(
            "event=user_authorities module=service status=ok user_id={} authorities={}",
            user.id,
            user.authorities.len()
        );
        Ok(user)
    }

    /// Deletes the user addressed by email.
    ///
    /// Returns `false` when no such user exists.
    pub fn delete_user(&self, email: &str) -> Result<bool, UserServiceError> {
        let normalized = normalize_email(email);
        let Some(user) = self.repo.find_by_email(&normalized)? else {
            return Ok(false);
        };

        self.writes
            .commit(&[normalized.as_str(), user.email.as_str()], || {
                self.repo.delete_user(user.id)
            })?;
        info!(
            "event=user_delete module=service status=ok user_id={}",
            user.id
        );
        Ok(true)
    }

    /// Lists authority names known by storage.
    pub fn list_authorities(&self) -> RepoResult<Vec<String>> {
        self.repo.list_authorities()
    }
}
