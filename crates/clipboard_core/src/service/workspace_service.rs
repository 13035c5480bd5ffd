//! Workspace use-case service.
//!
//! # Responsibility
//! - Provide lazy and eager (members attached) workspace reads.
//! - Validate and apply workspace and membership writes.
//! - Bootstrap the home workspace of a newly registered user.
//!
//! # Invariants
//! - Eager reads always go through the association loader.
//! - Eager page reads report the metadata of the unjoined page query.
//! - Membership edits never touch the email lookup cache; cached users do
//!   not carry their workspaces.

use crate::config::HOME_WORKSPACE_NAME;
use crate::loader::association::AssociationLoader;
use crate::model::page::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::model::user::UserId;
use crate::model::workspace::{Workspace, WorkspaceDraft, WorkspaceId};
use crate::model::ValidationError;
use crate::repo::workspace_repo::WorkspaceRepository;
use crate::repo::{EntityRef, RepoError, RepoResult};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for workspace use-cases.
#[derive(Debug)]
pub enum WorkspaceServiceError {
    /// Workspace name is blank or too long.
    InvalidName(ValidationError),
    WorkspaceNotFound(WorkspaceId),
    UserNotFound(UserId),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
    Repo(RepoError),
}

impl Display for WorkspaceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(err) => write!(f, "invalid workspace name: {err}"),
            Self::WorkspaceNotFound(id) => write!(f, "workspace not found: {id}"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent workspace state: {details}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WorkspaceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for WorkspaceServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(EntityRef::Workspace(id)) => Self::WorkspaceNotFound(id),
            RepoError::NotFound(EntityRef::User(id)) => Self::UserNotFound(id),
            RepoError::Validation(err) => Self::InvalidName(err),
            other => Self::Repo(other),
        }
    }
}

/// Creates the default workspace of a newly created user.
pub trait HomeWorkspaceInit {
    fn init_home_workspace(&self, owner: UserId) -> Result<Workspace, WorkspaceServiceError>;
}

/// Workspace service facade over repository implementations.
pub struct WorkspaceService<R: WorkspaceRepository> {
    repo: R,
    default_page_size: u32,
    max_page_size: u32,
}

impl<R: WorkspaceRepository> WorkspaceService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_page_bounds(repo, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    /// Creates a service with explicit page size bounds.
    pub fn with_page_bounds(repo: R, default_page_size: u32, max_page_size: u32) -> Self {
        Self {
            repo,
            default_page_size,
            max_page_size,
        }
    }

    fn loader(&self) -> AssociationLoader<'_, R> {
        AssociationLoader::new(&self.repo)
    }

    /// Gets one workspace; `eager` attaches its members.
    pub fn get_workspace(&self, id: WorkspaceId, eager: bool) -> RepoResult<Option<Workspace>> {
        if eager {
            self.loader().load_one(id)
        } else {
            self.repo.get_workspace(id)
        }
    }

    /// Lists all workspaces ordered by id.
    pub fn list_workspaces(&self, eager: bool) -> RepoResult<Vec<Workspace>> {
        let workspaces = self.repo.list_workspaces()?;
        if eager {
            self.loader().load_many(workspaces)
        } else {
            Ok(workspaces)
        }
    }

    /// Lists workspaces owned by one user, ordered by id.
    pub fn list_workspaces_by_owner(
        &self,
        owner: UserId,
        eager: bool,
    ) -> RepoResult<Vec<Workspace>> {
        let workspaces = self.repo.list_workspaces_by_owner(owner)?;
        if eager {
            self.loader().load_many(workspaces)
        } else {
            Ok(workspaces)
        }
    }

    /// Lists one page of workspaces; size `0` selects the default size.
    pub fn list_workspace_page(
        &self,
        page: u32,
        size: u32,
        eager: bool,
    ) -> RepoResult<Page<Workspace>> {
        let request =
            PageRequest::bounded(page, size, self.default_page_size, self.max_page_size);
        let workspaces = self.repo.list_workspace_page(request)?;
        if eager {
            self.loader().load_page(workspaces)
        } else {
            Ok(workspaces)
        }
    }

    /// Lists workspaces the user is a member of, with members attached.
    pub fn list_workspaces_for_member(&self, member: UserId) -> RepoResult<Vec<Workspace>> {
        let ids = self.repo.list_workspace_ids_for_member(member)?;
        let workspaces = self.repo.list_workspaces_by_ids(&ids)?;
        self.loader().load_many(workspaces)
    }

    pub fn create_workspace(
        &self,
        name: &str,
        owner: Option<UserId>,
    ) -> Result<Workspace, WorkspaceServiceError> {
        let workspace = self
            .repo
            .create_workspace(&WorkspaceDraft::new(name, owner))?;
        info!(
            "event=workspace_create module=service status=ok workspace_id={} has_owner={}",
            workspace.id,
            workspace.owner.is_some()
        );
        Ok(workspace)
    }

    pub fn update_workspace(
        &self,
        id: WorkspaceId,
        name: &str,
        owner: Option<UserId>,
    ) -> Result<Workspace, WorkspaceServiceError> {
        let workspace = self
            .repo
            .update_workspace(id, &WorkspaceDraft::new(name, owner))?;
        info!(
            "event=workspace_update module=service status=ok workspace_id={}",
            workspace.id
        );
        Ok(workspace)
    }

    pub fn delete_workspace(&self, id: WorkspaceId) -> Result<(), WorkspaceServiceError> {
        self.repo.delete_workspace(id)?;
        info!(
            "event=workspace_delete module=service status=ok workspace_id={}",
            id
        );
        Ok(())
    }

    /// Replaces the member set and returns the workspace with members.
    pub fn set_members(
        &self,
        id: WorkspaceId,
        members: &[UserId],
    ) -> Result<Workspace, WorkspaceServiceError> {
        self.repo.set_members(id, members)?;
        info!(
            "event=workspace_set_members module=service status=ok workspace_id={} requested={}",
            id,
            members.len()
        );
        self.read_back(id, "workspace missing after member replacement")
    }

    pub fn add_member(
        &self,
        id: WorkspaceId,
        member: UserId,
    ) -> Result<Workspace, WorkspaceServiceError> {
        self.repo.add_member(id, member)?;
        self.read_back(id, "workspace missing after member add")
    }

    pub fn remove_member(
        &self,
        id: WorkspaceId,
        member: UserId,
    ) -> Result<Workspace, WorkspaceServiceError> {
        self.repo.remove_member(id, member)?;
        self.read_back(id, "workspace missing after member removal")
    }

    fn read_back(
        &self,
        id: WorkspaceId,
        details: &'static str,
    ) -> Result<Workspace, WorkspaceServiceError> {
        self.loader()
            .load_one(id)?
            .ok_or(WorkspaceServiceError::InconsistentState(details))
    }
}

impl<R: WorkspaceRepository> HomeWorkspaceInit for WorkspaceService<R> {
    /// Creates the default "Home" workspace owned by `owner`.
    fn init_home_workspace(&self, owner: UserId) -> Result<Workspace, WorkspaceServiceError> {
        self.create_workspace(HOME_WORKSPACE_NAME, Some(owner))
    }
}
