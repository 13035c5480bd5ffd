//! Core domain logic for the clipboard workspace store.
//! This crate is the single source of truth for business invariants.

pub mod cache;
pub mod config;
pub mod db;
pub mod loader;
pub mod logging;
pub mod model;
pub mod repo;
pub mod runtime;
pub mod service;

pub use cache::AlternateKeyCache;
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use loader::association::{AssociationLoader, AssociationStore};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::clipboard::{Clipboard, ClipboardId};
pub use model::page::{Page, PageRequest};
pub use model::user::{Language, User, UserDraft, UserId};
pub use model::workspace::{Workspace, WorkspaceDraft, WorkspaceId};
pub use model::ValidationError;
pub use repo::clipboard_repo::{ClipboardRepository, SqliteClipboardRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::workspace_repo::{SqliteWorkspaceRepository, WorkspaceRepository};
pub use repo::{RepoError, RepoResult};
pub use runtime::{ClipboardCore, CoreError, CoreUserService};
pub use service::clipboard_service::ClipboardService;
pub use service::user_service::{Registration, UserService, UserServiceError};
pub use service::workspace_service::{
    HomeWorkspaceInit, WorkspaceService, WorkspaceServiceError,
};
pub use service::write_coordinator::WriteCoordinator;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
