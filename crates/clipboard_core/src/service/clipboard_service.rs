//! Clipboard use-case service.
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - Clipboards are listed per workspace on demand; workspaces do not hold them.

use crate::model::clipboard::{Clipboard, ClipboardId};
use crate::model::workspace::WorkspaceId;
use crate::repo::clipboard_repo::ClipboardRepository;
use crate::repo::RepoResult;
use log::info;

/// Use-case service wrapper for clipboard CRUD operations.
pub struct ClipboardService<R: ClipboardRepository> {
    repo: R,
}

impl<R: ClipboardRepository> ClipboardService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one clipboard, optionally inside a workspace.
    pub fn create_clipboard(
        &self,
        content: impl Into<String>,
        workspace_id: Option<WorkspaceId>,
    ) -> RepoResult<Clipboard> {
        let content = content.into();
        let clipboard = self.repo.create_clipboard(&content, workspace_id)?;
        info!(
            "event=clipboard_create module=service status=ok clipboard_id={} content_len={}",
            clipboard.id,
            content.len()
        );
        Ok(clipboard)
    }

    /// Replaces clipboard content.
    pub fn update_clipboard(
        &self,
        id: ClipboardId,
        content: impl Into<String>,
    ) -> RepoResult<Clipboard> {
        self.repo.update_clipboard(id, &content.into())
    }

    pub fn get_clipboard(&self, id: ClipboardId) -> RepoResult<Option<Clipboard>> {
        self.repo.get_clipboard(id)
    }

    pub fn list_clipboards(&self, workspace_id: WorkspaceId) -> RepoResult<Vec<Clipboard>> {
        self.repo.list_clipboards_for_workspace(workspace_id)
    }

    pub fn delete_clipboard(&self, id: ClipboardId) -> RepoResult<()> {
        self.repo.delete_clipboard(id)
    }
}
