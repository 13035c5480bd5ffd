//! Clipboard entry model.

use crate::model::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};

/// Storage-assigned clipboard identity.
pub type ClipboardId = i64;

/// Shared text snippet belonging to at most one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clipboard {
    pub id: ClipboardId,
    pub content: String,
    pub workspace_id: Option<WorkspaceId>,
}
