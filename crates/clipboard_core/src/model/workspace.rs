//! Workspace domain model.
//!
//! # Responsibility
//! - Define the owning entity of the membership association.
//!
//! # Invariants
//! - `members` is empty unless populated by the association loader.
//! - `members` is sorted by user id and holds each user at most once.
//! - Clipboards are never held on the workspace; they are queried on demand.

use crate::model::user::{User, UserId};
use crate::model::ValidationError;
use serde::{Deserialize, Serialize};

/// Storage-assigned workspace identity.
pub type WorkspaceId = i64;

const WORKSPACE_NAME_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    /// Exclusive owning user, if any.
    pub owner: Option<UserId>,
    #[serde(default)]
    pub members: Vec<User>,
}

impl Workspace {
    /// Returns member ids in stored order.
    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|member| member.id).collect()
    }
}

/// Write model for workspace create/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDraft {
    pub name: String,
    pub owner: Option<UserId>,
}

impl WorkspaceDraft {
    pub fn new(name: impl Into<String>, owner: Option<UserId>) -> Self {
        Self {
            name: name.into(),
            owner,
        }
    }

    /// Trims and validates the workspace name.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::BlankField("name"));
        }
        if name.chars().count() > WORKSPACE_NAME_MAX_CHARS {
            return Err(ValidationError::TooLong {
                field: "name",
                max: WORKSPACE_NAME_MAX_CHARS,
            });
        }
        Ok(Self {
            name: name.to_string(),
            owner: self.owner,
        })
    }
}
