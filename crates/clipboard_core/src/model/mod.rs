//! Domain model for workspaces, their members and clipboards.
//!
//! # Responsibility
//! - Define canonical data structures used by repositories and services.
//! - Own write-side validation rules shared by every persistence path.
//!
//! # Invariants
//! - Every entity is identified by a storage-assigned, never reused `i64`.
//! - Membership is a one-directional relation owned by the workspace side.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod clipboard;
pub mod page;
pub mod user;
pub mod workspace;

/// Validation failures raised before any SQL mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Email is empty, too long, or not shaped like `local@domain`.
    InvalidEmail(String),
    /// A required text field is blank after trim.
    BlankField(&'static str),
    /// A text field exceeds its maximum length.
    TooLong { field: &'static str, max: usize },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmail(value) => write!(f, "invalid email: `{value}`"),
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::TooLong { field, max } => {
                write!(f, "`{field}` exceeds maximum length of {max} characters")
            }
        }
    }
}

impl Error for ValidationError {}
