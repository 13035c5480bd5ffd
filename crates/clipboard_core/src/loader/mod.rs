//! Two-phase relationship loading.
//!
//! # Responsibility
//! - Attach the many-to-many member set to already fetched workspaces.
//! - Keep caller ordering and page metadata untouched by the join.
//!
//! # Invariants
//! - The primary fetch never joins; the secondary fetch joins exactly one
//!   association and returns distinct (owner, member) pairs.
//! - Store row order is never trusted; output order comes from the input.

pub mod association;
pub mod merge;
