//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Route every user mutation through the write coordinator so the email
//!   lookup cache never serves a mutated user.
//! - Route eager workspace reads through the association loader.

pub mod clipboard_service;
pub mod user_service;
pub mod workspace_service;
pub mod write_coordinator;
