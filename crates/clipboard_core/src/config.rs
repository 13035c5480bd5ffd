//! Core configuration and application constants.
//!
//! # Responsibility
//! - Describe how the host wants the core opened (database, logging, paging).
//! - Reject unusable settings before any resource is acquired.
//!
//! # Invariants
//! - `db_path = None` means every opened connection is a fresh in-memory
//!   database.
//! - `0 < default_page_size <= max_page_size` after validation.

use crate::model::page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::model::user::Language;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_LANGUAGE: Language = Language::En;
/// Name of the workspace created for every registered user.
pub const HOME_WORKSPACE_NAME: &str = "Home";
/// Authority granted on self-service registration.
pub const DEFAULT_AUTHORITY: &str = "ROLE_USER";
pub const ADMIN_AUTHORITY: &str = "ROLE_ADMIN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidPageSize { default_size: u32, max_size: u32 },
    BlankLogLevel,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageSize {
                default_size,
                max_size,
            } => write!(
                f,
                "page sizes must satisfy 0 < default ({default_size}) <= max ({max_size})"
            ),
            Self::BlankLogLevel => write!(f, "log_level must not be blank when set"),
        }
    }
}

impl Error for ConfigError {}

/// Host-supplied settings for [`crate::runtime::ClipboardCore`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file path; `None` opens in-memory databases.
    pub db_path: Option<PathBuf>,
    /// Log level; falls back to [`crate::logging::default_log_level`].
    pub log_level: Option<String>,
    /// Absolute log directory; logging stays off when unset.
    pub log_dir: Option<String>,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: None,
            log_dir: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl CoreConfig {
    /// Config for a file-backed database with default paging.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ConfigError::InvalidPageSize {
                default_size: self.default_page_size,
                max_size: self.max_page_size,
            });
        }
        if self
            .log_level
            .as_deref()
            .is_some_and(|level| level.trim().is_empty())
        {
            return Err(ConfigError::BlankLogLevel);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};

    #[test]
    fn default_config_is_valid_and_in_memory() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn inverted_page_bounds_are_rejected() {
        let config = CoreConfig {
            default_page_size: 50,
            max_page_size: 10,
            ..CoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPageSize { .. })
        ));
    }

    #[test]
    fn blank_log_level_is_rejected() {
        let config = CoreConfig {
            log_level: Some("  ".to_string()),
            ..CoreConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::BlankLogLevel));
    }

    #[test]
    fn partial_json_config_fills_defaults() {
        let config: CoreConfig =
            serde_json::from_str(r#"{"db_path": "/var/lib/clipboard/core.db", "max_page_size": 40}"#)
                .unwrap();
        assert_eq!(
            config.db_path.as_deref(),
            Some(std::path::Path::new("/var/lib/clipboard/core.db"))
        );
        assert_eq!(config.max_page_size, 40);
        assert_eq!(config.default_page_size, 20);
        assert!(config.validate().is_ok());
    }
}
