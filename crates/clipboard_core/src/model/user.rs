//! User domain model.
//!
//! # Responsibility
//! - Define the member/account record addressed by id and by email.
//! - Normalize and validate the email alternate key.
//!
//! # Invariants
//! - Persisted emails are trimmed and lowercase.
//! - `authorities` is only fully hydrated on lookup paths that request it.

use crate::model::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Storage-assigned user identity.
pub type UserId = i64;

const EMAIL_MIN_CHARS: usize = 5;
const EMAIL_MAX_CHARS: usize = 254;
const NAME_MAX_CHARS: usize = 100;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// UI language preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
}

impl Language {
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::En => "en",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

/// Account record, also the associate side of workspace membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Normalized alternate key.
    pub email: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub language: Language,
    /// Granted authority names, e.g. `ROLE_USER`.
    #[serde(default)]
    pub authorities: BTreeSet<String>,
}

/// Write model for creating or replacing user profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDraft {
    pub email: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub language: Option<Language>,
}

impl UserDraft {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns a copy with normalized email, validated for persistence.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let email = validate_email(&self.email)?;
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if let Some(value) = name.as_deref() {
            if value.chars().count() > NAME_MAX_CHARS {
                return Err(ValidationError::TooLong {
                    field: "name",
                    max: NAME_MAX_CHARS,
                });
            }
        }
        Ok(Self {
            email,
            name,
            image_url: self.image_url.clone(),
            language: self.language,
        })
    }
}

/// Case-folds an email into its alternate-key form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalizes and validates one email value.
pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let normalized = normalize_email(email);
    let length = normalized.chars().count();
    if !(EMAIL_MIN_CHARS..=EMAIL_MAX_CHARS).contains(&length) || !EMAIL_RE.is_match(&normalized) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(normalized)
}
