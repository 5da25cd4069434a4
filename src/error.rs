//! Error types for Pagemark
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are grouped by where they arise (input, lookup, storage, setup) so the
//! web layer can map each group to a status code without inspecting messages.
//!
//! ## Categories
//!
//! - **Input**: malformed ids in a URL, form/JSON shape violations
//! - **Lookup**: a referenced book, genre or session does not exist
//! - **Conflict**: a write that would break a reference (genre still in use)
//! - **Storage**: sqlx driver errors, failed migrations
//! - **Setup**: configuration and file system problems at startup

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias using our TrackerError type
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Field-keyed validation messages
///
/// Keys are field paths as they appear in the submitted form or JSON body
/// (`title`, `pageCount`, `authors.2`). Only the first message per field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field unless one is already present
    pub fn add<K: Into<String>, M: Into<String>>(&mut self, field: K, message: M) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Convert into `Err(TrackerError::Validation)` when any message was recorded
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

/// Main error type for Pagemark
#[derive(Error, Debug)]
pub enum TrackerError {
    // ===== Input Errors =====

    /// A path segment that should be a numeric id is not one
    #[error("Invalid {entity} ID: {raw}")]
    InvalidId {
        /// Display name of the entity ("Book", "Reading session", ...)
        entity: &'static str,
        raw: String,
    },

    /// Submitted data failed shape validation
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// A form was posted with an intent this route does not handle
    #[error("Unknown form intent: {0}")]
    UnknownIntent(String),

    // ===== Lookup Errors =====

    /// Database record not found
    #[error("{entity} not found: {id}")]
    RecordNotFound {
        entity: &'static str,
        id: i64,
    },

    // ===== Conflict Errors =====

    /// Write rejected because other rows still reference the target
    #[error("Conflict: {0}")]
    Conflict(String),

    // ===== Storage Errors =====

    /// Database schema migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database driver error from sqlx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    // ===== Setup Errors =====

    /// Configuration is invalid or incomplete
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Generic file I/O error with context
    #[error("File I/O error: {0}")]
    FileIoError(String),
}

// Helper methods for creating common errors
impl TrackerError {
    /// Create a RecordNotFound error
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        TrackerError::RecordNotFound { entity, id }
    }

    /// Create an InvalidId error from the raw path segment
    pub fn invalid_id<S: Into<String>>(entity: &'static str, raw: S) -> Self {
        TrackerError::InvalidId {
            entity,
            raw: raw.into(),
        }
    }

    /// Create a Validation error holding a single field message
    pub fn field<K: Into<String>, M: Into<String>>(field: K, message: M) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        TrackerError::Validation(errors)
    }

    /// Field errors if this is a validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            TrackerError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TrackerError::RecordNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, TrackerError::Validation(_))
    }

    /// Check if the error was caused by the request rather than the server
    ///
    /// Client errors are reported back verbatim; everything else is logged
    /// and replaced with a generic message.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TrackerError::InvalidId { .. }
                | TrackerError::Validation(_)
                | TrackerError::UnknownIntent(_)
                | TrackerError::RecordNotFound { .. }
                | TrackerError::Conflict(_)
        )
    }

    /// Get user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            TrackerError::InvalidId { entity, .. } => format!("Invalid {} ID", entity),
            TrackerError::RecordNotFound { entity, .. } => format!("{} not found", entity),
            TrackerError::Validation(errors) => {
                if errors.len() == 1 {
                    "Please correct the highlighted field.".to_string()
                } else {
                    format!("Please correct the {} highlighted fields.", errors.len())
                }
            }
            TrackerError::UnknownIntent(intent) => format!("Unsupported form action '{}'", intent),
            TrackerError::Conflict(message) => message.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}
