//! Unified error type for the census service.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants follow the
//! failure classes the service distinguishes: connectivity, validation, not-found and
//! permission. The HTTP layer maps them onto status codes in `http::response`.

use sea_orm::DbErr;
use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// The database was unreachable or rejected the operation
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A form payload failed validation
    #[error("Validation failed: {message}")]
    Validation {
        /// Human-readable reason, naming the offending field
        message: String,
    },

    /// Reference-data text was not a JSON array
    #[error("Invalid JSON: {message}")]
    InvalidJson {
        /// Parser message
        message: String,
    },

    /// One element of a bulk import broke the shape contract; nothing was written
    #[error("Import rejected at index {index}: {message}")]
    ImportRejected {
        /// Zero-based index of the offending element
        index: usize,
        /// Which field was missing or malformed
        message: String,
    },

    /// A referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Collection name, e.g. `"school"`
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The signed-in user's role lacks the named section permission
    #[error("Permission denied: {permission}")]
    PermissionDenied {
        /// Permission that was required
        permission: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether resubmitting the same request may succeed.
    ///
    /// Only lost or unavailable database connections qualify. Query and
    /// constraint failures would fail the same way again. Nothing is retried
    /// automatically.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
