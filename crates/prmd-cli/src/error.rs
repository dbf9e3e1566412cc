//! Error types for prmd-cli

use std::path::PathBuf;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from the reconciliation run
    #[error(transparent)]
    Sync(#[from] prmd_sync::SyncError),

    /// Error from a document store
    #[error(transparent)]
    Store(#[from] prmd_store::StoreError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to read {what} at {path}: {source}")]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse event payload at {path}: {source}")]
    EventParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
