//! Error types for prmd-sync

use prmd_store::{ResourceId, StoreError};
use std::path::PathBuf;

/// Result type for prmd-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that end a run
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Invalid or missing configuration, detected before any I/O
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigParse {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("Unsupported config format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Document {resource} does not exist")]
    NotFound { resource: String },

    #[error("Permission denied for {resource}: {message}")]
    PermissionDenied { resource: String, message: String },

    /// A store failure that retrying cannot fix
    #[error("Update of {resource} failed: {source}")]
    Store {
        resource: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to fetch {resource} after {attempts} attempts: {source}")]
    FetchExhausted {
        resource: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("Failed to update {resource} after {attempts} attempts: {source}")]
    WriteExhausted {
        resource: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Escalate a non-retriable store error.
    pub(crate) fn fatal(resource: &ResourceId, source: StoreError) -> Self {
        let resource = resource.to_string();
        match source {
            StoreError::NotFound { .. } => Self::NotFound { resource },
            StoreError::Forbidden { message, .. } => Self::PermissionDenied { resource, message },
            source => Self::Store { resource, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_distinguishes_not_found_and_forbidden() {
        let id = ResourceId::new("o/r#3");

        let err = SyncError::fatal(
            &id,
            StoreError::NotFound {
                resource: id.to_string(),
            },
        );
        assert_eq!(err.to_string(), "Document o/r#3 does not exist");

        let err = SyncError::fatal(
            &id,
            StoreError::Forbidden {
                resource: id.to_string(),
                message: "Bad credentials".into(),
            },
        );
        assert_eq!(err.to_string(), "Permission denied for o/r#3: Bad credentials");
    }

    #[test]
    fn test_fatal_wraps_other_errors() {
        let id = ResourceId::new("o/r#3");
        let err = SyncError::fatal(
            &id,
            StoreError::Rejected {
                resource: id.to_string(),
                status: 422,
                message: "Validation Failed".into(),
            },
        );
        assert!(matches!(err, SyncError::Store { .. }));
    }
}
