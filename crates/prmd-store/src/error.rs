//! Error types for prmd-store

use std::path::PathBuf;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors reported by a [`crate::DocumentStore`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {resource}")]
    NotFound { resource: String },

    #[error("Access to {resource} denied: {message}")]
    Forbidden { resource: String, message: String },

    /// The document changed after it was read.
    #[error("Document {resource} was modified concurrently")]
    Conflict { resource: String },

    #[error("Transient failure for {resource}: {message}")]
    Transient { resource: String, message: String },

    /// The remote refused the request for a reason retrying will not fix.
    #[error("Request for {resource} rejected with status {status}: {message}")]
    Rejected {
        resource: String,
        status: u16,
        message: String,
    },

    #[error("Invalid resource identifier '{resource}': {reason}")]
    InvalidResource { resource: String, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn transient(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Only transient failures are worth repeating unchanged.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retriable() {
        assert!(StoreError::transient("a/b#1", "timeout").is_retriable());
        assert!(
            !StoreError::Conflict {
                resource: "a/b#1".into()
            }
            .is_retriable()
        );
        assert!(
            !StoreError::NotFound {
                resource: "a/b#1".into()
            }
            .is_retriable()
        );
    }

    #[test]
    fn test_display_names_resource() {
        let err = StoreError::Forbidden {
            resource: "octo/repo#7".into(),
            message: "Resource not accessible by integration".into(),
        };
        assert_eq!(
            err.to_string(),
            "Access to octo/repo#7 denied: Resource not accessible by integration"
        );
    }
}
