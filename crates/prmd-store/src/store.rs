//! The `DocumentStore` trait and the values it exchanges.

use crate::Result;
use async_trait::async_trait;
use std::fmt;

/// Identifier of a document inside a store.
///
/// The format is store specific: `owner/repo#number` for GitHub, a path for
/// the file store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A document as read at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub body: String,
    /// Opaque version token, if the store provides one.
    pub version: Option<String>,
}

impl Snapshot {
    pub fn new(body: impl Into<String>, version: Option<String>) -> Self {
        Self {
            body: body.into(),
            version,
        }
    }

    /// A snapshot with no known version, e.g. taken from an event payload.
    pub fn unversioned(body: impl Into<String>) -> Self {
        Self::new(body, None)
    }
}

/// Read and write access to remote documents.
///
/// Implementations must report [`crate::StoreError::Conflict`] from `write`
/// when `expected_version` is given and no longer matches the stored document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the current document.
    async fn fetch(&self, resource: &ResourceId) -> Result<Snapshot>;

    /// Replace the document body.
    async fn write(
        &self,
        resource: &ResourceId,
        body: &str,
        expected_version: Option<&str>,
    ) -> Result<()>;
}
