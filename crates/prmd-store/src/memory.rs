//! In-memory store with scripted failures
//!
//! Every document carries a revision counter that is used as its version.
//! Tests can queue faults for upcoming calls and queue edits by another
//! writer that land just before the next write, which produces a real
//! version conflict.

use crate::{DocumentStore, ResourceId, Result, Snapshot, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Failure to inject into the next fetch or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    NotFound,
    Forbidden,
    Conflict,
    Transient,
}

impl Fault {
    fn into_error(self, resource: &ResourceId) -> StoreError {
        let resource = resource.to_string();
        match self {
            Self::NotFound => StoreError::NotFound { resource },
            Self::Forbidden => StoreError::Forbidden {
                resource,
                message: "injected".into(),
            },
            Self::Conflict => StoreError::Conflict { resource },
            Self::Transient => StoreError::Transient {
                resource,
                message: "injected".into(),
            },
        }
    }
}

#[derive(Debug)]
struct Document {
    body: String,
    revision: u64,
}

impl Document {
    fn version(&self) -> String {
        format!("r{}", self.revision)
    }
}

#[derive(Debug, Default)]
struct State {
    documents: HashMap<ResourceId, Document>,
    fetch_faults: VecDeque<Fault>,
    write_faults: VecDeque<Fault>,
    concurrent_edits: VecDeque<(ResourceId, String)>,
    fetch_calls: usize,
    write_calls: usize,
    written: Vec<String>,
}

/// A [`DocumentStore`] that keeps documents in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one document.
    pub fn with_document(resource: impl Into<ResourceId>, body: impl Into<String>) -> Self {
        let store = Self::new();
        store.insert(resource, body);
        store
    }

    /// Insert or replace a document, bumping its revision.
    pub fn insert(&self, resource: impl Into<ResourceId>, body: impl Into<String>) {
        let mut state = self.lock();
        let resource = resource.into();
        let revision = state
            .documents
            .get(&resource)
            .map_or(1, |doc| doc.revision + 1);
        state.documents.insert(
            resource,
            Document {
                body: body.into(),
                revision,
            },
        );
    }

    /// Current body of a document.
    pub fn body(&self, resource: &ResourceId) -> Option<String> {
        self.lock().documents.get(resource).map(|doc| doc.body.clone())
    }

    /// Fail the next fetch that has no earlier fault queued.
    pub fn push_fetch_fault(&self, fault: Fault) {
        self.lock().fetch_faults.push_back(fault);
    }

    /// Fail the next write that has no earlier fault queued.
    pub fn push_write_fault(&self, fault: Fault) {
        self.lock().write_faults.push_back(fault);
    }

    /// Have another writer replace the document right before the next write.
    pub fn push_concurrent_edit(&self, resource: impl Into<ResourceId>, body: impl Into<String>) {
        self.lock()
            .concurrent_edits
            .push_back((resource.into(), body.into()));
    }

    pub fn fetch_calls(&self) -> usize {
        self.lock().fetch_calls
    }

    pub fn write_calls(&self) -> usize {
        self.lock().write_calls
    }

    /// Bodies of all successful writes, oldest first.
    pub fn written(&self) -> Vec<String> {
        self.lock().written.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, resource: &ResourceId) -> Result<Snapshot> {
        let mut state = self.lock();
        state.fetch_calls += 1;

        if let Some(fault) = state.fetch_faults.pop_front() {
            return Err(fault.into_error(resource));
        }

        state
            .documents
            .get(resource)
            .map(|doc| Snapshot::new(doc.body.clone(), Some(doc.version())))
            .ok_or_else(|| StoreError::NotFound {
                resource: resource.to_string(),
            })
    }

    async fn write(
        &self,
        resource: &ResourceId,
        body: &str,
        expected_version: Option<&str>,
    ) -> Result<()> {
        let mut state = self.lock();
        state.write_calls += 1;

        if let Some((edited, edit)) = state.concurrent_edits.pop_front() {
            if let Some(doc) = state.documents.get_mut(&edited) {
                doc.body = edit;
                doc.revision += 1;
            }
        }

        if let Some(fault) = state.write_faults.pop_front() {
            return Err(fault.into_error(resource));
        }

        let doc = state
            .documents
            .get_mut(resource)
            .ok_or_else(|| StoreError::NotFound {
                resource: resource.to_string(),
            })?;

        if let Some(expected) = expected_version {
            if doc.version() != expected {
                return Err(StoreError::Conflict {
                    resource: resource.to_string(),
                });
            }
        }

        doc.body = body.to_string();
        doc.revision += 1;
        state.written.push(body.to_string());
        Ok(())
    }
}
