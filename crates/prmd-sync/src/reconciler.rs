//! Fetch, decide, write, and retry on conflict.
//!
//! A run is a small state machine:
//!
//! ```text
//! Fetching ──ok──> Deciding ──absent──> Writing ──ok──> Done(Updated)
//!    │ transient       │ present            │ conflict
//!    └─> Fetching      └─> Done             └─> RetryFetch ──> Deciding
//! ```
//!
//! Fetches and writes have separate budgets of `max_retries` attempts each.
//! A re-fetch after a conflict is a single request and belongs to the write
//! budget: when it fails, the next write attempt starts by fetching again.

use crate::{Result, RetryPolicy, SyncConfig, SyncError};
use prmd_store::{DocumentStore, ResourceId, Snapshot};
use prmd_text::{Decision, reconcile};
use std::time::Duration;

/// Input for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInput {
    /// Document to update.
    pub resource: ResourceId,
    /// Event action that triggered the run, e.g. `opened`. Informational only.
    pub trigger_action: Option<String>,
    /// Body known from the triggering event, used when every fetch fails.
    pub cached_body: Option<String>,
}

impl RunInput {
    pub fn new(resource: impl Into<ResourceId>) -> Self {
        Self {
            resource: resource.into(),
            trigger_action: None,
            cached_body: None,
        }
    }

    pub fn with_trigger_action(mut self, action: impl Into<String>) -> Self {
        self.trigger_action = Some(action.into());
        self
    }

    pub fn with_cached_body(mut self, body: impl Into<String>) -> Self {
        self.cached_body = Some(body.into());
        self
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The block was already in the document; nothing was written.
    AlreadyPresent,
    /// A new body was written.
    Updated,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Fetch requests made, including re-fetches after conflicts.
    pub fetch_attempts: u32,
    /// Attempts used from the write budget.
    pub write_attempts: u32,
    /// Delays waited between attempts, in order.
    pub backoff: Vec<Duration>,
    /// Whether the cached body stood in for a failed fetch.
    pub used_cached_body: bool,
    /// The document body as it stands after the run.
    pub body: String,
}

#[derive(Debug)]
enum Phase {
    Fetching { attempt: u32 },
    Deciding(Snapshot),
    Writing {
        candidate: String,
        version: Option<String>,
    },
    RetryFetch,
    Done(RunOutcome),
    Failed(SyncError),
}

#[derive(Debug, Default)]
struct Progress {
    fetch_attempts: u32,
    write_attempts: u32,
    backoff: Vec<Duration>,
    used_cached_body: bool,
    body: String,
}

impl Progress {
    fn finish(self, outcome: RunOutcome) -> RunReport {
        RunReport {
            outcome,
            fetch_attempts: self.fetch_attempts,
            write_attempts: self.write_attempts,
            backoff: self.backoff,
            used_cached_body: self.used_cached_body,
            body: self.body,
        }
    }
}

/// Drives one document towards containing the configured block exactly once.
pub struct Reconciler<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    config: &'a SyncConfig,
    policy: RetryPolicy,
}

impl<'a, S: DocumentStore + ?Sized> Reconciler<'a, S> {
    pub fn new(store: &'a S, config: &'a SyncConfig) -> Self {
        Self {
            store,
            config,
            policy: config.retry_policy(),
        }
    }

    /// Run the protocol against `input.resource`.
    ///
    /// # Errors
    /// - [`SyncError::Configuration`] before any request if the config is invalid
    /// - [`SyncError::NotFound`] / [`SyncError::PermissionDenied`] without retrying
    /// - [`SyncError::FetchExhausted`] if every fetch failed and no cached body exists
    /// - [`SyncError::WriteExhausted`] if the write budget ran out
    pub async fn run(&self, input: &RunInput) -> Result<RunReport> {
        self.config.validate()?;

        tracing::info!(
            resource = %input.resource,
            action = input.trigger_action.as_deref().unwrap_or("-"),
            "Reconciling markdown block"
        );

        let mut progress = Progress::default();
        let mut phase = Phase::Fetching { attempt: 1 };

        loop {
            phase = match phase {
                Phase::Fetching { attempt } => self.fetch(input, attempt, &mut progress).await,
                Phase::Deciding(snapshot) => self.decide(snapshot, &mut progress),
                Phase::Writing { candidate, version } => {
                    self.write(input, candidate, version, &mut progress).await
                }
                Phase::RetryFetch => self.refetch(input, &mut progress).await,
                Phase::Done(outcome) => return Ok(progress.finish(outcome)),
                Phase::Failed(err) => return Err(err),
            };
        }
    }

    async fn fetch(&self, input: &RunInput, attempt: u32, progress: &mut Progress) -> Phase {
        progress.fetch_attempts += 1;
        tracing::info!(
            "Fetching document (attempt {}/{})",
            attempt,
            self.policy.max_attempts
        );

        let err = match self.store.fetch(&input.resource).await {
            Ok(snapshot) => return Phase::Deciding(snapshot),
            Err(err) if err.is_retriable() => err,
            Err(err) => return Phase::Failed(SyncError::fatal(&input.resource, err)),
        };

        if self.policy.allows_retry_after(attempt) {
            tracing::warn!("Fetch attempt {} failed: {}. Retrying...", attempt, err);
            self.back_off(attempt, progress).await;
            return Phase::Fetching {
                attempt: attempt + 1,
            };
        }

        tracing::error!("Failed to fetch document after {} attempts: {}", attempt, err);
        match &input.cached_body {
            Some(cached) => {
                tracing::warn!("Falling back to the body from the triggering event");
                progress.used_cached_body = true;
                Phase::Deciding(Snapshot::unversioned(cached.clone()))
            }
            None => Phase::Failed(SyncError::FetchExhausted {
                resource: input.resource.to_string(),
                attempts: attempt,
                source: err,
            }),
        }
    }

    fn decide(&self, snapshot: Snapshot, progress: &mut Progress) -> Phase {
        match reconcile(&snapshot.body, &self.config.block) {
            Decision::AlreadyPresent => {
                tracing::info!("Markdown block is already present; nothing to write");
                progress.body = snapshot.body;
                Phase::Done(RunOutcome::AlreadyPresent)
            }
            Decision::Replace(candidate) => Phase::Writing {
                candidate,
                version: snapshot.version,
            },
        }
    }

    async fn write(
        &self,
        input: &RunInput,
        candidate: String,
        version: Option<String>,
        progress: &mut Progress,
    ) -> Phase {
        progress.write_attempts += 1;
        let attempt = progress.write_attempts;
        tracing::info!(
            "Updating document (attempt {}/{})",
            attempt,
            self.policy.max_attempts
        );

        let result = self
            .store
            .write(&input.resource, &candidate, version.as_deref())
            .await;

        let err = match result {
            Ok(()) => {
                tracing::info!("Document updated");
                progress.body = candidate;
                return Phase::Done(RunOutcome::Updated);
            }
            Err(err) if err.is_conflict() || err.is_retriable() => err,
            Err(err) => return Phase::Failed(SyncError::fatal(&input.resource, err)),
        };

        if !self.policy.allows_retry_after(attempt) {
            tracing::error!("Failed to update document after {} attempts: {}", attempt, err);
            return Phase::Failed(SyncError::WriteExhausted {
                resource: input.resource.to_string(),
                attempts: attempt,
                source: err,
            });
        }

        self.back_off(attempt, progress).await;

        if err.is_conflict() {
            tracing::warn!("Concurrent modification detected; fetching the latest body");
            Phase::RetryFetch
        } else {
            tracing::warn!("Update attempt {} failed: {}. Retrying...", attempt, err);
            Phase::Writing { candidate, version }
        }
    }

    async fn refetch(&self, input: &RunInput, progress: &mut Progress) -> Phase {
        progress.fetch_attempts += 1;

        let err = match self.store.fetch(&input.resource).await {
            Ok(snapshot) => return Phase::Deciding(snapshot),
            Err(err) if err.is_retriable() => err,
            Err(err) => return Phase::Failed(SyncError::fatal(&input.resource, err)),
        };

        progress.write_attempts += 1;
        let attempt = progress.write_attempts;

        if !self.policy.allows_retry_after(attempt) {
            tracing::error!("Failed to fetch the latest body during retry: {}", err);
            return Phase::Failed(SyncError::WriteExhausted {
                resource: input.resource.to_string(),
                attempts: attempt,
                source: err,
            });
        }

        tracing::warn!("Failed to fetch the latest body during retry: {}", err);
        self.back_off(attempt, progress).await;
        Phase::RetryFetch
    }

    async fn back_off(&self, attempt: u32, progress: &mut Progress) {
        let delay = self.policy.delay_after(attempt);
        tracing::debug!(?delay, attempt, "Backing off");
        progress.backoff.push(delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
