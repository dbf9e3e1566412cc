//! Keeps one markdown block present in a shared document.
//!
//! The [`Reconciler`] reads the document, decides whether the block must be
//! added, and writes the result with the version it read as precondition.
//! When another writer got there first it reads again and decides again,
//! within a fixed retry budget.

pub mod config;
pub mod error;
pub mod reconciler;
pub mod retry;

pub use config::{ConfigFile, SyncConfig};
pub use error::{Result, SyncError};
pub use reconciler::{Reconciler, RunInput, RunOutcome, RunReport};
pub use retry::RetryPolicy;
