//! Document stores for prmd
//!
//! A store reads and writes the text of one remote document, such as a pull
//! request description. Every store reports a version token with each read so
//! that writers can detect concurrent changes.

pub mod checksum;
pub mod error;
pub mod file;
pub mod github;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use file::FileStore;
pub use github::{GitHubStore, PullRequestRef};
pub use memory::{Fault, MemoryStore};
pub use store::{DocumentStore, ResourceId, Snapshot};
