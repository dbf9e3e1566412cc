//! Markdown block detection and editing for prmd.
//!
//! This crate owns the text side of the update protocol. It answers two
//! questions about a document and a managed block:
//!
//! - is the block already there, ignoring line endings and trailing whitespace?
//! - if a stale copy is there, what does the document look like without it?
//!
//! Everything here is pure. Fetching and writing documents lives in
//! `prmd-store`, the retry protocol in `prmd-sync`.
//!
//! ```
//! use prmd_text::{Decision, reconcile};
//!
//! let block = "## Checklist\n- [ ] tests";
//! let decision = reconcile("Intro", block);
//! assert_eq!(decision, Decision::Replace("Intro\n\n## Checklist\n- [ ] tests".to_string()));
//!
//! let decision = reconcile("Intro\r\n\r\n## Checklist  \r\n- [ ] tests", block);
//! assert_eq!(decision, Decision::AlreadyPresent);
//! ```

pub mod compose;
pub mod locator;
pub mod normalize;

pub use compose::{Decision, compose_body, reconcile};
pub use locator::{BlockMatch, Removal, find_block, is_present, remove};
pub use normalize::{normalize, normalize_line};
