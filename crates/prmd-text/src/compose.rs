//! Building the document body that should be written.

use crate::locator::{is_present, remove};

/// What to do with a document given the managed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The block is already in the document; nothing to write.
    AlreadyPresent,
    /// Write this body.
    Replace(String),
}

/// Appends `block` to an edited document, separated by one blank line.
///
/// An empty `edited` yields the block alone.
///
/// # Example
/// ```
/// use prmd_text::compose_body;
///
/// assert_eq!(compose_body("A\nB\n", "block"), "A\nB\n\nblock");
/// assert_eq!(compose_body("", "block"), "block");
/// ```
pub fn compose_body(edited: &str, block: &str) -> String {
    if edited.is_empty() {
        block.to_string()
    } else {
        format!("{}\n\n{}", edited.trim(), block)
    }
}

/// Decides the new body for `document`.
///
/// Returns [`Decision::AlreadyPresent`] when the block is already there.
/// Otherwise any stale copy is removed and the block is appended at the end.
pub fn reconcile(document: &str, block: &str) -> Decision {
    if is_present(document, block) {
        return Decision::AlreadyPresent;
    }

    let edited = remove(document, block).into_body();

    Decision::Replace(compose_body(&edited, block))
}
