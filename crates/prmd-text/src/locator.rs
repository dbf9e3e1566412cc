//! Locating and removing a managed block inside a document.
//!
//! Blocks carry no markers. A block is found by sliding a window of the
//! block's line count over the document's normalized lines. A document line
//! matches a block line when the two are equal or when the document line
//! contains the block line, which tolerates decoration around the block.
//!
//! The containment rule is a heuristic: a short block line such as `-` or an
//! empty line matches almost anything. The first matching window wins and no
//! other candidate is considered afterwards.

use crate::normalize::{normalize, normalize_line};

/// Position of a block inside a document, in lines.
///
/// Indices are 0-based over `document.split('\n')`; `end_line` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMatch {
    pub start_line: usize,
    pub end_line: usize,
}

impl BlockMatch {
    /// Number of lines covered by the match.
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line
    }
}

/// Result of [`remove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// The block was not present; the document is returned as given.
    Unchanged(String),
    /// The block was cut out of the original lines; formatting elsewhere is kept.
    Excised(String),
    /// The block was only found in the normalized text and was removed there.
    /// Original formatting of the whole document is lost.
    Fallback(String),
}

impl Removal {
    /// The resulting document text.
    pub fn into_body(self) -> String {
        match self {
            Self::Unchanged(body) | Self::Excised(body) | Self::Fallback(body) => body,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Unchanged(body) | Self::Excised(body) | Self::Fallback(body) => body,
        }
    }

    /// Whether anything was removed.
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged(_))
    }
}

/// Checks whether `block` occurs in `document` under normalized comparison.
///
/// # Example
/// ```
/// use prmd_text::is_present;
///
/// assert!(is_present("intro\r\n\r\n**note**   \r\n", "**note**"));
/// assert!(!is_present("intro", "**note**"));
/// ```
pub fn is_present(document: &str, block: &str) -> bool {
    normalize(document).contains(&normalize(block))
}

/// Finds the first line window of `document` that matches `block`.
///
/// Returns `None` when the block has more lines than the document or no
/// window matches line by line.
pub fn find_block(document: &str, block: &str) -> Option<BlockMatch> {
    let doc_lines: Vec<String> = document.split('\n').map(normalize_line).collect();
    let block_lines: Vec<String> = block.split('\n').map(normalize_line).collect();

    let width = block_lines.len();
    if width > doc_lines.len() {
        return None;
    }

    (0..=doc_lines.len() - width)
        .find(|&start| {
            block_lines.iter().enumerate().all(|(offset, wanted)| {
                let line = &doc_lines[start + offset];
                line == wanted || line.contains(wanted.as_str())
            })
        })
        .map(|start| BlockMatch {
            start_line: start,
            end_line: start + width,
        })
}

/// Removes the first occurrence of `block` from `document`.
///
/// When the block is present and a matching line window exists, the window is
/// cut from the original lines together with any blank lines directly after
/// it, and the result is trimmed. When the block is present only across
/// partial lines, it is removed from the normalized document instead.
///
/// # Example
/// ```
/// use prmd_text::remove;
///
/// let removal = remove("A\n\n> old  \n\nB", "> old");
/// assert_eq!(removal.into_body(), "A\n\nB");
/// ```
pub fn remove(document: &str, block: &str) -> Removal {
    let normalized_block = normalize(block);
    if normalized_block.is_empty() {
        return Removal::Unchanged(document.to_string());
    }

    let normalized_document = normalize(document);
    if !normalized_document.contains(&normalized_block) {
        return Removal::Unchanged(document.to_string());
    }

    if let Some(found) = find_block(document, block) {
        tracing::debug!(
            start_line = found.start_line,
            end_line = found.end_line,
            "Found existing block"
        );
        return Removal::Excised(excise(document, found));
    }

    tracing::info!("Using fallback removal for markdown block");
    Removal::Fallback(
        normalized_document
            .replacen(&normalized_block, "", 1)
            .trim()
            .to_string(),
    )
}

/// Cuts `found` out of the original lines and collapses the blank run after it.
fn excise(document: &str, found: BlockMatch) -> String {
    let lines: Vec<&str> = document.split('\n').collect();

    let resume = lines[found.end_line..]
        .iter()
        .position(|line| !line.trim().is_empty())
        .map_or(lines.len(), |skipped| found.end_line + skipped);

    lines[..found.start_line]
        .iter()
        .chain(&lines[resume..])
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_block_first_window_wins() {
        let doc = "x\nblock\ny\nblock";
        let found = find_block(doc, "block").unwrap();
        assert_eq!(found, BlockMatch { start_line: 1, end_line: 2 });
        assert_eq!(found.line_count(), 1);
    }

    #[test]
    fn test_find_block_longer_than_document() {
        assert!(find_block("one", "one\ntwo").is_none());
    }

    #[test]
    fn test_find_block_tolerates_decoration() {
        let doc = "> **Note** please review\nsecond";
        let found = find_block(doc, "**Note**\nsecond").unwrap();
        assert_eq!(found.start_line, 0);
    }

    #[test]
    fn test_excise_skips_following_blank_lines() {
        let doc = "a\nb\n\n  \n\nc";
        let out = excise(doc, BlockMatch { start_line: 1, end_line: 2 });
        assert_eq!(out, "a\nc");
    }

    #[test]
    fn test_excise_at_end() {
        let doc = "a\n\nb\n\n";
        let out = excise(doc, BlockMatch { start_line: 2, end_line: 3 });
        assert_eq!(out, "a");
    }

    #[test]
    fn test_remove_empty_block_is_noop() {
        let removal = remove("a\nb", " \n");
        assert_eq!(removal, Removal::Unchanged("a\nb".to_string()));
    }

    #[test]
    fn test_removal_is_changed() {
        assert!(!Removal::Unchanged(String::new()).is_changed());
        assert!(Removal::Excised(String::new()).is_changed());
        assert!(Removal::Fallback(String::new()).is_changed());
    }
}
