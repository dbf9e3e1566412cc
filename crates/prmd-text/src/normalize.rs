//! Canonical form used for comparing documents and blocks.
//!
//! The normalized form is a search key only. It is never written back to a
//! document except by the fallback path in [`crate::locator::remove`].

/// Normalize text for comparison.
///
/// - `\r\n` and lone `\r` become `\n`
/// - trailing whitespace is stripped from every line
/// - leading and trailing whitespace is stripped from the whole text
///
/// The operation is idempotent.
///
/// # Example
/// ```
/// use prmd_text::normalize;
///
/// assert_eq!(normalize("  a  \r\nb\t\r\n\r\n"), "a\nb");
/// ```
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let lines: Vec<&str> = unified.split('\n').map(str::trim_end).collect();

    lines.join("\n").trim().to_string()
}

/// Normalize a single line.
///
/// Same rules as [`normalize`], so leading indentation is dropped as well.
pub fn normalize_line(line: &str) -> String {
    normalize(line)
}
