//! Small text helpers shared by reports.

/// Shortens `text` to at most `length` columns, ending in `...` if cut.
///
/// Plot backends render `...` in roughly the width of one character, so the
/// ellipsis is counted as a single column.
///
/// ```
/// use estimate::text::pretty_truncate;
///
/// assert_eq!(pretty_truncate("short", 10), "short");
/// assert_eq!(pretty_truncate("abcdefgh", 4), "abc...");
/// ```
#[must_use]
pub fn pretty_truncate(text: &str, length: usize) -> String {
    if text.chars().count() <= length {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(length.saturating_sub(1)).collect();
    out.push_str("...");
    out
}
