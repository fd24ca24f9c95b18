//! Text utilities
//!
//! Width math uses unicode display width, not byte length, so wide
//! characters in account names and memos render correctly.

use std::borrow::Cow;
use unicode_width::UnicodeWidthStr;

/// Truncate a string to fit within max display width, adding ellipsis if needed.
///
/// Returns `Cow::Borrowed` if no truncation needed (zero allocation).
pub fn truncate_ellipsis(s: &str, max_width: usize) -> Cow<'_, str> {
    let current_width = UnicodeWidthStr::width(s);
    if current_width <= max_width {
        return Cow::Borrowed(s);
    }

    // Need at least 4 chars for "X..." pattern
    if max_width < 4 {
        return Cow::Owned(s.chars().take(max_width).collect());
    }

    let target_width = max_width - 3;
    let mut width = 0;
    let truncated: String = s
        .chars()
        .take_while(|c| {
            let char_width = unicode_width::UnicodeWidthChar::width(*c).unwrap_or(0);
            if width + char_width <= target_width {
                width += char_width;
                true
            } else {
                false
            }
        })
        .collect();

    Cow::Owned(format!("{}...", truncated))
}
