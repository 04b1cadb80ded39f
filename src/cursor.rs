//! Word-at-cursor extraction for autocomplete callers.

use crate::syntax::token::Span;

/// Span of the whitespace-delimited word touching `cursor`.
///
/// A cursor sitting right after a word belongs to that word. Cursors past
/// the end, or inside a multi-byte character, are moved back to the nearest
/// character boundary.
pub fn word_span_at_cursor(text: &str, cursor: usize) -> Span {
    let mut cursor = cursor.min(text.len());
    while !text.is_char_boundary(cursor) {
        cursor -= 1;
    }

    let start = text[..cursor]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let end = text[cursor..]
        .char_indices()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, _)| cursor + i)
        .unwrap_or(text.len());

    Span::new(start, end)
}

pub fn word_at_cursor(text: &str, cursor: usize) -> &str {
    word_span_at_cursor(text, cursor).slice(text)
}
