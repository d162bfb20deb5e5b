use serde::{Deserialize, Serialize};

use crate::processor::text::{normalize_whitespace, truncate_chars};

/// Characters of context kept on each side of a match.
pub const EXCERPT_PADDING: usize = 120;

/// Upper bound on excerpt length, in characters.
pub const MAX_EXCERPT_CHARS: usize = 300;

/// Character offsets of a match within its page text, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub start: usize,
    pub end: usize,
}

/// Cuts a whitespace-collapsed window of `EXCERPT_PADDING` characters around
/// the byte span `start..end` of `text`.
///
/// The returned locator is expressed in characters so it stays meaningful
/// outside of Rust's UTF-8 byte indexing.
pub fn clip_excerpt(text: &str, start: usize, end: usize) -> (String, Locator) {
    let char_start = text[..start].chars().count();
    let char_end = char_start + text[start..end].chars().count();

    let window_start = char_start.saturating_sub(EXCERPT_PADDING);
    let window_len = (char_end + EXCERPT_PADDING) - window_start;
    let window: String = text.chars().skip(window_start).take(window_len).collect();

    let excerpt = truncate_chars(&normalize_whitespace(&window), MAX_EXCERPT_CHARS);

    (
        excerpt,
        Locator {
            start: char_start,
            end: char_end,
        },
    )
}
