//! Fixed-size pagination of normalized text.
//!
//! Splits text into [`TextChunk`]s of exactly `page_chars` characters
//! (the last one may be shorter). Boundaries fall on character positions,
//! not bytes, so multi-byte text is never split inside a code point.
//! Concatenating every chunk in order reproduces the input exactly.

use crate::models::TextChunk;

/// Characters per page.
pub const PAGE_CHARS: usize = 5000;

/// Split text into pages with contiguous 1-based indices.
/// Empty text has no pages.
pub fn paginate(text: &str, page_chars: usize) -> Vec<TextChunk> {
    let page_chars = page_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (offset, _) in text.char_indices() {
        if count == page_chars {
            chunks.push(make_chunk(chunks.len() + 1, &text[start..offset]));
            start = offset;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(make_chunk(chunks.len() + 1, &text[start..]));
    }

    chunks
}

/// Text of page `n` (1-based): characters `(n-1)*page_chars .. n*page_chars`.
/// Returns `None` for `n == 0` or a page past the end.
pub fn page(text: &str, n: usize, page_chars: usize) -> Option<&str> {
    if n == 0 {
        return None;
    }
    let page_chars = page_chars.max(1);
    let first_char = (n - 1).checked_mul(page_chars)?;
    let (start, _) = text.char_indices().nth(first_char)?;
    let rest = &text[start..];
    let end = rest
        .char_indices()
        .nth(page_chars)
        .map(|(i, _)| start + i)
        .unwrap_or(text.len());
    Some(&text[start..end])
}

/// Number of pages shown for the text; an empty document still shows one.
pub fn page_count(text: &str, page_chars: usize) -> usize {
    let page_chars = page_chars.max(1);
    text.chars().count().div_ceil(page_chars).max(1)
}

/// 1-based page holding the character at `char_offset`.
pub fn page_of(char_offset: usize, page_chars: usize) -> usize {
    char_offset / page_chars.max(1) + 1
}

fn make_chunk(index: usize, text: &str) -> TextChunk {
    TextChunk {
        index,
        text: text.to_string(),
    }
}
