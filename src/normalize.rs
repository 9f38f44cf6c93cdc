//! Whitespace- and list-marker-preserving cleanup of extracted text.
//!
//! Applied line by line before pagination:
//!
//! - list lines (`1.`, `-`, `•`, `*` after indentation) keep their
//!   indentation and lose trailing whitespace;
//! - tabular lines (3+ fields separated by runs of 2+ whitespace characters)
//!   get every interior run replaced by exactly four spaces;
//! - everything else is left untouched.

use std::borrow::Cow;

const TABLE_GAP: &str = "    ";

pub fn normalize_text(text: &str) -> String {
    text.split('\n')
        .map(normalize_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_line(line: &str) -> Cow<'_, str> {
    let content = line.trim();
    let leading = &line[..line.len() - line.trim_start().len()];

    if is_list_item(content) {
        return Cow::Owned(format!("{}{}", leading, content));
    }

    if line.contains("  ") {
        let gaps = wide_gaps(content);
        if gaps.len() + 1 > 2 {
            let trailing = &line[line.trim_end().len()..];
            let mut out = String::with_capacity(line.len());
            out.push_str(leading);
            let mut cursor = 0;
            for (start, end) in gaps {
                out.push_str(&content[cursor..start]);
                out.push_str(TABLE_GAP);
                cursor = end;
            }
            out.push_str(&content[cursor..]);
            out.push_str(trailing);
            return Cow::Owned(out);
        }
    }

    Cow::Borrowed(line)
}

fn is_list_item(content: &str) -> bool {
    if content.starts_with(['-', '•', '*']) {
        return true;
    }
    let digits = content.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && content[digits..].starts_with('.')
}

/// Byte ranges of whitespace runs of length >= 2 inside `content`.
fn wide_gaps(content: &str) -> Vec<(usize, usize)> {
    let mut gaps = Vec::new();
    let mut run: Option<(usize, usize)> = None;
    for (i, c) in content.char_indices() {
        if c.is_whitespace() {
            run = match run {
                Some((start, len)) => Some((start, len + 1)),
                None => Some((i, 1)),
            };
        } else if let Some((start, len)) = run.take() {
            if len >= 2 {
                gaps.push((start, i));
            }
        }
    }
    gaps
}
