//! Structural rendering of a page into headings, lists and paragraphs.
//!
//! A page is split into sections on blank lines. Each section is classified
//! by its first non-whitespace characters:
//!
//! | Prefix | Section |
//! |--------|---------|
//! | `# ` | heading level 1 |
//! | `## ` | heading level 2 |
//! | `### ` | heading level 3 |
//! | `* `, `- `, `1. ` | list, one item per non-blank line |
//! | anything else | paragraph, verbatim |

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Section {
    Heading { level: u8, text: String },
    List { items: Vec<String> },
    Paragraph { text: String },
}

pub fn render(chunk: &str) -> Vec<Section> {
    sections(chunk)
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| classify(&s))
        .collect()
}

/// Split on `\n` + optional whitespace + `\n`.
fn sections(chunk: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in chunk.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current.join("\n"));
    }
    out
}

fn classify(section: &str) -> Section {
    let head = section.trim_start();

    for level in (1..=3u8).rev() {
        if let Some(rest) = heading_body(head, level) {
            return Section::Heading {
                level,
                text: rest.trim_end().to_string(),
            };
        }
    }

    if list_marker_len(head).is_some() {
        let items = section
            .lines()
            .map(str::trim_start)
            .filter(|l| !l.is_empty())
            .map(|l| {
                let body = list_marker_len(l).map(|n| &l[n..]).unwrap_or(l);
                body.trim_end().to_string()
            })
            .collect();
        return Section::List { items };
    }

    Section::Paragraph {
        text: section.to_string(),
    }
}

/// Text after `level` hashes and one whitespace character.
fn heading_body(head: &str, level: u8) -> Option<&str> {
    let hashes = head.bytes().take_while(|b| *b == b'#').count();
    if hashes != level as usize {
        return None;
    }
    let rest = &head[hashes..];
    let ws = rest.chars().next().filter(|c| c.is_whitespace())?;
    Some(&rest[ws.len_utf8()..])
}

/// Byte length of a leading `* `, `- ` or `N. ` marker, whitespace included.
fn list_marker_len(line: &str) -> Option<usize> {
    let marker = if line.starts_with(['*', '-']) {
        1
    } else {
        let digits = line.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || !line[digits..].starts_with('.') {
            return None;
        }
        digits + 1
    };
    let ws = line[marker..].chars().next().filter(|c| c.is_whitespace())?;
    Some(marker + ws.len_utf8())
}
