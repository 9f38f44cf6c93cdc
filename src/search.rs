//! Literal in-document search with wraparound navigation.
//!
//! The user's term is escaped before it reaches the regex engine, so every
//! character is matched literally (`a.b*c` only matches `a.b*c`). Matches
//! are non-overlapping and ordered by position. Offsets are character
//! offsets into the searched text, and each hit carries the 1-based page
//! that holds its first character.

use regex::RegexBuilder;
use serde::Serialize;

use crate::chunk::{page_of, PAGE_CHARS};
use crate::models::SearchMatch;

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub page_chars: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            page_chars: PAGE_CHARS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub matches: Vec<SearchMatch>,
    pub total: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search term is too long")]
    TermTooLong(#[source] regex::Error),
}

pub fn search(text: &str, term: &str, options: &SearchOptions) -> Result<SearchResults, SearchError> {
    if term.is_empty() {
        return Ok(SearchResults::default());
    }

    let re = RegexBuilder::new(&regex::escape(term))
        .case_insensitive(!options.case_sensitive)
        .build()
        .map_err(SearchError::TermTooLong)?;

    let mut matches = Vec::new();
    // Running byte -> char offset conversion; matches arrive in order.
    let mut byte_pos = 0;
    let mut char_pos = 0;
    for m in re.find_iter(text) {
        char_pos += text[byte_pos..m.start()].chars().count();
        byte_pos = m.start();
        matches.push(SearchMatch {
            offset: char_pos,
            page: page_of(char_pos, options.page_chars),
            text: m.as_str().to_string(),
        });
    }

    let total = matches.len();
    tracing::debug!(term_chars = term.chars().count(), total, "search complete");
    Ok(SearchResults { matches, total })
}

/// Navigation state over one set of results.
///
/// A fresh cursor points at the first match. `next` and `previous` wrap
/// around at the ends; after `clear` nothing is highlighted until the
/// next navigation step.
#[derive(Debug, Clone, Default)]
pub struct SearchCursor {
    results: SearchResults,
    current: Option<usize>,
}

impl SearchCursor {
    pub fn new(results: SearchResults) -> Self {
        let current = if results.total > 0 { Some(0) } else { None };
        Self { results, current }
    }

    pub fn results(&self) -> &SearchResults {
        &self.results
    }

    pub fn current(&self) -> Option<&SearchMatch> {
        self.current.and_then(|i| self.results.matches.get(i))
    }

    pub fn next(&mut self) -> Option<&SearchMatch> {
        let total = self.results.total;
        if total == 0 {
            return None;
        }
        self.current = Some(match self.current {
            Some(i) => (i + 1) % total,
            None => 0,
        });
        self.current()
    }

    pub fn previous(&mut self) -> Option<&SearchMatch> {
        let total = self.results.total;
        if total == 0 {
            return None;
        }
        self.current = Some(match self.current {
            Some(0) | None => total - 1,
            Some(i) => i - 1,
        });
        self.current()
    }

    /// `"i/total"` for the highlighted match, `"0 results"` when there are none.
    pub fn position(&self) -> String {
        match (self.results.total, self.current) {
            (0, _) => "0 results".to_string(),
            (total, Some(i)) => format!("{}/{}", i + 1, total),
            (total, None) => format!("0/{}", total),
        }
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
