//! PDF text extraction.
//!
//! Pages are parsed in order; within a page, text items (non-empty lines)
//! are joined with a single space and each page ends with `\n`.

use std::panic::{catch_unwind, AssertUnwindSafe};

use super::ExtractError;

const CORRUPTED_MESSAGE: &str = "The PDF structure is invalid or the file is corrupted.";

pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    // The font parsers behind pdf-extract may panic on malformed input.
    let pages = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| ExtractError::corrupted(CORRUPTED_MESSAGE, "PDF parser panicked"))?
    .map_err(|e| {
        tracing::warn!(error = %e, "PDF parse failed");
        ExtractError::corrupted(CORRUPTED_MESSAGE, e.to_string())
    })?;

    tracing::debug!(pages = pages.len(), "parsed PDF");

    let text = join_pages(&pages);
    if text.trim().is_empty() {
        return Err(ExtractError::NoExtractableText);
    }
    Ok(text)
}

fn join_pages(pages: &[String]) -> String {
    let mut out = String::new();
    for page in pages {
        let items: Vec<&str> = page
            .lines()
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect();
        out.push_str(&items.join(" "));
        out.push('\n');
    }
    out
}
