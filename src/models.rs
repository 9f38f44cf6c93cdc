//! Core data models used throughout SmartDoc.
//!
//! These types represent the files, extracted documents, failures, pages,
//! and search hits that flow through the extraction and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::extract::FailureKind;
use crate::format::DocumentFormat;

/// A binary file handed to the pipeline, with its declared media type.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A document whose text has been fully extracted.
///
/// Only constructed from a successful extraction, so `content` is never
/// partial once a document is visible to the rest of the system.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub id: String,
    pub name: String,
    pub format: DocumentFormat,
    pub content: String,
    /// SHA-256 of the source bytes, lowercase hex.
    pub checksum: String,
    pub extracted_at: DateTime<Utc>,
    pub source: SourceFile,
}

impl UploadedDocument {
    pub fn new(source: SourceFile, format: DocumentFormat, content: String) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&source.bytes);
        let checksum = format!("{:x}", hasher.finalize());

        Self {
            id: format!("doc_{}", Uuid::new_v4().simple()),
            name: source.name.clone(),
            format,
            content,
            checksum,
            extracted_at: Utc::now(),
            source,
        }
    }

    pub fn stats(&self, page_chars: usize) -> DocumentStats {
        DocumentStats::of(&self.content, page_chars)
    }
}

/// A per-file failure recorded by the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionFailure {
    pub name: String,
    pub kind: FailureKind,
    pub message: String,
}

/// One page of normalized text. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
}

/// A literal search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchMatch {
    /// Character offset of the match start in the normalized text.
    pub offset: usize,
    /// 1-based page holding the match start.
    pub page: usize,
    pub text: String,
}

/// Counters shown alongside a document view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub characters: usize,
    pub words: usize,
    pub pages: usize,
}

impl DocumentStats {
    pub fn of(text: &str, page_chars: usize) -> Self {
        Self {
            characters: text.chars().count(),
            words: text.split_whitespace().count(),
            pages: crate::chunk::page_count(text, page_chars),
        }
    }
}
