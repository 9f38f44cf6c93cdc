//! Upload/extract lifecycle and the in-memory document store.
//!
//! ```text
//! (empty) ──begin_upload──▶ UPLOADING ──start_extracting──▶ EXTRACTING
//!                                                             │
//!                                     finish(Ok) ◀────────────┴──────▶ finish(Err)
//!                                        READY                          FAILED
//!                                          │
//!                                        remove
//!                                          ▼
//!                                       REMOVED
//! ```
//!
//! `FAILED` and `REMOVED` are terminal for that entry, and only a bounded
//! number of terminal entries is retained. A document becomes
//! visible through [`Session::get`] and [`Session::documents`] only in
//! `READY`, so readers never observe partially extracted content.

use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{ExtractionFailure, UploadedDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentState {
    Uploading,
    Extracting,
    Ready,
    Failed,
    Removed,
}

impl DocumentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentState::Uploading => "UPLOADING",
            DocumentState::Extracting => "EXTRACTING",
            DocumentState::Ready => "READY",
            DocumentState::Failed => "FAILED",
            DocumentState::Removed => "REMOVED",
        }
    }
}

impl std::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document {id} cannot go from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: DocumentState,
        to: DocumentState,
    },
}

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub id: String,
    pub name: String,
    pub state: DocumentState,
    pub document: Option<UploadedDocument>,
    pub failure: Option<ExtractionFailure>,
}

impl SessionEntry {
    fn is_terminal(&self) -> bool {
        matches!(self.state, DocumentState::Failed | DocumentState::Removed)
    }
}

/// Terminal (`FAILED`/`REMOVED`) entries kept for inspection by default.
pub const DEFAULT_TERMINAL_RETENTION: usize = 100;

/// Documents of the active user session, keyed by id and kept in upload order.
///
/// Only the most recent `terminal_retention` terminal entries are kept;
/// older ones are dropped as new entries reach a terminal state.
#[derive(Debug)]
pub struct Session {
    entries: HashMap<String, SessionEntry>,
    order: Vec<String>,
    terminal_retention: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_retention(DEFAULT_TERMINAL_RETENTION)
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(terminal_retention: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            terminal_retention,
        }
    }

    /// Register a new upload and return its id.
    pub fn begin_upload(&mut self, name: &str) -> String {
        let id = format!("doc_{}", Uuid::new_v4().simple());
        self.entries.insert(
            id.clone(),
            SessionEntry {
                id: id.clone(),
                name: name.to_string(),
                state: DocumentState::Uploading,
                document: None,
                failure: None,
            },
        );
        self.order.push(id.clone());
        tracing::debug!(id = %id, name, "upload registered");
        id
    }

    pub fn start_extracting(&mut self, id: &str) -> Result<(), SessionError> {
        let entry = self.transition(id, DocumentState::Uploading, DocumentState::Extracting)?;
        entry.state = DocumentState::Extracting;
        Ok(())
    }

    /// Record the extraction result. The stored document takes the entry's id.
    pub fn finish(
        &mut self,
        id: &str,
        result: Result<UploadedDocument, ExtractionFailure>,
    ) -> Result<DocumentState, SessionError> {
        let target = if result.is_ok() {
            DocumentState::Ready
        } else {
            DocumentState::Failed
        };
        let entry = self.transition(id, DocumentState::Extracting, target)?;
        match result {
            Ok(mut document) => {
                document.id = entry.id.clone();
                entry.document = Some(document);
            }
            Err(failure) => entry.failure = Some(failure),
        }
        entry.state = target;
        tracing::info!(id, state = %target, "extraction finished");
        if target == DocumentState::Failed {
            self.prune_terminal();
        }
        Ok(target)
    }

    /// Drop a ready document; its content is released.
    pub fn remove(&mut self, id: &str) -> Result<(), SessionError> {
        let entry = self.transition(id, DocumentState::Ready, DocumentState::Removed)?;
        entry.document = None;
        entry.state = DocumentState::Removed;
        tracing::info!(id, "document removed");
        self.prune_terminal();
        Ok(())
    }

    pub fn state(&self, id: &str) -> Option<DocumentState> {
        self.entries.get(id).map(|e| e.state)
    }

    /// A ready document by id.
    pub fn get(&self, id: &str) -> Option<&UploadedDocument> {
        self.entries
            .get(id)
            .filter(|e| e.state == DocumentState::Ready)
            .and_then(|e| e.document.as_ref())
    }

    /// Ready documents in upload order.
    pub fn documents(&self) -> Vec<&UploadedDocument> {
        self.entries()
            .into_iter()
            .filter(|e| e.state == DocumentState::Ready)
            .filter_map(|e| e.document.as_ref())
            .collect()
    }

    /// Every retained entry in upload order.
    pub fn entries(&self) -> Vec<&SessionEntry> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .collect()
    }

    pub fn failures(&self) -> Vec<&ExtractionFailure> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.failure.as_ref())
            .collect()
    }

    fn transition(
        &mut self,
        id: &str,
        from: DocumentState,
        to: DocumentState,
    ) -> Result<&mut SessionEntry, SessionError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        if entry.state != from {
            return Err(SessionError::InvalidTransition {
                id: id.to_string(),
                from: entry.state,
                to,
            });
        }
        Ok(entry)
    }

    /// Drop the oldest terminal entries beyond the retention bound.
    fn prune_terminal(&mut self) {
        let terminal: Vec<String> = self
            .order
            .iter()
            .filter(|id| self.entries.get(*id).is_some_and(SessionEntry::is_terminal))
            .cloned()
            .collect();
        let excess = terminal.len().saturating_sub(self.terminal_retention);
        if excess == 0 {
            return;
        }
        for id in &terminal[..excess] {
            self.entries.remove(id);
        }
        self.order.retain(|id| self.entries.contains_key(id));
        tracing::debug!(dropped = excess, "pruned terminal session entries");
    }
}
