//! # SmartDoc
//!
//! Multi-format document text extraction, pagination and literal search,
//! with a thin gateway to a generative-AI API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌───────────┐
//! │  Format  │──▶│ Extract  │──▶│ Normalize  │──▶│ Paginate  │
//! │ Detector │   │ PDF/DOCX │   │            │   │ Structure │
//! └──────────┘   │ OCR/Text │   └────────────┘   │  Search   │
//!                └──────────┘                    └─────┬─────┘
//!                                                      │
//!                            ┌─────────────────────────┤
//!                            ▼                         ▼
//!                       ┌──────────┐             ┌──────────┐
//!                       │   CLI    │             │   HTTP   │──▶ AI gateway
//!                       │(smartdoc)│             │  (axum)  │
//!                       └──────────┘             └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`format`] | Media type detection and admission |
//! | [`extract`] | PDF, DOCX, OCR and plain-text extractors |
//! | [`ingest`] | Batch extraction orchestration |
//! | [`progress`] | Batch progress reporting |
//! | [`normalize`] | Whitespace and list cleanup |
//! | [`chunk`] | Fixed-size pagination |
//! | [`structure`] | Heading/list/paragraph rendering |
//! | [`search`] | Literal search and result navigation |
//! | [`session`] | Upload lifecycle and document store |
//! | [`gateway`] | Generative-AI tasks |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI command implementations |

pub mod chunk;
pub mod commands;
pub mod config;
pub mod extract;
pub mod format;
pub mod gateway;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod search;
pub mod server;
pub mod session;
pub mod structure;
