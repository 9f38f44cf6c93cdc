//! CLI command implementations.
//!
//! Each `run_*` function backs one `smartdoc` subcommand. Results go to
//! stdout; logs and progress go to stderr.

use anyhow::{bail, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::chunk;
use crate::config::Config;
use crate::extract::{create_engine, Extractor};
use crate::format::DocumentFormat;
use crate::ingest::{self, BatchError, BatchOptions, FileResult};
use crate::models::{DocumentStats, ExtractionFailure, UploadedDocument};
use crate::progress::ProgressMode;
use crate::search::{self, SearchCursor, SearchOptions};
use crate::structure::{self, Section};

/// Characters of context printed on each side of a search hit.
const SNIPPET_CONTEXT: usize = 30;

fn extractor(config: &Config) -> Extractor {
    Extractor::new(create_engine(&config.ocr))
}

/// Extract a single file, failing the command if extraction fails.
pub async fn load_document(config: &Config, path: &Path) -> Result<UploadedDocument> {
    let file = match ingest::read_source(path).await {
        Ok(file) => file,
        Err(e) => bail!("{}: {}", path.display(), e),
    };
    match ingest::extract_one(file, &config.limits, &extractor(config)).await {
        Ok(doc) => Ok(doc),
        Err(failure) => bail!("{}: {} ({})", failure.name, failure.message, failure.kind),
    }
}

// ============ extract ============

#[derive(Serialize)]
struct ExtractedDocument<'a> {
    id: &'a str,
    name: &'a str,
    format: &'a DocumentFormat,
    checksum: &'a str,
    stats: DocumentStats,
    content: &'a str,
}

#[derive(Serialize)]
struct ExtractReport<'a> {
    documents: Vec<ExtractedDocument<'a>>,
    failures: Vec<&'a ExtractionFailure>,
}

/// Extract every file; per-file failures are reported, not fatal.
pub async fn run_extract(
    config: &Config,
    paths: &[PathBuf],
    json: bool,
    concurrency: Option<usize>,
    progress: ProgressMode,
) -> Result<()> {
    let mut options = BatchOptions::from_limits(&config.limits);
    if let Some(n) = concurrency {
        if n == 0 {
            bail!("--concurrency must be >= 1");
        }
        options.concurrency = n;
    }
    if paths.len() > options.max_files {
        return Err(BatchError::TooManyFiles {
            count: paths.len(),
            max: options.max_files,
        }
        .into());
    }

    // Unreadable files keep their slot so output follows argument order.
    let mut slots: Vec<Option<FileResult>> = Vec::with_capacity(paths.len());
    let mut files = Vec::new();
    let mut positions = Vec::new();
    for (i, path) in paths.iter().enumerate() {
        match ingest::read_source(path).await {
            Ok(file) => {
                files.push(file);
                positions.push(i);
                slots.push(None);
            }
            Err(e) => slots.push(Some(Err(ingest::failure_for(
                &path.display().to_string(),
                e,
            )))),
        }
    }

    let reporter = progress.reporter();
    let results = ingest::extract_batch_results(
        files,
        &options,
        &config.limits,
        &extractor(config),
        reporter.as_ref(),
    )
    .await?;
    for (pos, result) in positions.into_iter().zip(results) {
        slots[pos] = Some(result);
    }
    let results: Vec<FileResult> = slots.into_iter().flatten().collect();

    let page_chars = config.chunking.page_chars;
    let report = ExtractReport {
        documents: results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|d| ExtractedDocument {
                id: &d.id,
                name: &d.name,
                format: &d.format,
                checksum: &d.checksum,
                stats: d.stats(page_chars),
                content: &d.content,
            })
            .collect(),
        failures: results.iter().filter_map(|r| r.as_ref().err()).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for result in &results {
        match result {
            Ok(doc) => {
                let stats = doc.stats(page_chars);
                println!(
                    "ok    {}  ({}, {} chars, {} words, {} pages)",
                    doc.name, doc.format, stats.characters, stats.words, stats.pages
                );
            }
            Err(failure) => {
                println!("fail  {}  [{}] {}", failure.name, failure.kind, failure.message);
            }
        }
    }
    println!();
    println!(
        "Extracted {} of {} files.",
        report.documents.len(),
        results.len()
    );
    Ok(())
}

// ============ page ============

/// Print one normalized page, or its rendered structure.
pub async fn run_page(config: &Config, path: &Path, n: usize, render: bool) -> Result<()> {
    let doc = load_document(config, path).await?;
    let page_chars = config.chunking.page_chars;
    let pages = chunk::page_count(&doc.content, page_chars);

    let text = match chunk::page(&doc.content, n, page_chars) {
        Some(text) => text,
        None if n == 1 && doc.content.is_empty() => "",
        None => bail!("page {} out of range (document has {} pages)", n, pages),
    };

    println!("Page {} of {}", n, pages);
    println!();
    if !render {
        println!("{}", text);
        return Ok(());
    }

    for section in structure::render(text) {
        match section {
            Section::Heading { level, text } => {
                println!("{} {}", "#".repeat(level as usize), text)
            }
            Section::List { items } => {
                for item in items {
                    println!("  • {}", item);
                }
            }
            Section::Paragraph { text } => println!("{}", text),
        }
        println!();
    }
    Ok(())
}

// ============ search ============

pub async fn run_search(
    config: &Config,
    path: &Path,
    term: &str,
    case_sensitive: bool,
) -> Result<()> {
    let doc = load_document(config, path).await?;
    let options = SearchOptions {
        case_sensitive,
        page_chars: config.chunking.page_chars,
    };
    let results = search::search(&doc.content, term, &options)?;
    let mut cursor = SearchCursor::new(results);

    if cursor.results().total == 0 {
        println!("{}", cursor.position());
        return Ok(());
    }

    let chars: Vec<char> = doc.content.chars().collect();
    for _ in 0..cursor.results().total {
        if let Some(m) = cursor.current() {
            println!(
                "[{}] page {}, offset {}: {}",
                cursor.position(),
                m.page,
                m.offset,
                snippet(&chars, m.offset, m.text.chars().count())
            );
        }
        cursor.next();
    }
    Ok(())
}

fn snippet(chars: &[char], offset: usize, len: usize) -> String {
    let start = offset.saturating_sub(SNIPPET_CONTEXT);
    let end = (offset + len + SNIPPET_CONTEXT).min(chars.len());
    chars[start..end]
        .iter()
        .map(|c| if c.is_whitespace() { ' ' } else { *c })
        .collect()
}

// ============ stats ============

pub async fn run_stats(config: &Config, path: &Path) -> Result<()> {
    let doc = load_document(config, path).await?;
    let stats = doc.stats(config.chunking.page_chars);
    println!("Document:    {}", doc.name);
    println!("Format:      {}", doc.format);
    println!("Characters:  {}", stats.characters);
    println!("Words:       {}", stats.words);
    println!("Pages:       {}", stats.pages);
    Ok(())
}
