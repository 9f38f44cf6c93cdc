//! Batch extraction orchestration.
//!
//! Coordinates the per-file flow: admission → format dispatch → extraction
//! → normalization → [`UploadedDocument`]. Each file is processed
//! independently; one failure is recorded as an [`ExtractionFailure`] and
//! never aborts the rest of the batch.
//!
//! Files are driven through a bounded `buffer_unordered` stream. Every
//! task returns its own indexed result to the single coordinating loop,
//! which reports progress as results arrive and restores input order at
//! the end. With a concurrency of 1 the batch is strictly sequential.

use futures::stream::{self, StreamExt};
use std::path::Path;

use crate::config::LimitsConfig;
use crate::extract::{ExtractError, Extractor};
use crate::format;
use crate::models::{ExtractionFailure, SourceFile, UploadedDocument};
use crate::normalize::normalize_text;
use crate::progress::{percent, ProgressEvent, ProgressReporter};

/// Result of one file in a batch.
pub type FileResult = Result<UploadedDocument, ExtractionFailure>;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub max_files: usize,
    pub concurrency: usize,
}

impl BatchOptions {
    pub fn from_limits(limits: &LimitsConfig) -> Self {
        Self {
            max_files: limits.max_batch_files,
            concurrency: limits.concurrency,
        }
    }

    /// Bound for flows that take exactly one document.
    pub fn single() -> Self {
        Self {
            max_files: 1,
            concurrency: 1,
        }
    }
}

/// Successful documents and per-file failures, both in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub documents: Vec<UploadedDocument>,
    pub failures: Vec<ExtractionFailure>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("Maximum {max} files allowed (got {count})")]
    TooManyFiles { count: usize, max: usize },
}

/// Extract every file in the batch.
pub async fn extract_batch(
    files: Vec<SourceFile>,
    options: &BatchOptions,
    limits: &LimitsConfig,
    extractor: &Extractor,
    progress: &dyn ProgressReporter,
) -> Result<BatchOutcome, BatchError> {
    let results = extract_batch_results(files, options, limits, extractor, progress).await?;
    let mut outcome = BatchOutcome::default();
    for result in results {
        match result {
            Ok(document) => outcome.documents.push(document),
            Err(failure) => outcome.failures.push(failure),
        }
    }
    Ok(outcome)
}

/// Like [`extract_batch`], keeping one result per input file at its position.
pub async fn extract_batch_results(
    files: Vec<SourceFile>,
    options: &BatchOptions,
    limits: &LimitsConfig,
    extractor: &Extractor,
    progress: &dyn ProgressReporter,
) -> Result<Vec<FileResult>, BatchError> {
    let total = files.len();
    if total > options.max_files {
        tracing::warn!(count = total, max = options.max_files, "batch rejected");
        return Err(BatchError::TooManyFiles {
            count: total,
            max: options.max_files,
        });
    }
    if total == 0 {
        return Ok(Vec::new());
    }

    tracing::info!(files = total, concurrency = options.concurrency, "batch started");
    progress.report(ProgressEvent::Started { total });

    let mut indexed: Vec<(usize, FileResult)> = Vec::with_capacity(total);
    let mut tasks = stream::iter(files.into_iter().enumerate())
        .map(|(i, file)| async move { (i, extract_one(file, limits, extractor).await) })
        .buffer_unordered(options.concurrency.max(1));

    while let Some((i, result)) = tasks.next().await {
        let (name, succeeded) = match &result {
            Ok(doc) => (doc.name.clone(), true),
            Err(failure) => (failure.name.clone(), false),
        };
        indexed.push((i, result));
        let completed = indexed.len();
        progress.report(ProgressEvent::FileDone {
            name,
            succeeded,
            completed,
            total,
            percent: percent(completed, total),
        });
    }

    indexed.sort_by_key(|(i, _)| *i);
    let results: Vec<FileResult> = indexed.into_iter().map(|(_, r)| r).collect();
    let failed = results.iter().filter(|r| r.is_err()).count();
    tracing::info!(
        files = total,
        succeeded = total - failed,
        failed,
        "batch finished"
    );
    Ok(results)
}

/// Single-document flow: admit, extract and normalize one file.
pub async fn extract_one(
    file: SourceFile,
    limits: &LimitsConfig,
    extractor: &Extractor,
) -> FileResult {
    let result = match format::admit(&file, limits) {
        Ok(format) => {
            let extracted = extractor.extract(&format, &file.bytes).await;
            extracted.map(|text| (format, text))
        }
        Err(e) => Err(e),
    };

    match result {
        Ok((format, text)) => {
            let content = normalize_text(&text);
            tracing::info!(
                file = %file.name,
                format = %format,
                chars = content.chars().count(),
                "extracted"
            );
            Ok(UploadedDocument::new(file, format, content))
        }
        Err(e) => Err(failure_for(&file.name, e)),
    }
}

/// Read a file from disk as a [`SourceFile`], guessing its media type
/// from the extension.
pub async fn read_source(path: &Path) -> Result<SourceFile, ExtractError> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile::new(name, format::guess_media_type(path), bytes))
}

/// Convert an extractor error into the per-file failure record.
pub fn failure_for(name: &str, error: ExtractError) -> ExtractionFailure {
    tracing::warn!(
        file = name,
        kind = %error.kind(),
        error = %error,
        detail = error.detail().unwrap_or_default(),
        "extraction failed"
    );
    ExtractionFailure {
        name: name.to_string(),
        kind: error.kind(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ocr::tests::ScriptedOcr;
    use crate::extract::FailureKind;
    use crate::format::{MIME_PDF, MIME_PNG, MIME_TEXT};
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressReporter for Recorder {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl Recorder {
        fn percents(&self) -> Vec<u8> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    ProgressEvent::FileDone { percent, .. } => Some(*percent),
                    _ => None,
                })
                .collect()
        }
    }

    fn text_file(name: &str, body: &str) -> SourceFile {
        SourceFile::new(name, MIME_TEXT, body.as_bytes().to_vec())
    }

    fn extractor() -> Extractor {
        Extractor::new(Arc::new(ScriptedOcr::ok("scanned words")))
    }

    fn options(max_files: usize, concurrency: usize) -> BatchOptions {
        BatchOptions {
            max_files,
            concurrency,
        }
    }

    #[tokio::test]
    async fn corrupted_file_does_not_abort_batch() {
        let files = vec![
            text_file("one.txt", "first"),
            SourceFile::new("two.pdf", MIME_PDF, b"%PDF-broken".to_vec()),
            text_file("three.txt", "third"),
        ];
        let progress = Recorder::default();
        let outcome = extract_batch(
            files,
            &options(10, 1),
            &LimitsConfig::default(),
            &extractor(),
            &progress,
        )
        .await
        .unwrap();

        let names: Vec<&str> = outcome.documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["one.txt", "three.txt"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].name, "two.pdf");
        assert_eq!(outcome.failures[0].kind, FailureKind::CorruptedFile);
        assert_eq!(progress.percents(), vec![33, 67, 100]);
    }

    #[tokio::test]
    async fn too_many_files_rejected_before_work() {
        let files: Vec<SourceFile> = (0..3).map(|i| text_file(&format!("{i}.txt"), "x")).collect();
        let progress = Recorder::default();
        let err = extract_batch(
            files,
            &options(2, 1),
            &LimitsConfig::default(),
            &extractor(),
            &progress,
        )
        .await
        .unwrap_err();
        assert_eq!(err, BatchError::TooManyFiles { count: 3, max: 2 });
        assert!(progress.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_batch_is_empty_outcome() {
        let outcome = extract_batch(
            Vec::new(),
            &options(10, 1),
            &LimitsConfig::default(),
            &extractor(),
            &Recorder::default(),
        )
        .await
        .unwrap();
        assert!(outcome.documents.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn concurrent_batch_keeps_input_order_and_monotonic_progress() {
        let files: Vec<SourceFile> = (0..8)
            .map(|i| text_file(&format!("f{i}.txt"), &"word ".repeat(1 + i * 500)))
            .collect();
        let progress = Recorder::default();
        let results = extract_batch_results(
            files,
            &options(10, 4),
            &LimitsConfig::default(),
            &extractor(),
            &progress,
        )
        .await
        .unwrap();

        let names: Vec<String> = results
            .iter()
            .map(|r| r.as_ref().unwrap().name.clone())
            .collect();
        let expected: Vec<String> = (0..8).map(|i| format!("f{i}.txt")).collect();
        assert_eq!(names, expected);

        let percents = progress.percents();
        assert_eq!(percents.len(), 8);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last(), Some(&100));
    }

    #[tokio::test]
    async fn admission_failures_are_recorded() {
        let limits = LimitsConfig {
            max_file_bytes: 4,
            ..LimitsConfig::default()
        };
        let files = vec![
            text_file("big.txt", "too many bytes"),
            SourceFile::new("data.bin", "application/zip", vec![0, 1]),
        ];
        let outcome = extract_batch(files, &options(10, 1), &limits, &extractor(), &Recorder::default())
            .await
            .unwrap();
        let kinds: Vec<FailureKind> = outcome.failures.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FailureKind::FileTooLarge, FailureKind::UnsupportedFormat]);
        assert_eq!(outcome.failures[1].message, "Unsupported file type: application/zip");
    }

    #[tokio::test]
    async fn images_go_through_ocr_and_release_worker() {
        let engine = Arc::new(ScriptedOcr::ok("scanned words"));
        let live = engine.live.clone();
        let extractor = Extractor::new(engine);
        let doc = extract_one(
            SourceFile::new("scan.png", MIME_PNG, b"\x89PNG".to_vec()),
            &LimitsConfig::default(),
            &extractor,
        )
        .await
        .unwrap();
        assert_eq!(doc.content, "scanned words");
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn content_is_normalized() {
        let doc = extract_one(
            text_file("t.txt", "  - item   \nA  B  C"),
            &LimitsConfig::default(),
            &extractor(),
        )
        .await
        .unwrap();
        assert_eq!(doc.content, "  - item\nA    B    C");
    }

    #[tokio::test]
    async fn read_source_guesses_type_and_reports_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        let file = read_source(&path).await.unwrap();
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.media_type, MIME_TEXT);

        let err = read_source(&dir.path().join("missing.pdf")).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::IoError);
    }
}
