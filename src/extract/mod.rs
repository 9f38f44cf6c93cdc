//! Multi-format text extraction for binary documents (PDF, DOCX, images, plain text).
//!
//! Callers supply bytes plus the [`DocumentFormat`] chosen by
//! [`crate::format::admit`]; this module returns plain UTF-8 text or a
//! classified [`ExtractError`]. No extractor panics or leaks an unclassified
//! error: every failure maps onto a [`FailureKind`].
//!
//! CPU-bound parsers (PDF, DOCX) run on the blocking thread pool; OCR runs
//! through an [`OcrEngine`] whose workers are scoped to a single call.

pub mod docx;
pub mod ocr;
pub mod pdf;
pub mod text;

use serde::Serialize;
use std::sync::Arc;

use crate::format::DocumentFormat;

pub use ocr::{create_engine, OcrEngine, OcrWorker};

/// Stable failure classification reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    UnsupportedFormat,
    FileTooLarge,
    CorruptedFile,
    NoExtractableText,
    OcrFailure,
    IoError,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            FailureKind::FileTooLarge => "FILE_TOO_LARGE",
            FailureKind::CorruptedFile => "CORRUPTED_FILE",
            FailureKind::NoExtractableText => "NO_EXTRACTABLE_TEXT",
            FailureKind::OcrFailure => "OCR_FAILURE",
            FailureKind::IoError => "IO_ERROR",
            FailureKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction error. `Display` is the human-readable message; `detail`
/// fields keep the underlying cause for logs.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("File size exceeds {} limit", size_label(.limit))]
    FileTooLarge { size: u64, limit: u64 },

    #[error("{message}")]
    Corrupted { message: String, detail: String },

    #[error("No extractable text found. This might be a scanned image PDF.")]
    NoExtractableText,

    #[error("Failed to extract text from image")]
    Ocr { detail: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to extract text: {0}")]
    Unknown(String),
}

impl ExtractError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractError::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
            ExtractError::FileTooLarge { .. } => FailureKind::FileTooLarge,
            ExtractError::Corrupted { .. } => FailureKind::CorruptedFile,
            ExtractError::NoExtractableText => FailureKind::NoExtractableText,
            ExtractError::Ocr { .. } => FailureKind::OcrFailure,
            ExtractError::Io(_) => FailureKind::IoError,
            ExtractError::Unknown(_) => FailureKind::Unknown,
        }
    }

    /// Underlying cause, when there is one beyond the message.
    pub fn detail(&self) -> Option<String> {
        match self {
            ExtractError::Corrupted { detail, .. } | ExtractError::Ocr { detail } => {
                Some(detail.clone())
            }
            ExtractError::Io(e) => Some(e.to_string()),
            ExtractError::Unknown(detail) => Some(detail.clone()),
            _ => None,
        }
    }

    pub(crate) fn corrupted(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ExtractError::Corrupted {
            message: message.into(),
            detail: detail.into(),
        }
    }
}

const MIB: u64 = 1024 * 1024;

/// Whole mebibytes as `"10MB"`, anything else in bytes.
fn size_label(bytes: &u64) -> String {
    if *bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Dispatches admitted files to the matching extractor.
#[derive(Clone)]
pub struct Extractor {
    ocr: Arc<dyn OcrEngine>,
}

impl Extractor {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    pub fn ocr_engine(&self) -> &dyn OcrEngine {
        self.ocr.as_ref()
    }

    /// Extract text from `bytes` using the strategy for `format`.
    pub async fn extract(
        &self,
        format: &DocumentFormat,
        bytes: &[u8],
    ) -> Result<String, ExtractError> {
        match format {
            DocumentFormat::Pdf => run_blocking(bytes, pdf::extract_pdf).await,
            DocumentFormat::Docx => run_blocking(bytes, docx::extract_docx).await,
            DocumentFormat::Image => ocr::extract_image(self.ocr.as_ref(), bytes).await,
            DocumentFormat::PlainText => Ok(text::decode_text(bytes)),
            DocumentFormat::Unsupported(media_type) => {
                Err(ExtractError::UnsupportedFormat(media_type.clone()))
            }
        }
    }
}

async fn run_blocking(
    bytes: &[u8],
    f: fn(&[u8]) -> Result<String, ExtractError>,
) -> Result<String, ExtractError> {
    let owned = bytes.to_vec();
    tokio::task::spawn_blocking(move || f(&owned))
        .await
        .map_err(|e| ExtractError::Unknown(format!("extraction task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(Arc::new(ocr::DisabledOcr))
    }

    #[tokio::test]
    async fn unsupported_format_returns_error() {
        let err = extractor()
            .extract(
                &DocumentFormat::Unsupported("application/octet-stream".into()),
                b"foo",
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnsupportedFormat);
    }

    #[tokio::test]
    async fn invalid_pdf_is_corrupted() {
        let err = extractor()
            .extract(&DocumentFormat::Pdf, b"not a pdf")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::CorruptedFile);
        assert_eq!(
            err.to_string(),
            "The PDF structure is invalid or the file is corrupted."
        );
    }

    #[tokio::test]
    async fn invalid_zip_is_corrupted_docx() {
        let err = extractor()
            .extract(&DocumentFormat::Docx, b"not a zip")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::CorruptedFile);
        assert_eq!(err.to_string(), "Failed to extract text from DOCX");
        assert!(err.detail().is_some());
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let text = extractor()
            .extract(&DocumentFormat::PlainText, "héllo\n".as_bytes())
            .await
            .unwrap();
        assert_eq!(text, "héllo\n");
    }

    #[tokio::test]
    async fn disabled_ocr_reports_ocr_failure() {
        let err = extractor()
            .extract(&DocumentFormat::Image, b"\x89PNG")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::OcrFailure);
    }

    #[test]
    fn too_large_message_names_limit_in_megabytes() {
        let err = ExtractError::FileTooLarge {
            size: 11 * 1024 * 1024,
            limit: 10 * 1024 * 1024,
        };
        assert_eq!(err.to_string(), "File size exceeds 10MB limit");
        assert_eq!(err.kind().as_str(), "FILE_TOO_LARGE");
    }

    #[test]
    fn small_or_fractional_limits_are_shown_in_bytes() {
        let err = ExtractError::FileTooLarge { size: 64, limit: 16 };
        assert_eq!(err.to_string(), "File size exceeds 16 bytes limit");

        let err = ExtractError::FileTooLarge {
            size: 2 * MIB,
            limit: MIB + MIB / 2,
        };
        assert_eq!(err.to_string(), "File size exceeds 1572864 bytes limit");
    }
}
