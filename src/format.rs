//! Format detection and admission.
//!
//! Maps a file's declared media type onto the closed set of extraction
//! strategies and enforces the size ceiling before any extractor runs.
//! Every entry point (CLI, HTTP upload, library batch) goes through [`admit`].

use serde::Serialize;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::extract::ExtractError;
use crate::models::SourceFile;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_MSWORD: &str = "application/msword";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// Extraction strategy selected for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Image,
    PlainText,
    Unsupported(String),
}

impl DocumentFormat {
    pub fn label(&self) -> &str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Image => "image",
            DocumentFormat::PlainText => "text",
            DocumentFormat::Unsupported(_) => "unsupported",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Detect the extraction strategy from a declared media type.
///
/// Parameters (`; charset=...`) and case are ignored.
pub fn detect(media_type: &str) -> DocumentFormat {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        MIME_PDF => DocumentFormat::Pdf,
        MIME_DOCX | MIME_MSWORD => DocumentFormat::Docx,
        MIME_TEXT => DocumentFormat::PlainText,
        MIME_JPEG | MIME_PNG => DocumentFormat::Image,
        other if other.starts_with("image/") && other.len() > "image/".len() => {
            DocumentFormat::Image
        }
        _ => DocumentFormat::Unsupported(media_type.to_string()),
    }
}

/// Admission gate: rejects unsupported types and oversized files.
pub fn admit(file: &SourceFile, limits: &LimitsConfig) -> Result<DocumentFormat, ExtractError> {
    let format = detect(&file.media_type);
    if let DocumentFormat::Unsupported(media_type) = format {
        return Err(ExtractError::UnsupportedFormat(media_type));
    }

    let size = file.len() as u64;
    if size > limits.max_file_bytes {
        return Err(ExtractError::FileTooLarge {
            size,
            limit: limits.max_file_bytes,
        });
    }

    Ok(format)
}

/// Guess a media type from a file extension, for inputs without a declared type.
pub fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => MIME_PDF,
        "docx" => MIME_DOCX,
        "doc" => MIME_MSWORD,
        "txt" | "text" | "md" | "markdown" => MIME_TEXT,
        "jpg" | "jpeg" => MIME_JPEG,
        "png" => MIME_PNG,
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        _ => MIME_OCTET_STREAM,
    }
}
