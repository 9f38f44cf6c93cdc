//! Optical character recognition for image files.
//!
//! An [`OcrEngine`] hands out [`OcrWorker`]s. [`extract_image`] acquires one
//! worker per call and terminates it on both the success and the error path,
//! so no worker outlives the call that created it.
//!
//! The default engine shells out to the Tesseract CLI. Each worker owns a
//! scratch directory holding the input image; terminating the worker (or
//! dropping it) removes the directory, and the child process is killed if
//! the recognition future is dropped early.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use super::ExtractError;
use crate::config::OcrConfig;

#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Acquire a recognition worker. Pair with [`OcrWorker::terminate`].
    async fn create_worker(&self) -> Result<Box<dyn OcrWorker>, ExtractError>;
}

#[async_trait]
pub trait OcrWorker: Send {
    async fn recognize(&mut self, image: &[u8]) -> Result<String, ExtractError>;

    /// Release the worker's resources. Called exactly once.
    async fn terminate(&mut self) -> Result<(), ExtractError>;
}

/// Recognize the text in `image`. Empty text is a valid result.
pub async fn extract_image(engine: &dyn OcrEngine, image: &[u8]) -> Result<String, ExtractError> {
    let mut worker = engine.create_worker().await?;
    let result = worker.recognize(image).await;
    if let Err(e) = worker.terminate().await {
        tracing::warn!(engine = engine.name(), error = %e, "OCR worker did not terminate cleanly");
    }
    match &result {
        Ok(text) => tracing::debug!(engine = engine.name(), bytes = text.len(), "OCR complete"),
        Err(e) => tracing::warn!(
            engine = engine.name(),
            error = %e,
            detail = e.detail().unwrap_or_default(),
            "OCR failed"
        ),
    }
    result
}

/// Build the engine configured under `[ocr]`.
pub fn create_engine(config: &OcrConfig) -> Arc<dyn OcrEngine> {
    if config.is_enabled() {
        Arc::new(TesseractEngine::new(&config.binary, &config.language))
    } else {
        Arc::new(DisabledOcr)
    }
}

// ============ Disabled ============

/// Engine used when `ocr.engine = "disabled"`; every call fails.
pub struct DisabledOcr;

#[async_trait]
impl OcrEngine for DisabledOcr {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn create_worker(&self) -> Result<Box<dyn OcrWorker>, ExtractError> {
        Err(ExtractError::Ocr {
            detail: "OCR engine is disabled".to_string(),
        })
    }
}

// ============ Tesseract ============

/// Runs `tesseract <input> stdout -l <language>` once per recognition.
pub struct TesseractEngine {
    binary: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(binary: &str, language: &str) -> Self {
        Self {
            binary: binary.to_string(),
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn create_worker(&self) -> Result<Box<dyn OcrWorker>, ExtractError> {
        let scratch = tempfile::Builder::new()
            .prefix("smartdoc-ocr-")
            .tempdir()
            .map_err(|e| ExtractError::Ocr {
                detail: format!("failed to create OCR scratch directory: {}", e),
            })?;
        Ok(Box::new(TesseractWorker {
            binary: self.binary.clone(),
            language: self.language.clone(),
            scratch: Some(scratch),
        }))
    }
}

struct TesseractWorker {
    binary: String,
    language: String,
    scratch: Option<TempDir>,
}

impl TesseractWorker {
    fn input_path(&self) -> Result<PathBuf, ExtractError> {
        self.scratch
            .as_ref()
            .map(|dir| dir.path().join("input"))
            .ok_or_else(|| ExtractError::Ocr {
                detail: "OCR worker already terminated".to_string(),
            })
    }
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&mut self, image: &[u8]) -> Result<String, ExtractError> {
        let input = self.input_path()?;
        tokio::fs::write(&input, image)
            .await
            .map_err(|e| ExtractError::Ocr {
                detail: format!("failed to stage image: {}", e),
            })?;

        let output = tokio::process::Command::new(&self.binary)
            .arg(&input)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractError::Ocr {
                detail: format!("failed to run {}: {}", self.binary, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Ocr {
                detail: format!("{} exited with {}: {}", self.binary, output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn terminate(&mut self) -> Result<(), ExtractError> {
        match self.scratch.take() {
            Some(dir) => dir.close().map_err(|e| ExtractError::Ocr {
                detail: format!("failed to remove OCR scratch directory: {}", e),
            }),
            None => Ok(()),
        }
    }
}
