//! TOML configuration.
//!
//! Every section has defaults, so an empty file (or [`Config::default`]) is a
//! valid configuration. [`load_config`] parses and validates a file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Allowed CORS origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_max_batch_files")]
    pub max_batch_files: usize,
    /// Files extracted at once in a batch. 1 keeps extraction sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_batch_files: default_max_batch_files(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_max_batch_files() -> usize {
    10
}
fn default_concurrency() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_page_chars")]
    pub page_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            page_chars: default_page_chars(),
        }
    }
}

fn default_page_chars() -> usize {
    crate::chunk::PAGE_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_engine")]
    pub engine: String,
    #[serde(default = "default_ocr_binary")]
    pub binary: String,
    #[serde(default = "default_ocr_language")]
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: default_ocr_engine(),
            binary: default_ocr_binary(),
            language: default_ocr_language(),
        }
    }
}

impl OcrConfig {
    pub fn is_enabled(&self) -> bool {
        self.engine != "disabled"
    }
}

fn default_ocr_engine() -> String {
    "tesseract".to_string()
}
fn default_ocr_binary() -> String {
    "tesseract".to_string()
}
fn default_ocr_language() -> String {
    "eng".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_insight_chars")]
    pub max_insight_chars: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            url: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_insight_chars: default_max_insight_chars(),
        }
    }
}

impl GatewayConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-1.5-pro".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_insight_chars() -> usize {
    30_000
}

/// Load configuration from `path`, or defaults when the file does not exist.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate limits
    if config.limits.max_file_bytes == 0 {
        anyhow::bail!("limits.max_file_bytes must be > 0");
    }
    if config.limits.max_batch_files == 0 {
        anyhow::bail!("limits.max_batch_files must be >= 1");
    }
    if config.limits.concurrency == 0 {
        anyhow::bail!("limits.concurrency must be >= 1");
    }

    // Validate chunking
    if config.chunking.page_chars == 0 {
        anyhow::bail!("chunking.page_chars must be > 0");
    }

    match config.ocr.engine.as_str() {
        "tesseract" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown OCR engine: '{}'. Must be tesseract or disabled.",
            other
        ),
    }

    // Validate gateway
    match config.gateway.provider.as_str() {
        "gemini" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown gateway provider: '{}'. Must be gemini or disabled.",
            other
        ),
    }
    if config.gateway.is_enabled() && config.gateway.timeout_secs == 0 {
        anyhow::bail!("gateway.timeout_secs must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        validate(&config).unwrap();
        assert_eq!(config.limits.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.limits.max_batch_files, 10);
        assert_eq!(config.limits.concurrency, 1);
        assert_eq!(config.chunking.page_chars, 5000);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.gateway.provider, "gemini");
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
[limits]
max_batch_files = 1

[gateway]
provider = "disabled"
"#,
        )
        .unwrap();
        validate(&config).unwrap();
        assert_eq!(config.limits.max_batch_files, 1);
        assert_eq!(config.limits.max_file_bytes, 10 * 1024 * 1024);
        assert!(!config.gateway.is_enabled());
        assert_eq!(config.gateway.model, "gemini-1.5-pro");
    }

    #[test]
    fn rejects_zero_limits() {
        let config = parse_config("[limits]\nmax_batch_files = 0\n").unwrap();
        assert!(validate(&config).is_err());

        let config = parse_config("[chunking]\npage_chars = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_unknown_provider_and_engine() {
        let config = parse_config("[gateway]\nprovider = \"openai\"\n").unwrap();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("openai"), "{}", err);

        let config = parse_config("[ocr]\nengine = \"paddle\"\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn example_config_is_valid() {
        let config = parse_config(include_str!("../config/smartdoc.example.toml")).unwrap();
        validate(&config).unwrap();
        assert_eq!(config.gateway.max_insight_chars, 30_000);
        assert!(config.server.cors_origins.is_empty());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.limits.max_batch_files, 10);
    }
}
