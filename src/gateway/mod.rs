//! Generative-AI gateway.
//!
//! The document core hands text to a [`GenerativeProvider`] and receives
//! text (or a JSON object) back. [`Gateway`] validates every request before
//! it reaches the provider and turns provider failures into
//! [`GatewayError`]s that carry the upstream detail. Nothing retries.
//!
//! # Providers
//!
//! | Provider | Description |
//! |----------|-------------|
//! | `gemini` | Google Generative Language REST API (`generateContent`); key from `GEMINI_API_KEY` |
//! | `disabled` | Every task fails with [`GatewayError::Disabled`] |

pub mod prompts;

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GatewayConfig;
use prompts::PromptType;

pub const MAX_QUESTIONS: usize = 10;
const MIN_EXPLAIN_CHARS: usize = 10;
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),

    #[error("AI gateway is disabled: {0}")]
    Disabled(String),

    #[error("AI request timed out")]
    Timeout,

    #[error("{message}")]
    Upstream { message: String, detail: String },

    #[error("AI response was not understood: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    pub fn detail(&self) -> Option<&str> {
        match self {
            GatewayError::Upstream { detail, .. } => Some(detail.as_str()),
            GatewayError::InvalidResponse(detail) => Some(detail.as_str()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Upstream {
                message: "AI request failed".to_string(),
                detail: e.to_string(),
            }
        }
    }
}

/// Sampling options for one generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub system_instruction: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, GatewayError>;
}

// ============ Gemini ============

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn build_request_body(prompt: &str, options: &GenerateOptions) -> serde_json::Value {
        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });

        let mut generation = serde_json::Map::new();
        if let Some(t) = options.temperature {
            generation.insert("temperature".into(), json!(t));
        }
        if let Some(p) = options.top_p {
            generation.insert("topP".into(), json!(p));
        }
        if let Some(k) = options.top_k {
            generation.insert("topK".into(), json!(k));
        }
        if !generation.is_empty() {
            body["generationConfig"] = serde_json::Value::Object(generation);
        }

        if let Some(system) = &options.system_instruction {
            body["system_instruction"] = json!({
                "parts": [{ "text": system }],
            });
        }

        body
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, GatewayError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = Self::build_request_body(prompt, options);

        tracing::debug!(model = %self.model, prompt_bytes = prompt.len(), "gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                message: format!("AI provider returned {}", status.as_u16()),
                detail: body,
            });
        }

        let resp: serde_json::Value = response.json().await?;
        resp["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("missing candidates[0].content.parts[0].text".into())
            })
    }
}

// ============ Disabled ============

pub struct DisabledProvider {
    reason: String,
}

impl DisabledProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl GenerativeProvider for DisabledProvider {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String, GatewayError> {
        Err(GatewayError::Disabled(self.reason.clone()))
    }
}

/// Build the provider configured under `[gateway]`.
///
/// A `gemini` provider without `GEMINI_API_KEY` degrades to a disabled one
/// so the document features stay usable.
pub fn create_provider(config: &GatewayConfig) -> Result<Arc<dyn GenerativeProvider>, GatewayError> {
    if !config.is_enabled() {
        return Ok(Arc::new(DisabledProvider::new("gateway.provider = \"disabled\"")));
    }
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            let provider = GeminiProvider::new(
                key,
                config.model.clone(),
                config.url.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(provider))
        }
        _ => {
            tracing::warn!("GEMINI_API_KEY is not set; AI features are disabled");
            Ok(Arc::new(DisabledProvider::new("GEMINI_API_KEY is not set")))
        }
    }
}

// ============ Tasks ============

/// Validating front for the AI tasks.
#[derive(Clone)]
pub struct Gateway {
    provider: Arc<dyn GenerativeProvider>,
    temperature: f32,
    max_insight_chars: usize,
}

impl Gateway {
    pub fn new(provider: Arc<dyn GenerativeProvider>, config: &GatewayConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_insight_chars: config.max_insight_chars,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Ok(Self::new(create_provider(config)?, config))
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn summarize(&self, text: &str) -> Result<String, GatewayError> {
        require(text, "Invalid text input")?;
        let options = GenerateOptions {
            system_instruction: Some(prompts::SUMMARY_INSTRUCTION.to_string()),
            ..GenerateOptions::default()
        };
        self.call("summarize", text, &options).await
    }

    pub async fn answer_question(
        &self,
        document_text: &str,
        question: &str,
    ) -> Result<String, GatewayError> {
        require(document_text, "Document text is required")?;
        require(question, "Question is required")?;
        let prompt = prompts::answer_prompt(document_text, question);
        self.call("answer_question", &prompt, &GenerateOptions::default())
            .await
    }

    pub async fn generate_questions(
        &self,
        document_text: &str,
        count: usize,
    ) -> Result<Vec<String>, GatewayError> {
        require(document_text, "Document text is required")?;
        if !(1..=MAX_QUESTIONS).contains(&count) {
            return Err(GatewayError::Validation(format!(
                "Number of questions must be between 1 and {}",
                MAX_QUESTIONS
            )));
        }
        let prompt = prompts::questions_prompt(document_text, count);
        let reply = self
            .call("generate_questions", &prompt, &GenerateOptions::default())
            .await?;
        Ok(parse_questions(&reply))
    }

    /// Without a prompt type, a custom prompt selects `CUSTOM`, otherwise
    /// `EXPLAIN_SELECTION`.
    pub async fn explain(
        &self,
        full_text: &str,
        prompt_type: Option<PromptType>,
        custom_prompt: Option<&str>,
    ) -> Result<String, GatewayError> {
        if full_text.trim().chars().count() < MIN_EXPLAIN_CHARS {
            return Err(GatewayError::Validation(
                "Please provide meaningful document content (10+ characters).".to_string(),
            ));
        }
        let custom_prompt = custom_prompt.filter(|p| !p.trim().is_empty());
        let prompt_type = prompt_type.unwrap_or(if custom_prompt.is_some() {
            PromptType::Custom
        } else {
            PromptType::ExplainSelection
        });
        let prompt = prompts::explain_prompt(full_text, prompt_type, custom_prompt);
        let options = GenerateOptions {
            system_instruction: None,
            temperature: Some(self.temperature),
            top_p: Some(0.8),
            top_k: Some(40),
        };
        self.call("explain", &prompt, &options).await
    }

    /// Structured insights; only the first `max_insight_chars` characters are sent.
    pub async fn insights(&self, text: &str) -> Result<serde_json::Value, GatewayError> {
        require(text, "No text provided for analysis")?;
        let sent = truncate_chars(text, self.max_insight_chars);
        let prompt = prompts::insight_prompt(sent);
        let reply = self
            .call("insights", &prompt, &GenerateOptions::default())
            .await?;
        parse_insights(&reply)
    }

    async fn call(
        &self,
        task: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, GatewayError> {
        let started = std::time::Instant::now();
        let result = self.provider.generate(prompt, options).await;
        match &result {
            Ok(reply) => tracing::info!(
                task,
                provider = self.provider.name(),
                reply_bytes = reply.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "gateway call complete"
            ),
            Err(e) => tracing::error!(
                task,
                provider = self.provider.name(),
                error = %e,
                detail = e.detail().unwrap_or_default(),
                "gateway call failed"
            ),
        }
        result
    }
}

fn require(value: &str, message: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        Err(GatewayError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// One question per line, leading `N.` numbering removed, blank lines dropped.
pub fn parse_questions(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|line| {
            let digits = line.bytes().take_while(u8::is_ascii_digit).count();
            let rest = match line[digits..].strip_prefix('.') {
                Some(rest) if digits > 0 => rest,
                _ => line,
            };
            rest.trim().to_string()
        })
        .filter(|q| !q.is_empty())
        .collect()
}

/// The JSON object between the first `{` and the last `}` of the reply.
pub fn parse_insights(reply: &str) -> Result<serde_json::Value, GatewayError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json_text = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => {
            return Err(GatewayError::InvalidResponse(
                "no JSON object in reply".to_string(),
            ))
        }
    };
    serde_json::from_str(json_text).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}
