//! Generative-AI collaborator boundary.
//!
//! Stages never talk HTTP directly. They take a `&dyn TextGenerator` or a
//! `&dyn ImageGenerator`, which keeps them testable with fakes and lets the
//! driver decide what to do when no client can be built (missing key).
//!
//! [`GeminiClient`] implements both traits against the Gemini
//! `models/{model}:generateContent` REST endpoint. Calls block until a
//! response or the configured timeout; 429 and 5xx responses are retried with
//! exponential backoff (1s, 2s, 4s, …).

use crate::config::Config;
use crate::error::ErrorKind;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

/// Delay before the first retry; doubled for each further attempt.
const BASE_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 60_000;

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("no API key: set {0} (or GOOGLE_API_KEY)")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("response contained no text")]
    EmptyContent,

    #[error("request blocked: {0}")]
    Blocked(String),

    #[error("response contained no image (finish reason: {0})")]
    NoImage(String),

    #[error("image payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl GenAiError {
    /// The service cannot be reached or refuses us outright. Retrying the
    /// next entry would fail the same way.
    pub fn is_unavailable(&self) -> bool {
        match self {
            GenAiError::MissingApiKey(_) | GenAiError::Http(_) | GenAiError::RateLimited { .. } => {
                true
            }
            GenAiError::Api { status, .. } => {
                matches!(status, 401 | 403 | 404 | 429) || *status >= 500
            }
            _ => false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        if self.is_unavailable() {
            ErrorKind::CollaboratorUnavailable
        } else {
            ErrorKind::InvalidResponseShape
        }
    }
}

/// A prompt for the text collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub temperature: Option<f32>,
}

impl<'a> TextRequest<'a> {
    pub fn new(model: &'a str, prompt: &'a str) -> Self {
        Self {
            model,
            prompt,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A prompt for the image collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    /// `"1:1"`, `"9:16"`, …
    pub aspect_ratio: &'a str,
}

pub trait TextGenerator {
    /// Send a prompt and return the reply text.
    fn generate_text(&self, request: &TextRequest<'_>) -> Result<String, GenAiError>;
}

pub trait ImageGenerator {
    /// Send a prompt and return the raw bytes of the first image in the reply.
    fn generate_image(&self, request: &ImageRequest<'_>) -> Result<Vec<u8>, GenAiError>;
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: RequestGenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig<'a> {
    response_modalities: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<RequestImageConfig<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestImageConfig<'a> {
    aspect_ratio: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn text(request: &TextRequest<'a>) -> Self {
        Self {
            contents: vec![RequestContent::user(request.prompt)],
            generation_config: RequestGenerationConfig {
                response_modalities: vec!["TEXT"],
                temperature: request.temperature,
                image_config: None,
            },
        }
    }

    fn image(request: &ImageRequest<'a>) -> Self {
        Self {
            contents: vec![RequestContent::user(request.prompt)],
            generation_config: RequestGenerationConfig {
                response_modalities: vec!["IMAGE"],
                temperature: None,
                image_config: Some(RequestImageConfig {
                    aspect_ratio: request.aspect_ratio,
                }),
            },
        }
    }
}

impl<'a> RequestContent<'a> {
    fn user(text: &'a str) -> Self {
        Self {
            role: "user",
            parts: vec![RequestPart { text }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GenerateContentResponse {
    fn check_blocked(&self) -> Result<(), GenAiError> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Err(GenAiError::Blocked(reason.to_string()));
        }
        Ok(())
    }

    fn first_parts(&self) -> &[ResponsePart] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    fn finish_reason(&self) -> &str {
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .unwrap_or("none")
    }

    /// All text parts of the first candidate, joined by newlines.
    pub fn text(&self) -> Result<String, GenAiError> {
        self.check_blocked()?;
        let texts: Vec<&str> = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .filter(|t| !t.trim().is_empty())
            .collect();
        if texts.is_empty() {
            return Err(GenAiError::EmptyContent);
        }
        Ok(texts.join("\n"))
    }

    /// Decoded bytes of the first inline image of the first candidate.
    pub fn first_image(&self) -> Result<Vec<u8>, GenAiError> {
        self.check_blocked()?;
        let inline = self
            .first_parts()
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .ok_or_else(|| GenAiError::NoImage(self.finish_reason().to_string()))?;
        debug!("received {} image", inline.mime_type);
        Ok(BASE64.decode(inline.data.trim())?)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Blocking Gemini REST client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, GenAiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: max_retries.max(1),
        })
    }

    /// Build a client from `[api]`, reading the key from the environment.
    pub fn from_config(config: &Config) -> Result<Self, GenAiError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| GenAiError::MissingApiKey(config.api.api_key_env.clone()))?;
        Self::new(
            api_key,
            config.api.base_url.as_str(),
            Duration::from_secs(config.api.timeout_secs),
            config.api.max_retries,
        )
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// POST a request, retrying on 429 and 5xx with exponential backoff.
    fn call(
        &self,
        model: &str,
        body: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, GenAiError> {
        let url = self.endpoint(model);
        let mut last_error: Option<GenAiError> = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    "{} call attempt {} failed, retrying after {}ms",
                    model,
                    attempt,
                    delay.as_millis()
                );
                std::thread::sleep(delay);
            }

            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(body)
                .send();

            let response = match response {
                Ok(r) => r,
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_error = Some(GenAiError::Http(e));
                    continue;
                }
                Err(e) => return Err(GenAiError::Http(e)),
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().unwrap_or_default();
                warn!("{} returned {}: {}", model, status, body);
                last_error = Some(GenAiError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(GenAiError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let text = response.text()?;
            let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
            debug!("{} call succeeded ({} candidates)", model, parsed.candidates.len());
            return Ok(parsed);
        }

        Err(last_error.unwrap_or(GenAiError::RateLimited {
            retries: self.max_retries,
        }))
    }
}

/// Wait before retry number `attempt` (1-based): 1s, 2s, 4s, … capped at a
/// minute.
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

impl TextGenerator for GeminiClient {
    fn generate_text(&self, request: &TextRequest<'_>) -> Result<String, GenAiError> {
        self.call(request.model, &GenerateContentRequest::text(request))?
            .text()
    }
}

impl ImageGenerator for GeminiClient {
    fn generate_image(&self, request: &ImageRequest<'_>) -> Result<Vec<u8>, GenAiError> {
        self.call(request.model, &GenerateContentRequest::image(request))?
            .first_image()
    }
}
