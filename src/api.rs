//! Generative-text provider access with optional exponential backoff.
//!
//! This module talks to a Gemini-style `generateContent` endpoint and turns
//! its answer into an [`AiResult`].
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`GenerateText`]: Core trait, one prompt in, raw model text out
//! - [`GeminiClient`]: reqwest implementation of the HTTP contract
//! - [`RetryGenerate`]: Decorator that adds retry logic to any `GenerateText`
//! - [`generate`]: Text → JSON extraction → normalization
//!
//! # Retry Strategy
//!
//! - Number of retries comes from `provider.max_retries` (0 = single attempt)
//! - Exponential backoff from the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//! - Only transient failures (transport, 429, 5xx, empty text) are retried

use rand::{Rng, rng};
use serde_json::{Value, json};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::config::ProviderConfig;
use crate::error::{ConfigError, ProviderError};
use crate::models::{AiResult, PromptRequest};
use crate::normalize::normalize;
use crate::utils::{looks_truncated, take_chars};

/// Characters of an error body kept in [`ProviderError::HttpError`].
const ERROR_SNIPPET_CHARS: usize = 200;

/// Trait for async text generation.
///
/// Implementors send a prompt to a model and return its raw text answer.
/// This abstraction allows for different backends or decorators (like retry logic).
pub trait GenerateText {
    /// Send a prompt and receive the model's concatenated text output.
    ///
    /// # Errors
    ///
    /// A [`ProviderError`] describing the transport, HTTP or response failure.
    async fn generate_text(&self, prompt: &PromptRequest) -> Result<String, ProviderError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`GenerateText`] implementation.
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryGenerate<T> {
    /// The underlying client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryGenerate<T>
where
    T: GenerateText,
{
    /// Wrap a client. With `max_retries == 0` the wrapper makes exactly one attempt.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = GeminiClient::new(&config.provider)?;
    /// let retrying = RetryGenerate::new(client, 3, Duration::from_millis(500));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryGenerate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryGenerate")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> GenerateText for RetryGenerate<T>
where
    T: GenerateText,
{
    #[instrument(level = "info", skip_all)]
    async fn generate_text(&self, prompt: &PromptRequest) -> Result<String, ProviderError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.generate_text(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries || !e.is_retryable() {
                        if self.max_retries > 0 {
                            error!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                                elapsed_ms_total = total_dt.as_millis() as u64,
                                error = %e,
                                "generate_text() giving up"
                            );
                        }
                        return Err(e);
                    }

                    // backoff calc
                    let shift = (attempt - 1).min(16) as u32;
                    let mut delay = self.base_delay.saturating_mul(1u32 << shift);
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "generate_text() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// HTTP client for a Gemini-style `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GeminiClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
        })
    }

    fn ensure_config<'a>(&'a self, prompt: &PromptRequest) -> Result<&'a str, ConfigError> {
        let key = self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)?;
        if prompt.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        Ok(key)
    }

    fn url_for(&self, model: &str, key: &str) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.endpoint,
            urlencoding::encode(model.trim()),
            urlencoding::encode(key)
        )
    }
}

/// Request body for `generateContent`.
///
/// Web retrieval adds the search tool; the JSON MIME type is only requested
/// when asked for, since the provider rejects it alongside tools.
pub fn request_body(prompt: &PromptRequest) -> Value {
    let mut generation_config = json!({ "temperature": prompt.temperature });
    if prompt.json_output {
        generation_config["responseMimeType"] = json!("application/json");
    }
    let mut body = json!({
        "contents": [
            { "role": "user", "parts": [ { "text": prompt.system_text } ] }
        ],
        "generationConfig": generation_config,
    });
    if prompt.web_retrieval {
        body["tools"] = json!([ { "googleSearch": {} } ]);
    }
    body
}

/// Concatenated `text` parts of the first candidate, empty when absent.
pub fn extract_candidate_text(data: &Value) -> String {
    data.pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Recover a JSON object from model text.
///
/// Markdown fences are removed and the whole text is parsed; failing that,
/// the span from the first `{` to the last `}` is parsed.
///
/// # Errors
///
/// - [`ProviderError::EmptyResponse`] for blank text
/// - [`ProviderError::NoJsonObject`] when no `{ … }` span exists
/// - [`ProviderError::JsonParseError`] when the span is not valid JSON
pub fn extract_json(text: &str) -> Result<Value, ProviderError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    let clean = text.replace("```json", "").replace("```", "");
    let clean = clean.trim();

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(clean) {
        return Ok(value);
    }

    let (Some(start), Some(end)) = (clean.find('{'), clean.rfind('}')) else {
        return Err(ProviderError::NoJsonObject);
    };
    if end <= start {
        return Err(ProviderError::NoJsonObject);
    }

    match serde_json::from_str::<Value>(&clean[start..=end]) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(ProviderError::NoJsonObject),
        Err(e) if looks_truncated(&e) => Err(ProviderError::JsonParseError(format!(
            "{e} (response looks truncated)"
        ))),
        Err(e) => Err(ProviderError::JsonParseError(e.to_string())),
    }
}

impl GenerateText for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %prompt.model))]
    async fn generate_text(&self, prompt: &PromptRequest) -> Result<String, ProviderError> {
        let key = self.ensure_config(prompt)?;
        let t0 = Instant::now();

        let response = self
            .client
            .post(self.url_for(&prompt.model, key))
            .json(&request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let dt = t0.elapsed();

        if !status.is_success() {
            warn!(status = status.as_u16(), elapsed_ms = dt.as_millis() as u64, "Provider HTTP error");
            return Err(ProviderError::HttpError {
                status: status.as_u16(),
                snippet: take_chars(&body, ERROR_SNIPPET_CHARS),
            });
        }

        let data: Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::BadResponse(e.to_string()))?;
        if !data.is_object() {
            return Err(ProviderError::BadResponse("response is not a JSON object".to_string()));
        }

        let text = extract_candidate_text(&data);
        info!(chars = text.len(), elapsed_ms = dt.as_millis() as u64, "Provider answered");
        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Run a prompt through a client and normalize the answer.
///
/// # Errors
///
/// [`ProviderError::NotConfigured`] for an empty model (checked before any
/// call), otherwise whatever the client or JSON extraction reports.
#[instrument(level = "info", skip_all)]
pub async fn generate<G: GenerateText>(
    client: &G,
    prompt: &PromptRequest,
) -> Result<AiResult, ProviderError> {
    if prompt.model.trim().is_empty() {
        return Err(ConfigError::MissingModel.into());
    }
    let text = client.generate_text(prompt).await?;
    let raw = extract_json(&text)?;
    Ok(normalize(raw))
}
