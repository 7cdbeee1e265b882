//! Enrichment provider interface and HTTP adapter
//!
//! The pipeline only ever sees `InsightProvider`: an opaque, fallible
//! text-generation call. `ChatCompletionsProvider` is the reqwest-backed
//! adapter for OpenAI-compatible endpoints, with retry on transient
//! transport faults. Retry lives here, never in the pipeline core; a
//! malformed response is handed back as-is for the caller to absorb.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use insights_core::ProviderConfig;

use crate::{EnrichmentError, Result};

/// Per-call generation constraints.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConstraints {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationConstraints {
    /// Stage 1: deterministic, short.
    pub fn per_sheet() -> Self {
        Self { temperature: 0.0, max_tokens: 800 }
    }

    /// Stage 2: slight variation across the larger fan-in payload.
    pub fn cross_sheet() -> Self {
        Self { temperature: 0.3, max_tokens: 1200 }
    }

    /// Stage 3: more latitude to avoid repeating earlier stages.
    pub fn deeper() -> Self {
        Self { temperature: 0.4, max_tokens: 2000 }
    }
}

/// Opaque text-generation call the pipeline depends on.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    /// Generate a completion for the prompt. Expected (not guaranteed)
    /// to return a JSON-array-shaped string of short text items.
    async fn generate(&self, prompt: &str, constraints: GenerationConstraints) -> Result<String>;
}

/// Decode a provider response into a list of short strings.
///
/// Tolerates a fenced code block around the JSON; anything else that is
/// not an array of strings of the expected arity is malformed. Never
/// panics past this boundary.
pub fn decode_string_list(raw: &str, expected_len: usize) -> Result<Vec<String>> {
    let trimmed = strip_code_fence(raw.trim());

    let items: Vec<String> = serde_json::from_str(trimmed)
        .map_err(|e| EnrichmentError::MalformedResponse(format!("not a JSON string array: {e}")))?;

    if items.len() != expected_len {
        return Err(EnrichmentError::MalformedResponse(format!(
            "expected {expected_len} items, got {}",
            items.len()
        )));
    }

    Ok(items)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag after the opening fence.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim().strip_suffix("```").unwrap_or(rest).trim()
}

/// Exponential backoff with jitter for transient provider faults.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts, ..Default::default() }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let base = self.initial_backoff.as_millis() as f64 * 2f64.powi(attempt as i32);
        let capped = base.min(self.max_backoff.as_millis() as f64);
        let with_jitter = if self.jitter {
            capped * rand::thread_rng().gen_range(0.5..1.5)
        } else {
            capped
        };
        Duration::from_millis(with_jitter as u64)
    }

    /// Run the operation, retrying transient failures with backoff.
    pub async fn execute<F, Fut, T>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts.max(1) {
            if attempt > 0 {
                let backoff = self.backoff(attempt - 1);
                debug!(attempt = attempt + 1, ?backoff, "Retrying provider call");
                tokio::time::sleep(backoff).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    warn!(attempt = attempt + 1, error = %e, "Provider call failed");
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error
            .unwrap_or_else(|| EnrichmentError::Provider("all retry attempts failed".to_string())))
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// OpenAI-compatible chat-completions client.
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    retry: RetryPolicy,
}

impl ChatCompletionsProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let retry = RetryPolicy::new(config.max_retries.max(1));
        Ok(Self { client, config, retry })
    }

    async fn call_once(&self, prompt: &str, constraints: GenerationConstraints) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a helpful data analyst. Respond quickly and concisely.",
                },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: constraints.temperature,
            max_tokens: constraints.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("api-key", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnrichmentError::Provider(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::MalformedResponse(format!("bad envelope: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EnrichmentError::MalformedResponse("no choices in response".to_string()))
    }
}

#[async_trait]
impl InsightProvider for ChatCompletionsProvider {
    async fn generate(&self, prompt: &str, constraints: GenerationConstraints) -> Result<String> {
        self.retry.execute(|| self.call_once(prompt, constraints)).await
    }
}
