use super::models::{Usage, MODEL_MAX_TOKENS};
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use linefix_adapters::config::Config;
use linefix_core::{AnalysisRequest, ModelClient};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// OpenRouter direct API URL (BYOK mode)
pub(crate) const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Maximum length for error content in error messages
const MAX_ERROR_CONTENT_LEN: usize = 200;

pub(crate) const INITIAL_BACKOFF_MS: u64 = 2000;
pub(crate) const BACKOFF_MULTIPLIER: u64 = 2;

/// Sanitize API response content for error messages to prevent credential leakage.
fn sanitize_api_response(content: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &[
        "api_key",
        "apikey",
        "secret",
        "password",
        "credential",
        "bearer",
        "sk-",
    ];

    let truncated = truncate_str(content, MAX_ERROR_CONTENT_LEN);

    let lower = truncated.to_lowercase();
    for pattern in SECRET_PATTERNS {
        if lower.contains(pattern) {
            return "(response details redacted - may contain sensitive data)".to_string();
        }
    }

    truncated.to_string()
}

/// Response from LLM including content and usage stats
#[derive(Debug)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    /// Content can be null in some API responses (e.g., when refusal or error occurs)
    #[serde(default)]
    content: Option<String>,
    /// Refusal reason - set when content is blocked by content moderation
    #[serde(default)]
    refusal: Option<String>,
}

/// OpenRouter error response (can come with 200 status for upstream errors)
#[derive(Deserialize)]
pub(crate) struct OpenRouterError {
    pub error: OpenRouterApiError,
}

#[derive(Deserialize)]
pub(crate) struct OpenRouterApiError {
    pub message: String,
    #[serde(default)]
    pub code: Option<i32>,
}

/// Extract a retry-after hint like "retry after 12 seconds" from a response body.
fn parse_retry_after(text: &str) -> Option<u64> {
    let text_lower = text.to_lowercase();
    let pos = text_lower.find("retry")?;
    text_lower[pos..]
        .split_whitespace()
        .skip(1)
        .take(5)
        .filter_map(|word| {
            word.trim_matches(|c: char| !c.is_numeric())
                .parse::<u64>()
                .ok()
        })
        .find(|secs| *secs > 0 && *secs < 300)
}

pub(crate) fn backoff_secs(retry_count: u32) -> u64 {
    let factor = BACKOFF_MULTIPLIER.pow(retry_count.saturating_sub(1));
    let ms = INITIAL_BACKOFF_MS.saturating_mul(factor);
    (ms / 1000).max(1)
}

pub(crate) fn is_retryable_network_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn map_timeout_error(err: reqwest::Error) -> anyhow::Error {
    if err.is_timeout() {
        anyhow!("OpenRouter request timed out. Please try again.")
    } else if err.is_connect() {
        anyhow!("Could not connect to OpenRouter. Check your network and try again.")
    } else {
        err.into()
    }
}

/// Truncate a string for display (Unicode-safe)
pub(crate) fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

async fn pause(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Send a request to OpenRouter with automatic retry on transient failures.
///
/// Handles:
/// - Network errors (timeout, connection failures)
/// - Rate limits (429)
/// - Server errors (5xx)
/// - OpenRouter's 200-with-error responses
pub(crate) async fn send_with_retry<T: Serialize>(
    client: &reqwest::Client,
    api_key: &str,
    request_body: &T,
    max_retries: u32,
) -> Result<String> {
    let mut retry_count = 0;

    loop {
        let response = match client
            .post(OPENROUTER_URL)
            .header("Content-Type", "application/json")
            .header("X-Title", "linefix")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(request_body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                if is_retryable_network_error(&err) && retry_count < max_retries {
                    retry_count += 1;
                    warn!(attempt = retry_count, error = %err, "network error, retrying");
                    pause(backoff_secs(retry_count)).await;
                    continue;
                }
                return Err(map_timeout_error(err));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                if is_retryable_network_error(&err) && retry_count < max_retries {
                    retry_count += 1;
                    warn!(attempt = retry_count, error = %err, "network error reading body, retrying");
                    pause(backoff_secs(retry_count)).await;
                    continue;
                }
                return Err(map_timeout_error(err));
            }
        };

        if status.is_success() {
            // OpenRouter sometimes returns errors with 200 status (upstream provider issues)
            if let Ok(err_resp) = serde_json::from_str::<OpenRouterError>(&text) {
                let is_retryable = err_resp
                    .error
                    .code
                    .map(|c| c >= 500 || c == 429)
                    .unwrap_or(true);

                if is_retryable && retry_count < max_retries {
                    retry_count += 1;
                    warn!(attempt = retry_count, code = ?err_resp.error.code, "upstream provider error, retrying");
                    pause(backoff_secs(retry_count)).await;
                    continue;
                }

                return Err(anyhow!(
                    "OpenRouter error: {}",
                    truncate_str(&err_resp.error.message, MAX_ERROR_CONTENT_LEN)
                ));
            }

            return Ok(text);
        }

        if status.as_u16() == 429 && retry_count < max_retries {
            retry_count += 1;
            let retry_after = parse_retry_after(&text).unwrap_or_else(|| backoff_secs(retry_count));
            warn!(attempt = retry_count, retry_after, "rate limited, retrying");
            pause(retry_after).await;
            continue;
        }

        if status.is_server_error() && retry_count < max_retries {
            retry_count += 1;
            warn!(attempt = retry_count, %status, "server error, retrying");
            pause(backoff_secs(retry_count)).await;
            continue;
        }

        let error_msg = match status.as_u16() {
            401 => "Invalid API key. Run 'linefix --setup' to update it.".to_string(),
            429 => format!(
                "Rate limited by OpenRouter after {} retries. Try again in a few minutes.",
                retry_count
            ),
            500..=599 => format!(
                "OpenRouter server error ({}). The service may be temporarily unavailable.",
                status
            ),
            _ => format!("API error {}: {}", status, sanitize_api_response(&text)),
        };
        return Err(anyhow!("{}", error_msg));
    }
}

/// Create a configured HTTP client for OpenRouter requests
pub(crate) fn create_http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))
}

/// Pull the assistant text out of a chat-completions body.
fn parse_chat_response(text: &str) -> Result<LlmResponse> {
    let parsed: ChatResponse = serde_json::from_str(text).map_err(|e| {
        anyhow!(
            "Failed to parse OpenRouter response: {}\n{}",
            e,
            sanitize_api_response(text)
        )
    })?;

    let choice = parsed.choices.first();

    if let Some(refusal) = choice.and_then(|c| c.message.refusal.as_deref()) {
        return Err(anyhow!(
            "Request was refused: {}",
            truncate_str(refusal, MAX_ERROR_CONTENT_LEN)
        ));
    }

    let content = choice
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(anyhow!(
            "API returned empty response. The model may have been rate limited or failed to generate content. Please try again."
        ));
    }

    Ok(LlmResponse {
        content,
        usage: parsed.usage,
    })
}

/// Chat-completions client bound to one model and retry policy.
pub struct OpenRouterClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_retries: u32,
    user: Option<String>,
    last_usage: Mutex<Option<Usage>>,
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl OpenRouterClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self> {
        Ok(Self {
            http: create_http_client(timeout_secs)?,
            api_key: api_key.into(),
            model: model.into(),
            max_retries,
            user: None,
            last_usage: Mutex::new(None),
        })
    }

    /// Build from persisted settings. Fails when no API key is configured.
    pub fn from_config(config: &mut Config) -> Result<Self> {
        let api_key = config.get_api_key().ok_or_else(|| {
            anyhow!("No API key configured. Run 'linefix --setup' to get started.")
        })?;
        let user = config.openrouter_user();
        Ok(Self::new(
            api_key,
            config.model.clone(),
            config.request_timeout_secs,
            config.max_retries,
        )?
        .with_user(Some(user)))
    }

    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Usage reported by the most recent successful call.
    pub fn last_usage(&self) -> Option<Usage> {
        match self.last_usage.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn chat_request(&self, system: &str, user: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            user: self.user.clone(),
            max_tokens: MODEL_MAX_TOKENS,
            stream: false,
        }
    }

    /// One system + user exchange, with retries.
    pub async fn chat(&self, system: &str, user: &str) -> Result<LlmResponse> {
        let request = self.chat_request(system, user);
        debug!(model = %self.model, prompt_chars = system.len() + user.len(), "calling model");

        let text = send_with_retry(&self.http, &self.api_key, &request, self.max_retries).await?;
        let response = parse_chat_response(&text)?;

        debug!(
            response_chars = response.content.len(),
            total_tokens = response.usage.as_ref().map(|u| u.total_tokens),
            "model replied"
        );
        let mut guard = match self.last_usage.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = response.usage.clone();
        Ok(response)
    }
}

impl ModelClient for OpenRouterClient {
    fn complete<'a>(&'a self, request: &'a AnalysisRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let response = self
                .chat(&request.instructions, &request.user_message())
                .await?;
            Ok(response.content)
        })
    }
}
