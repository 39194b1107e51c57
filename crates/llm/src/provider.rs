use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A chat message for the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Trait for LLM providers — each backend implements this.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and return the assistant's response text.
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {body}")]
    ApiError { status: u16, body: String },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;

/// Send a request with bounded retries on transient failures (timeouts,
/// connection errors, 429, 5xx). Other errors and statuses fail fast.
pub(crate) async fn send_with_retry<F>(
    build: F,
    what: &str,
) -> Result<reqwest::Response, LlmError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 1;
    loop {
        match build().send().await {
            Ok(response) => {
                let status = response.status();
                let transient = status.as_u16() == 429 || status.is_server_error();
                if !transient || attempt >= MAX_ATTEMPTS {
                    return Ok(response);
                }
                warn!("{what} returned {status} (attempt {attempt}/{MAX_ATTEMPTS}), retrying");
            }
            Err(e) if e.is_timeout() => {
                if attempt >= MAX_ATTEMPTS {
                    return Err(LlmError::Timeout(format!("{what}: {e}")));
                }
                warn!("{what} timed out (attempt {attempt}/{MAX_ATTEMPTS}), retrying");
            }
            Err(e) if e.is_connect() => {
                if attempt >= MAX_ATTEMPTS {
                    return Err(LlmError::HttpError(e));
                }
                warn!("{what} connection failed (attempt {attempt}/{MAX_ATTEMPTS}): {e}");
            }
            Err(e) => return Err(LlmError::HttpError(e)),
        }
        tokio::time::sleep(Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1))).await;
        attempt += 1;
    }
}

pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
