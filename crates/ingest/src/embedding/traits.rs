use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding API error: {0}")]
    Api(String),

    #[error("embedding request timed out: {0}")]
    Timeout(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for embedding backends (OpenAI-compatible, Ollama).
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Embed a batch of texts, returning one vector per input text (in order).
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// The dimensionality of the output vectors.
    fn dimensions(&self) -> usize;
}

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;

/// Send a request with bounded retries on transient failures.
///
/// Retries timeouts, connection errors, 429 and 5xx with exponential
/// backoff; any other error or status is returned to the caller as-is.
pub(crate) async fn send_with_retry<F>(
    build: F,
    what: &str,
) -> Result<reqwest::Response, EmbeddingError>
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
                    return Err(EmbeddingError::Timeout(format!("{what}: {e}")));
                }
                warn!("{what} timed out (attempt {attempt}/{MAX_ATTEMPTS}), retrying");
            }
            Err(e) if e.is_connect() => {
                if attempt >= MAX_ATTEMPTS {
                    return Err(EmbeddingError::Http(e));
                }
                warn!("{what} connection failed (attempt {attempt}/{MAX_ATTEMPTS}): {e}");
            }
            Err(e) => return Err(EmbeddingError::Http(e)),
        }
        tokio::time::sleep(Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1))).await;
        attempt += 1;
    }
}
