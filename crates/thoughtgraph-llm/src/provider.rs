//! Language model trait

use crate::types::{LlmResponse, Usage};
use tokio_util::sync::CancellationToken;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("server error: {0}")]
    ServerError(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl LlmError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError(_) | Self::NetworkError(_)
        )
    }
}

impl From<LlmError> for thoughtgraph_core::Error {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Cancelled => Self::Cancelled,
            LlmError::Config(msg) => Self::Config(msg),
            other => Self::Llm(other.to_string()),
        }
    }
}

/// A model that answers prompts with one or more sampled completions.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    /// Query the model for `num_responses` completions of `prompt`. If `cancel`
    /// is triggered, the in-flight request is dropped and `LlmError::Cancelled`
    /// is returned.
    async fn query(
        &self,
        prompt: &str,
        num_responses: usize,
        cancel: Option<CancellationToken>,
    ) -> LlmResult<Vec<LlmResponse>>;

    /// Flatten responses into their choice texts, in order.
    fn get_response_texts(&self, responses: &[LlmResponse]) -> Vec<String> {
        responses
            .iter()
            .flat_map(|r| r.choices.iter().map(|c| c.text.clone()))
            .collect()
    }

    /// Tokens consumed so far and what they cost.
    fn usage(&self) -> Usage;
}
