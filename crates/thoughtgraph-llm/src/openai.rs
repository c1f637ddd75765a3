//! OpenAI chat completions client

use crate::config::{resolve_api_key, ModelConfig, ModelConfigFile, StopSequence, API_KEY_ENV};
use crate::provider::{LanguageModel, LlmError, LlmResult};
use crate::types::{ChatMessage, LlmChoice, LlmResponse, Usage};
use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Backoff for transient failures of a single request.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_tries: u32,
    pub max_elapsed: Duration,
    pub initial_backoff: Duration,
    /// Pause before re-issuing a shrunk multi-response request.
    pub fallback_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 6,
            max_elapsed: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(500),
            fallback_delay: Duration::from_secs(1),
        }
    }
}

pub struct ChatGpt {
    client: Client,
    name: String,
    config: ModelConfig,
    api_key: String,
    base_url: String,
    retry: RetryPolicy,
    cache: Option<DashMap<String, Vec<LlmResponse>>>,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl ChatGpt {
    /// Load the `model_name` entry of a JSON config file.
    pub fn from_config_file(path: impl AsRef<Path>, model_name: &str) -> LlmResult<Self> {
        let file = ModelConfigFile::load(path)?;
        let config = file.get(model_name)?.clone();
        Self::from_config(model_name, config)
    }

    pub fn from_config(model_name: &str, config: ModelConfig) -> LlmResult<Self> {
        let api_key = resolve_api_key(&config.api_key, std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| {
                LlmError::Config(format!(
                    "no api_key for '{}' in config and {} is not set",
                    model_name, API_KEY_ENV
                ))
            })?;
        Ok(Self {
            client: Client::new(),
            name: model_name.to_string(),
            config,
            api_key,
            base_url: OPENAI_API_URL.to_string(),
            retry: RetryPolicy::default(),
            cache: None,
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Answer repeated prompts from memory instead of the API.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(DashMap::new);
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// One request with backoff on transient failures.
    async fn chat(
        &self,
        prompt: &str,
        n: usize,
        cancel: Option<&CancellationToken>,
    ) -> LlmResult<LlmResponse> {
        let started = Instant::now();
        let mut delay = self.retry.initial_backoff;
        let mut tries = 0;

        loop {
            tries += 1;
            match cancellable(cancel, self.send(prompt, n)).await? {
                Ok(response) => {
                    self.prompt_tokens
                        .fetch_add(response.prompt_tokens, Ordering::Relaxed);
                    self.completion_tokens
                        .fetch_add(response.completion_tokens, Ordering::Relaxed);
                    return Ok(response);
                }
                Err(e)
                    if e.is_retryable()
                        && tries < self.retry.max_tries
                        && started.elapsed() + delay <= self.retry.max_elapsed =>
                {
                    warn!(tries, delay_ms = delay.as_millis() as u64, "retrying chat request: {}", e);
                    cancellable(cancel, tokio::time::sleep(delay)).await?;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(&self, prompt: &str, n: usize) -> LlmResult<LlmResponse> {
        let body = ChatRequest {
            model: &self.config.model_id,
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            n,
            stop: self.config.stop.as_ref(),
        };

        debug!(model = body.model, n, "chat completion request");

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);
        if !self.config.organization.is_empty() {
            request = request.header("OpenAI-Organization", &self.config.organization);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI error {}: {}", status, error_text);

            return Err(match status.as_u16() {
                401 => LlmError::AuthFailed(error_text),
                429 => LlmError::RateLimited { retry_after_ms },
                s if s >= 500 => LlmError::ServerError(format!("{}: {}", status, error_text)),
                _ => LlmError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(body.into_response())
    }
}

/// Run `fut` unless `cancel` fires first.
async fn cancellable<F: Future>(
    cancel: Option<&CancellationToken>,
    fut: F,
) -> LlmResult<F::Output> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(LlmError::Cancelled),
            out = fut => Ok(out),
        },
        None => Ok(fut.await),
    }
}

#[async_trait::async_trait]
impl LanguageModel for ChatGpt {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(
        &self,
        prompt: &str,
        num_responses: usize,
        cancel: Option<CancellationToken>,
    ) -> LlmResult<Vec<LlmResponse>> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(prompt) {
                debug!(model = %self.name, "response cache hit");
                return Ok(hit.clone());
            }
        }

        let responses = if num_responses <= 1 {
            vec![self.chat(prompt, 1, cancel.as_ref()).await?]
        } else {
            // Large `n` requests are shrunk on failure; partial batches accumulate.
            let mut responses = Vec::new();
            let mut remaining = num_responses;
            let mut next_try = num_responses;
            let mut attempts_left = num_responses;
            let mut last_error = None;

            while remaining > 0 && attempts_left > 0 {
                match self.chat(prompt, next_try, cancel.as_ref()).await {
                    Ok(response) => {
                        responses.push(response);
                        remaining -= next_try;
                        next_try = next_try.min(remaining);
                    }
                    Err(e @ (LlmError::Cancelled | LlmError::AuthFailed(_))) => return Err(e),
                    Err(e) => {
                        next_try = ((next_try + 1) / 2).max(1);
                        warn!(next_try, "chat request failed, shrinking batch: {}", e);
                        last_error = Some(e);
                        attempts_left -= 1;
                        cancellable(cancel.as_ref(), tokio::time::sleep(self.retry.fallback_delay))
                            .await?;
                    }
                }
            }

            if responses.is_empty() {
                return Err(last_error.unwrap_or_else(|| {
                    LlmError::RequestFailed("no responses collected".into())
                }));
            }
            responses
        };

        if let Some(cache) = &self.cache {
            cache.insert(prompt.to_string(), responses.clone());
        }
        Ok(responses)
    }

    fn usage(&self) -> Usage {
        let prompt_tokens = self.prompt_tokens.load(Ordering::Relaxed);
        let completion_tokens = self.completion_tokens.load(Ordering::Relaxed);
        Usage {
            prompt_tokens,
            completion_tokens,
            cost: self.config.cost(prompt_tokens, completion_tokens),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    n: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a StopSequence>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl ChatResponse {
    fn into_response(self) -> LlmResponse {
        LlmResponse {
            model: self.model,
            choices: self
                .choices
                .into_iter()
                .map(|c| LlmChoice {
                    text: c.message.content.unwrap_or_default(),
                    finish_reason: c.finish_reason,
                })
                .collect(),
            prompt_tokens: self.usage.prompt_tokens,
            completion_tokens: self.usage.completion_tokens,
        }
    }
}
