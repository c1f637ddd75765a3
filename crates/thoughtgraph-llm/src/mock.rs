//! Deterministic language model for tests and offline runs
//!
//! A responder closure maps each prompt (and requested response count) to the
//! completion texts. Every prompt is recorded so tests can assert on what the
//! engine asked for.

use crate::provider::{LanguageModel, LlmError, LlmResult};
use crate::types::{LlmChoice, LlmResponse, Usage};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

type Responder = Box<dyn Fn(&str, usize) -> Vec<String> + Send + Sync>;

pub struct MockModel {
    responder: Responder,
    prompts: Mutex<Vec<String>>,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl MockModel {
    pub fn new(responder: impl Fn(&str, usize) -> Vec<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
            prompt_tokens: AtomicU64::new(0),
            completion_tokens: AtomicU64::new(0),
        }
    }

    /// Every response is `text`, repeated `num_responses` times.
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_, n| vec![text.clone(); n.max(1)])
    }

    /// Responses are consumed in order, one per requested completion. Once the
    /// sequence is exhausted every completion is empty.
    pub fn sequence(texts: Vec<String>) -> Self {
        let queue = Mutex::new(VecDeque::from(texts));
        Self::new(move |_, n| {
            let mut queue = match queue.lock() {
                Ok(q) => q,
                Err(poisoned) => poisoned.into_inner(),
            };
            (0..n.max(1))
                .map(|_| queue.pop_front().unwrap_or_default())
                .collect()
        })
    }

    /// Prompts received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        match self.prompts.lock() {
            Ok(p) => p.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts().len()
    }
}

fn word_count(s: &str) -> u64 {
    s.split_whitespace().count() as u64
}

#[async_trait::async_trait]
impl LanguageModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn query(
        &self,
        prompt: &str,
        num_responses: usize,
        cancel: Option<CancellationToken>,
    ) -> LlmResult<Vec<LlmResponse>> {
        if cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
            return Err(LlmError::Cancelled);
        }
        match self.prompts.lock() {
            Ok(mut p) => p.push(prompt.to_string()),
            Err(poisoned) => poisoned.into_inner().push(prompt.to_string()),
        }

        let texts = (self.responder)(prompt, num_responses);
        let prompt_tokens = word_count(prompt);
        let completion_tokens = texts.iter().map(|t| word_count(t)).sum();
        self.prompt_tokens.fetch_add(prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(completion_tokens, Ordering::Relaxed);

        Ok(vec![LlmResponse {
            model: "mock".into(),
            choices: texts.into_iter().map(LlmChoice::text).collect(),
            prompt_tokens,
            completion_tokens,
        }])
    }

    fn usage(&self) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            cost: 0.0,
        }
    }
}
