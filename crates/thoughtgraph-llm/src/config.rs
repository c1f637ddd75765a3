//! Model configuration file
//!
//! A JSON object keyed by model name. Each entry names the upstream model,
//! its per-1000-token prices, and sampling parameters:
//!
//! ```json
//! {
//!   "chatgpt": {
//!     "model_id": "gpt-3.5-turbo",
//!     "prompt_token_cost": 0.0015,
//!     "response_token_cost": 0.002,
//!     "temperature": 1.0,
//!     "max_tokens": 1536,
//!     "stop": null,
//!     "organization": "",
//!     "api_key": ""
//!   }
//! }
//! ```

use crate::provider::{LlmError, LlmResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Upstream model identifier (e.g. "gpt-3.5-turbo").
    pub model_id: String,
    /// Price per 1000 prompt tokens.
    pub prompt_token_cost: f64,
    /// Price per 1000 completion tokens.
    pub response_token_cost: f64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stop: Option<StopSequence>,
    /// Sent as the OpenAI-Organization header when non-empty.
    pub organization: String,
    /// Empty means: read it from the environment.
    pub api_key: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: "gpt-3.5-turbo".into(),
            prompt_token_cost: 0.0015,
            response_token_cost: 0.002,
            temperature: 1.0,
            max_tokens: 1536,
            stop: None,
            organization: String::new(),
            api_key: String::new(),
        }
    }
}

impl ModelConfig {
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        self.prompt_token_cost * prompt_tokens as f64 / 1000.0
            + self.response_token_cost * completion_tokens as f64 / 1000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequence {
    One(String),
    Many(Vec<String>),
}

/// Every model entry of a config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelConfigFile(HashMap<String, ModelConfig>);

impl ModelConfigFile {
    pub fn load(path: impl AsRef<Path>) -> LlmResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            LlmError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
            .map_err(|e| LlmError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(raw: &str) -> LlmResult<Self> {
        serde_json::from_str(raw).map_err(|e| LlmError::Config(format!("malformed config: {}", e)))
    }

    pub fn get(&self, model_name: &str) -> LlmResult<&ModelConfig> {
        self.0.get(model_name).ok_or_else(|| {
            let mut known: Vec<&str> = self.0.keys().map(String::as_str).collect();
            known.sort_unstable();
            LlmError::Config(format!(
                "model '{}' not found in config (known: {})",
                model_name,
                known.join(", ")
            ))
        })
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

/// The configured key wins; an empty one falls back to the environment value.
pub fn resolve_api_key(configured: &str, env_value: Option<String>) -> Option<String> {
    if !configured.trim().is_empty() {
        return Some(configured.to_string());
    }
    env_value.filter(|k| !k.trim().is_empty())
}
