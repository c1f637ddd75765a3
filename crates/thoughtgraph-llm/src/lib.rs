//! Thoughtgraph LLM - Language model clients for thought generation

pub mod config;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod types;

pub use config::{resolve_api_key, ModelConfig, ModelConfigFile, StopSequence};
pub use mock::MockModel;
pub use openai::{ChatGpt, RetryPolicy};
pub use provider::{LanguageModel, LlmError, LlmResult};
pub use tokio_util::sync::CancellationToken;
pub use types::*;
