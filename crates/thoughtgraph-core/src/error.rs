//! Error types for Thoughtgraph

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("operation error: {operation} - {message}")]
    Operation { operation: String, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("graph error: {0}")]
    Graph(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn graph(message: impl Into<String>) -> Self {
        Self::Graph(message.into())
    }
}
