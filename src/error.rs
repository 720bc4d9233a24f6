//! Error types for the sentiment engine.
//!
//! `SentimentError` covers everything that stops a run before or outside scoring
//! (configuration, model loading, dataset schema, I/O). `InferenceError` is the
//! per-item failure of a model call; it never escapes a batch and is always
//! turned into a fallback label by the fusion layer.

use thiserror::Error;

/// Fatal errors surfaced to the caller.
#[derive(Debug, Error)]
pub enum SentimentError {
    /// Missing API key, chunk size out of range, empty column name, ...
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Neither the requested model nor the fallback model answered the probe.
    #[error("Failed to load model '{model}' (fallback '{fallback}' also failed): {reason}")]
    ModelLoad {
        model: String,
        fallback: String,
        reason: String,
    },

    /// Dataset does not have the shape we need (missing text column, ragged rows).
    #[error("Input format error: {0}")]
    InputFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SentimentError>;

/// Recoverable failure of a single classifier / LLM call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed backend response: {0}")]
    Malformed(String),

    #[error("No sentiment value found in response {0:?}")]
    Unparsable(String),

    #[error("Value {0} is outside -1..=1")]
    OutOfRange(i64),

    #[error("Response had no value for item {0}")]
    MissingItem(usize),
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        InferenceError::Transport(e.to_string())
    }
}
