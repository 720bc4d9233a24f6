//! Analyzer configuration.
//!
//! One immutable struct is built up front (defaults, then environment, then CLI
//! overrides) and handed to `SentimentAnalyzer::new`. Nothing reads the
//! environment after construction.

use crate::error::{Result, SentimentError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_LOCAL_MODEL: &str = "cardiffnlp/twitter-roberta-base-sentiment-latest";
pub const FALLBACK_LOCAL_MODEL: &str = "nlptown/bert-base-multilingual-uncased-sentiment";
pub const DEFAULT_LLM_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_INFERENCE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TEXT_COLUMN: &str = "text";
pub const DEFAULT_LABEL_COLUMN: &str = "sentiment";
pub const DEFAULT_CHUNK_SIZE: usize = 32;
pub const MIN_CHUNK_SIZE: usize = 8;
pub const MAX_CHUNK_SIZE: usize = 64;

/// Which model backend scores comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Transformer sequence classifier behind an inference endpoint
    #[value(alias = "local")]
    LocalModel,
    /// Prompted generative model (Gemini)
    #[value(alias = "gemini")]
    Llm,
}

impl Backend {
    pub fn default_model(self) -> &'static str {
        match self {
            Backend::LocalModel => DEFAULT_LOCAL_MODEL,
            Backend::Llm => DEFAULT_LLM_MODEL,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::LocalModel => write!(f, "local-model"),
            Backend::Llm => write!(f, "llm"),
        }
    }
}

impl FromStr for Backend {
    type Err = SentimentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "local-model" | "transformer" => Ok(Backend::LocalModel),
            "llm" | "gemini" => Ok(Backend::Llm),
            other => Err(SentimentError::Configuration(format!(
                "Unknown backend '{}' (expected 'local-model' or 'llm')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub backend: Backend,
    /// Model name; `None` picks the backend default.
    pub model_name: Option<String>,
    /// Required iff `backend == Llm`.
    pub api_key: Option<String>,
    /// Base URL of the sequence-classification endpoint (local backend).
    pub inference_url: String,
    pub chunk_size: usize,
    pub text_column: String,
    pub label_column: String,
    pub request_timeout: Duration,
    /// Pause between LLM chunks to stay under the API rate limit.
    pub llm_chunk_delay: Duration,
    /// Comments are cut to this many characters before classification.
    pub max_input_chars: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            backend: Backend::LocalModel,
            model_name: None,
            api_key: None,
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            text_column: DEFAULT_TEXT_COLUMN.to_string(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            request_timeout: Duration::from_secs(30),
            llm_chunk_delay: Duration::from_millis(200),
            max_input_chars: 512,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults overlaid with environment variables (after loading `.env`).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reading from an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(backend) = get("SENTIMENT_BACKEND") {
            config.backend = backend.parse()?;
        }
        config.model_name = match config.backend {
            Backend::LocalModel => get("SENTIMENT_MODEL"),
            Backend::Llm => get("GEMINI_MODEL").or_else(|| get("SENTIMENT_MODEL")),
        };
        config.api_key = get("GEMINI_API_KEY");
        if let Some(url) = get("INFERENCE_URL") {
            config.inference_url = url;
        }
        if let Some(size) = get("SENTIMENT_CHUNK_SIZE") {
            config.chunk_size = parse_number("SENTIMENT_CHUNK_SIZE", &size)?;
        }
        if let Some(col) = get("SENTIMENT_TEXT_COLUMN") {
            config.text_column = col;
        }
        if let Some(col) = get("SENTIMENT_LABEL_COLUMN") {
            config.label_column = col;
        }
        if let Some(secs) = get("SENTIMENT_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(parse_number("SENTIMENT_TIMEOUT_SECS", &secs)?);
        }

        debug!("Configuration resolved: backend={}, chunk_size={}", config.backend, config.chunk_size);
        Ok(config)
    }

    /// Model name actually used, falling back to the backend default.
    pub fn resolved_model(&self) -> &str {
        self.model_name.as_deref().unwrap_or_else(|| self.backend.default_model())
    }

    /// Reject configurations that cannot run. Called before any processing.
    pub fn validate(&self) -> Result<()> {
        if self.backend == Backend::Llm && !self.api_key.as_deref().map(is_valid_key).unwrap_or(false) {
            return Err(SentimentError::Configuration(
                "LLM backend requires an API key (set GEMINI_API_KEY or pass --api-key)".to_string(),
            ));
        }
        self.validate_layout()
    }

    /// Checks that do not depend on how the backend is reached.
    pub fn validate_layout(&self) -> Result<()> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(SentimentError::Configuration(format!(
                "chunk size {} is outside {}..={}",
                self.chunk_size, MIN_CHUNK_SIZE, MAX_CHUNK_SIZE
            )));
        }
        if self.text_column.trim().is_empty() || self.label_column.trim().is_empty() {
            return Err(SentimentError::Configuration(
                "text and label column names must not be empty".to_string(),
            ));
        }
        if self.text_column == self.label_column {
            return Err(SentimentError::Configuration(format!(
                "text and label columns must differ (both are '{}')",
                self.text_column
            )));
        }
        if self.max_input_chars == 0 {
            return Err(SentimentError::Configuration("max_input_chars must be positive".to_string()));
        }
        Ok(())
    }
}

/// Non-empty, non-whitespace key.
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| SentimentError::Configuration(format!("{} must be a number, got '{}'", name, raw)))
}
