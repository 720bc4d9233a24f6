//! HTTP clients for the two model backends.
//!
//! `HttpClassifier` speaks the Hugging Face text-classification protocol
//! (`POST {base}/models/{model}` with `{"inputs": text}`), which is what the
//! local inference sidecar and the hosted Inference API both serve.
//! `GeminiClient` calls the Gemini `generateContent` REST endpoint.

use crate::error::InferenceError;
use crate::model::{RawClassification, SequenceClassifier, TextGenerator};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_TEMPERATURE: f64 = 0.2;

/// Blocking client shared by every classifier built from one configuration.
pub fn build_client(timeout: Duration) -> Result<Client, InferenceError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(InferenceError::from)
}

/// Turn a non-2xx response into an error, keeping the body for the log.
fn check_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, InferenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(InferenceError::Status {
        status: status.as_u16(),
        body,
    })
}

#[derive(Debug, Deserialize)]
struct ScoredLabel {
    label: String,
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Nested(Vec<Vec<ScoredLabel>>),
    Flat(Vec<ScoredLabel>),
    Error { error: String },
}

impl ClassificationResponse {
    fn best(self) -> Result<RawClassification, InferenceError> {
        let candidates = match self {
            ClassificationResponse::Nested(rows) => rows.into_iter().flatten().collect(),
            ClassificationResponse::Flat(row) => row,
            ClassificationResponse::Error { error } => return Err(InferenceError::Malformed(error)),
        };
        candidates
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .map(|c| RawClassification {
                label: c.label,
                score: c.score,
            })
            .ok_or_else(|| InferenceError::Malformed("empty classification list".to_string()))
    }
}

/// Sequence classifier served over HTTP.
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
    model: String,
}

impl HttpClassifier {
    pub fn with_client(client: Client, base_url: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/models/{}", base_url.trim_end_matches('/'), model),
            model: model.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SequenceClassifier for HttpClassifier {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn classify(&self, text: &str) -> Result<RawClassification, InferenceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "inputs": text }))
            .send()?;
        let parsed: ClassificationResponse = check_status(response)?
            .json()
            .map_err(|e| InferenceError::Malformed(e.to_string()))?;
        parsed.best()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Result<String, InferenceError> {
        let content = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| InferenceError::Malformed("response has no candidates".to_string()))?;
        Ok(content.parts.into_iter().filter_map(|p| p.text).collect())
    }
}

/// Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn with_client(client: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl TextGenerator for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String, InferenceError> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: GEMINI_TEMPERATURE,
                max_output_tokens,
            },
        };
        debug!("Calling {} (max {} tokens)", self.model, max_output_tokens);
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()?;
        let parsed: GenerateResponse = check_status(response)?
            .json()
            .map_err(|e| InferenceError::Malformed(e.to_string()))?;
        parsed.text()
    }
}
