//! Model adapter: one of two backends, chosen at construction time.
//!
//! Both backends sit behind traits (`SequenceClassifier`, `TextGenerator`) so
//! the HTTP clients in `inference` can be swapped for fakes in tests. The rest
//! of the engine only talks to `ModelBackend`.

use crate::config::Backend;
use crate::error::{InferenceError, SentimentError};
use crate::label::SentimentLabel;
use crate::llm;
use tracing::{info, warn};

/// Text sent to a freshly connected classifier to check it is reachable.
const PROBE_TEXT: &str = "ok";

/// A backend's verdict on one comment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelJudgment {
    pub label: SentimentLabel,
    /// 0.0-1.0
    pub confidence: f64,
}

impl ModelJudgment {
    pub fn new(label: SentimentLabel, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { label, confidence }
    }

    /// Clean LLM answers carry no score; treat them as certain.
    pub fn certain(label: SentimentLabel) -> Self {
        Self::new(label, 1.0)
    }

    /// Stand-in used when the model could not be asked: neutral, no confidence.
    pub fn abstain() -> Self {
        Self::new(SentimentLabel::Neutral, 0.0)
    }
}

/// Raw output of a sequence classifier, in the model's own taxonomy.
#[derive(Debug, Clone, PartialEq)]
pub struct RawClassification {
    pub label: String,
    pub score: f64,
}

/// A pretrained sequence-classification model.
pub trait SequenceClassifier: Send + Sync {
    fn model_name(&self) -> &str;

    fn classify(&self, text: &str) -> Result<RawClassification, InferenceError>;
}

/// A generative text model driven by prompts.
pub trait TextGenerator: Send + Sync {
    fn model_name(&self) -> &str;

    fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String, InferenceError>;
}

/// How a failed model call is turned into a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Run the full precedence table with `model = 0, conf = 0`
    Abstain,
    /// Use the keyword-only decision table
    KeywordTable,
}

/// Map a classifier's native label onto the ternary scale.
///
/// Star ratings (nlptown): 4-5 stars positive, 1-2 stars negative, 3 neutral.
/// Named labels (cardiffnlp and friends): POSITIVE / NEGATIVE / NEUTRAL.
pub fn map_native_label(label: &str) -> SentimentLabel {
    let label = label.to_uppercase();
    if label.contains("5 STAR") || label.contains("4 STAR") {
        SentimentLabel::Positive
    } else if label.contains("1 STAR") || label.contains("2 STAR") {
        SentimentLabel::Negative
    } else if label.contains("POS") {
        SentimentLabel::Positive
    } else if label.contains("NEG") {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Local transformer backend.
pub struct LocalModel {
    classifier: Box<dyn SequenceClassifier>,
    max_input_chars: usize,
}

impl LocalModel {
    pub fn new(classifier: Box<dyn SequenceClassifier>, max_input_chars: usize) -> Self {
        Self {
            classifier,
            max_input_chars,
        }
    }

    /// Connect to `primary`, probing it once; on failure retry once with
    /// `fallback` before giving up.
    pub fn load<F>(
        primary: &str,
        fallback: &str,
        max_input_chars: usize,
        mut connect: F,
    ) -> Result<Self, SentimentError>
    where
        F: FnMut(&str) -> Box<dyn SequenceClassifier>,
    {
        info!("Loading sentiment model: {}", primary);
        let classifier = connect(primary);
        let primary_err = match classifier.classify(PROBE_TEXT) {
            Ok(_) => {
                info!("Model ready: {}", primary);
                return Ok(Self::new(classifier, max_input_chars));
            }
            Err(e) => e,
        };

        warn!("Failed to load model {}: {}. Trying fallback {}", primary, primary_err, fallback);
        let classifier = connect(fallback);
        match classifier.classify(PROBE_TEXT) {
            Ok(_) => {
                info!("Fallback model ready: {}", fallback);
                Ok(Self::new(classifier, max_input_chars))
            }
            Err(fallback_err) => Err(SentimentError::ModelLoad {
                model: primary.to_string(),
                fallback: fallback.to_string(),
                reason: format!("{}; fallback: {}", primary_err, fallback_err),
            }),
        }
    }

    pub fn model_name(&self) -> &str {
        self.classifier.model_name()
    }

    pub fn judge(&self, comment: &str) -> Result<ModelJudgment, InferenceError> {
        let text = truncate_chars(comment, self.max_input_chars);
        let raw = self.classifier.classify(text)?;
        Ok(ModelJudgment::new(map_native_label(&raw.label), raw.score))
    }
}

/// Prompted LLM backend.
pub struct LlmModel {
    generator: Box<dyn TextGenerator>,
}

impl LlmModel {
    pub fn new(generator: Box<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    pub fn judge(&self, comment: &str) -> Result<ModelJudgment, InferenceError> {
        let prompt = llm::single_prompt(comment);
        let response = self.generator.generate(&prompt, llm::SINGLE_OUTPUT_TOKENS)?;
        llm::parse_single(&response).map(ModelJudgment::certain)
    }

    /// One prompt for the whole slice. A transport failure fails every item.
    pub fn judge_batch(&self, comments: &[&str]) -> Vec<Result<ModelJudgment, InferenceError>> {
        if comments.is_empty() {
            return Vec::new();
        }
        let prompt = llm::batch_prompt(comments);
        match self.generator.generate(&prompt, llm::batch_output_tokens(comments.len())) {
            Ok(response) => llm::parse_batch(&response, comments.len())
                .into_iter()
                .map(|r| r.map(ModelJudgment::certain))
                .collect(),
            Err(e) => vec![Err(e); comments.len()],
        }
    }
}

/// The active backend of an analyzer.
pub enum ModelBackend {
    Local(LocalModel),
    Llm(LlmModel),
}

impl ModelBackend {
    pub fn kind(&self) -> Backend {
        match self {
            ModelBackend::Local(_) => Backend::LocalModel,
            ModelBackend::Llm(_) => Backend::Llm,
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            ModelBackend::Local(m) => m.model_name(),
            ModelBackend::Llm(m) => m.model_name(),
        }
    }

    pub fn judge(&self, comment: &str) -> Result<ModelJudgment, InferenceError> {
        match self {
            ModelBackend::Local(m) => m.judge(comment),
            ModelBackend::Llm(m) => m.judge(comment),
        }
    }

    /// Judge a chunk. Always returns exactly one outcome per comment, in order.
    pub fn judge_batch(&self, comments: &[&str]) -> Vec<Result<ModelJudgment, InferenceError>> {
        match self {
            ModelBackend::Local(m) => comments.iter().map(|c| m.judge(c)).collect(),
            ModelBackend::Llm(m) => m.judge_batch(comments),
        }
    }

    pub fn fallback(&self) -> Fallback {
        match self {
            ModelBackend::Local(_) => Fallback::Abstain,
            ModelBackend::Llm(_) => Fallback::KeywordTable,
        }
    }

    /// Upper bound on comments per chunk, if the backend has one.
    pub fn max_chunk_size(&self) -> Option<usize> {
        match self {
            ModelBackend::Local(_) => None,
            ModelBackend::Llm(_) => Some(llm::MAX_BATCH_ITEMS),
        }
    }

    /// Whether chunks should be spaced out to respect a remote rate limit.
    pub fn paces_requests(&self) -> bool {
        matches!(self, ModelBackend::Llm(_))
    }
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::Mutex;

    /// Classifier returning a fixed answer and recording what it was asked.
    pub struct FixedClassifier {
        pub name: String,
        pub answer: Result<RawClassification, InferenceError>,
        pub seen: Mutex<Vec<String>>,
    }

    impl FixedClassifier {
        pub fn new(label: &str, score: f64) -> Self {
            Self {
                name: "fixed".to_string(),
                answer: Ok(RawClassification {
                    label: label.to_string(),
                    score,
                }),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                name: "broken".to_string(),
                answer: Err(InferenceError::Transport("connection refused".to_string())),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl SequenceClassifier for FixedClassifier {
        fn model_name(&self) -> &str {
            &self.name
        }

        fn classify(&self, text: &str) -> Result<RawClassification, InferenceError> {
            self.seen.lock().unwrap().push(text.to_string());
            self.answer.clone()
        }
    }

    impl SequenceClassifier for std::sync::Arc<FixedClassifier> {
        fn model_name(&self) -> &str {
            &self.name
        }

        fn classify(&self, text: &str) -> Result<RawClassification, InferenceError> {
            self.as_ref().classify(text)
        }
    }

    /// Generator replaying a canned response and counting calls.
    pub struct CannedGenerator {
        pub response: Result<String, InferenceError>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        pub fn new(response: &str) -> Self {
            Self {
                response: Ok(response.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                response: Err(InferenceError::Status {
                    status: 429,
                    body: "quota".to_string(),
                }),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for CannedGenerator {
        fn model_name(&self) -> &str {
            "canned"
        }

        fn generate(&self, prompt: &str, _max_output_tokens: u32) -> Result<String, InferenceError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.response.clone()
        }
    }

    impl TextGenerator for std::sync::Arc<CannedGenerator> {
        fn model_name(&self) -> &str {
            "canned"
        }

        fn generate(&self, prompt: &str, max_output_tokens: u32) -> Result<String, InferenceError> {
            self.as_ref().generate(prompt, max_output_tokens)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_map_native_label() {
        assert_eq!(map_native_label("5 stars"), SentimentLabel::Positive);
        assert_eq!(map_native_label("4 stars"), SentimentLabel::Positive);
        assert_eq!(map_native_label("3 stars"), SentimentLabel::Neutral);
        assert_eq!(map_native_label("2 stars"), SentimentLabel::Negative);
        assert_eq!(map_native_label("1 star"), SentimentLabel::Negative);
        assert_eq!(map_native_label("positive"), SentimentLabel::Positive);
        assert_eq!(map_native_label("NEGATIVE"), SentimentLabel::Negative);
        assert_eq!(map_native_label("neutral"), SentimentLabel::Neutral);
        assert_eq!(map_native_label("LABEL_1"), SentimentLabel::Neutral);
    }

    #[test]
    fn test_judgment_confidence_clamped() {
        assert_eq!(ModelJudgment::new(SentimentLabel::Positive, 1.7).confidence, 1.0);
        assert_eq!(ModelJudgment::new(SentimentLabel::Positive, f64::NAN).confidence, 0.0);
        assert_eq!(ModelJudgment::abstain().label, SentimentLabel::Neutral);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("tuyệt vời", 5), "tuyệt");
        assert_eq!(truncate_chars("ok", 10), "ok");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_local_judge_truncates_and_maps() {
        let model = LocalModel::new(Box::new(FixedClassifier::new("5 stars", 0.8)), 4);
        let judgment = model.judge("xinh quá đi").unwrap();
        assert_eq!(judgment.label, SentimentLabel::Positive);
        assert!((judgment.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_load_uses_primary_when_reachable() {
        let mut asked = Vec::new();
        let model = LocalModel::load("primary", "backup", 512, |name| {
            asked.push(name.to_string());
            Box::new(FixedClassifier::new("positive", 0.9))
        })
        .unwrap();
        assert_eq!(asked, vec!["primary"]);
        assert_eq!(model.model_name(), "fixed");
    }

    #[test]
    fn test_load_falls_back_once() {
        let mut asked = Vec::new();
        let model = LocalModel::load("primary", "backup", 512, |name| -> Box<dyn SequenceClassifier> {
            asked.push(name.to_string());
            if name == "primary" {
                Box::new(FixedClassifier::failing())
            } else {
                Box::new(FixedClassifier::new("3 stars", 0.5))
            }
        });
        assert!(model.is_ok());
        assert_eq!(asked, vec!["primary", "backup"]);
    }

    #[test]
    fn test_load_fails_when_both_unreachable() {
        let result = LocalModel::load("primary", "backup", 512, |_| Box::new(FixedClassifier::failing()));
        match result {
            Err(SentimentError::ModelLoad { model, fallback, .. }) => {
                assert_eq!(model, "primary");
                assert_eq!(fallback, "backup");
            }
            _ => panic!("expected ModelLoad error"),
        }
    }

    #[test]
    fn test_llm_judge_parses_number() {
        let model = LlmModel::new(Box::new(CannedGenerator::new(" -1\n")));
        let judgment = model.judge("tẩy chay").unwrap();
        assert_eq!(judgment.label, SentimentLabel::Negative);
        assert_eq!(judgment.confidence, 1.0);
    }

    #[test]
    fn test_llm_judge_garbage_is_error() {
        let model = LlmModel::new(Box::new(CannedGenerator::new("không rõ")));
        assert!(matches!(model.judge("abc"), Err(InferenceError::Unparsable(_))));
    }

    #[test]
    fn test_llm_batch_transport_failure_fails_every_item() {
        let model = LlmModel::new(Box::new(CannedGenerator::failing()));
        let out = model.judge_batch(&["a", "b", "c"]);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|r| r.is_err()));
    }

    #[test]
    fn test_llm_batch_single_prompt() {
        let generator = Arc::new(CannedGenerator::new("1\n0\n-1"));
        let model = LlmModel::new(Box::new(generator.clone()));
        let out = model.judge_batch(&["a", "b", "c"]);
        let labels: Vec<_> = out.into_iter().map(|r| r.unwrap().label).collect();
        assert_eq!(
            labels,
            vec![SentimentLabel::Positive, SentimentLabel::Neutral, SentimentLabel::Negative]
        );
        assert_eq!(generator.prompts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_backend_policies() {
        let local = ModelBackend::Local(LocalModel::new(Box::new(FixedClassifier::new("pos", 1.0)), 512));
        let llm = ModelBackend::Llm(LlmModel::new(Box::new(CannedGenerator::new("1"))));
        assert_eq!(local.fallback(), Fallback::Abstain);
        assert_eq!(llm.fallback(), Fallback::KeywordTable);
        assert_eq!(local.max_chunk_size(), None);
        assert_eq!(llm.max_chunk_size(), Some(20));
        assert!(llm.paces_requests());
        assert!(!local.paces_requests());
        assert_eq!(local.kind(), Backend::LocalModel);
    }
}
