//! The entry point callers use: owns the configuration and the model backend,
//! scores single comments and labels whole datasets.

use crate::batch::{BatchRunner, ProgressFn};
use crate::config::{AnalyzerConfig, Backend, FALLBACK_LOCAL_MODEL};
use crate::dataset::Dataset;
use crate::error::{Result, SentimentError};
use crate::fusion::{self, Resolution};
use crate::inference::{self, GeminiClient, HttpClassifier, GEMINI_BASE_URL};
use crate::label::SentimentLabel;
use crate::model::{LlmModel, LocalModel, ModelBackend, SequenceClassifier};
use crate::report::LabelDistribution;
use crate::signals::{self, SignalBundle};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

/// Full account of how one comment was labeled.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Explanation {
    #[schema(value_type = i8)]
    pub label: SentimentLabel,
    pub signals: SignalBundle,
    pub resolution: Resolution,
    /// `None` when the comment was empty or the model call failed
    pub model_label: Option<i8>,
    pub model_confidence: Option<f64>,
}

/// Outcome of one `process` call.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProcessSummary {
    /// Rows that were scored in this run
    pub scored: usize,
    /// Rows that already had a label and were left alone
    pub skipped: usize,
    pub distribution: LabelDistribution,
}

pub struct SentimentAnalyzer {
    config: AnalyzerConfig,
    backend: Arc<ModelBackend>,
}

impl SentimentAnalyzer {
    /// Validate `config` and connect the configured backend.
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;
        let backend = connect_backend(&config)?;
        info!("Sentiment analyzer ready ({} / {})", config.backend, backend.model_name());
        Ok(Self {
            config,
            backend: Arc::new(backend),
        })
    }

    /// Use an already-built backend (tests, custom classifiers). Credentials
    /// are the backend's concern, so only the layout is validated.
    pub fn with_backend(config: AnalyzerConfig, backend: ModelBackend) -> Result<Self> {
        config.validate_layout()?;
        Ok(Self {
            config,
            backend: Arc::new(backend),
        })
    }

    /// Same backend, different CSV columns. Nothing is reconnected.
    pub fn with_columns(&self, text_column: Option<String>, label_column: Option<String>) -> Result<Self> {
        let mut config = self.config.clone();
        if let Some(column) = text_column {
            config.text_column = column;
        }
        if let Some(column) = label_column {
            config.label_column = column;
        }
        config.validate_layout()?;
        Ok(Self {
            config,
            backend: Arc::clone(&self.backend),
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn backend(&self) -> &ModelBackend {
        &self.backend
    }

    /// Label one comment. Missing or blank comments are neutral.
    pub fn score(&self, comment: Option<&str>) -> SentimentLabel {
        self.explain(comment).label
    }

    pub fn explain(&self, comment: Option<&str>) -> Explanation {
        let text = match comment.filter(|c| !c.trim().is_empty()) {
            Some(text) => text,
            None => {
                return Explanation {
                    label: SentimentLabel::Neutral,
                    signals: SignalBundle::default(),
                    resolution: Resolution::empty(),
                    model_label: None,
                    model_confidence: None,
                }
            }
        };

        let signals = signals::extract(text);
        let outcome = self.backend.judge(text);
        let resolution = fusion::resolve_outcome(&signals, &outcome, self.backend.fallback());
        let judgment = outcome.ok();
        Explanation {
            label: resolution.label,
            signals,
            resolution,
            model_label: judgment.map(|j| j.label.value()),
            model_confidence: judgment.map(|j| j.confidence),
        }
    }

    /// Label a list of comments in chunks; one label per comment, same order.
    pub fn run(&self, comments: &[Option<&str>], on_progress: Option<ProgressFn<'_>>) -> Vec<SentimentLabel> {
        BatchRunner::new(&self.backend, self.config.llm_chunk_delay)
            .run(comments, self.config.chunk_size, on_progress)
            .into_iter()
            .map(|r| r.label)
            .collect()
    }

    /// Label every row of `dataset` whose label cell is empty. Rows that
    /// already carry a label are not touched, so a second run is a no-op.
    pub fn process(&self, dataset: &mut Dataset, on_progress: Option<ProgressFn<'_>>) -> Result<ProcessSummary> {
        let text_column = dataset.require_column(&self.config.text_column)?;
        let label_column = dataset.ensure_column(&self.config.label_column, "");
        let pending = dataset.pending_rows(label_column);
        let skipped = dataset.len() - pending.len();

        if pending.is_empty() {
            info!("All {} rows already labeled; nothing to do", dataset.len());
        } else {
            info!("Scoring {} of {} rows ({} already labeled)", pending.len(), dataset.len(), skipped);
            let labels = {
                let all_comments = dataset.comments(text_column);
                let comments: Vec<Option<&str>> = pending.iter().map(|&row| all_comments[row]).collect();
                self.run(&comments, on_progress)
            };
            dataset.set_labels(label_column, &pending, &labels);
        }

        let distribution = LabelDistribution::from_dataset(dataset, &self.config.label_column);
        info!(
            "Done: {} positive, {} neutral, {} negative",
            distribution.positive, distribution.neutral, distribution.negative
        );
        Ok(ProcessSummary {
            scored: pending.len(),
            skipped,
            distribution,
        })
    }

    /// Load `input`, label it and write it to `output` (or back to `input`).
    pub fn process_file(
        &self,
        input: &Path,
        output: Option<&Path>,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<ProcessSummary> {
        let mut dataset = Dataset::from_path(input)?;
        let summary = self.process(&mut dataset, on_progress)?;
        let target = output.unwrap_or(input);
        dataset.write_csv(target)?;
        info!("Saved {}", target.display());
        Ok(summary)
    }
}

fn connect_backend(config: &AnalyzerConfig) -> Result<ModelBackend> {
    let client = inference::build_client(config.request_timeout)
        .map_err(|e| SentimentError::Configuration(format!("could not build HTTP client: {}", e)))?;

    match config.backend {
        Backend::LocalModel => {
            let model = LocalModel::load(
                config.resolved_model(),
                FALLBACK_LOCAL_MODEL,
                config.max_input_chars,
                |name| -> Box<dyn SequenceClassifier> {
                    Box::new(HttpClassifier::with_client(client.clone(), &config.inference_url, name))
                },
            )?;
            Ok(ModelBackend::Local(model))
        }
        Backend::Llm => {
            let key = config.api_key.as_deref().unwrap_or_default();
            let gemini = GeminiClient::with_client(client, GEMINI_BASE_URL, key, config.resolved_model());
            Ok(ModelBackend::Llm(LlmModel::new(Box::new(gemini))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fakes::{CannedGenerator, FixedClassifier};

    fn local(label: &str, score: f64) -> SentimentAnalyzer {
        let backend = ModelBackend::Local(LocalModel::new(Box::new(FixedClassifier::new(label, score)), 512));
        SentimentAnalyzer::with_backend(AnalyzerConfig::default(), backend).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = AnalyzerConfig {
            backend: Backend::Llm,
            ..Default::default()
        };
        assert!(matches!(SentimentAnalyzer::new(config), Err(SentimentError::Configuration(_))));
    }

    #[test]
    fn test_new_fails_when_endpoint_unreachable() {
        let config = AnalyzerConfig {
            inference_url: "http://127.0.0.1:9".to_string(),
            request_timeout: std::time::Duration::from_millis(500),
            ..Default::default()
        };
        assert!(matches!(SentimentAnalyzer::new(config), Err(SentimentError::ModelLoad { .. })));
    }

    #[test]
    fn test_empty_comment_is_neutral_without_model() {
        let analyzer = local("1 star", 0.99);
        for comment in [None, Some(""), Some("   \t")] {
            let explanation = analyzer.explain(comment);
            assert_eq!(explanation.label, SentimentLabel::Neutral);
            assert_eq!(explanation.resolution.rule, fusion::Rule::EmptyComment);
            assert_eq!(explanation.model_label, None);
        }
    }

    #[test]
    fn test_three_scenarios() {
        let analyzer = local("positive", 0.95);
        assert_eq!(analyzer.score(Some("tẩy chay thương hiệu này, quá tệ")), SentimentLabel::Negative);

        let analyzer = local("negative", 0.9);
        assert_eq!(
            analyzer.score(Some("nhân viên order qua app rồi bấm note như vậy")),
            SentimentLabel::Neutral
        );

        let analyzer = local("neutral", 0.8);
        assert_eq!(
            analyzer.score(Some("sản phẩm này thật tuyệt vời, tôi rất thích! 😍😍")),
            SentimentLabel::Positive
        );
    }

    #[test]
    fn test_explain_reports_model_view() {
        let analyzer = local("4 stars", 0.8);
        let explanation = analyzer.explain(Some("hôm nay"));
        assert_eq!(explanation.model_label, Some(1));
        assert_eq!(explanation.model_confidence, Some(0.8));
        assert_eq!(explanation.label, SentimentLabel::Positive);
    }

    #[test]
    fn test_llm_with_injected_generator_needs_no_key() {
        let config = AnalyzerConfig {
            backend: Backend::Llm,
            ..Default::default()
        };
        let backend = ModelBackend::Llm(LlmModel::new(Box::new(CannedGenerator::new("1"))));
        let analyzer = SentimentAnalyzer::with_backend(config, backend).unwrap();
        assert_eq!(analyzer.score(Some("hôm nay")), SentimentLabel::Positive);
    }

    #[test]
    fn test_process_adds_column_and_is_idempotent() {
        let analyzer = local("neutral", 0.9);
        let mut ds = Dataset::from_csv_str("id,text\n1,tẩy chay\n2,\n3,đẹp quá 😍😍\n").unwrap();

        let summary = analyzer.process(&mut ds, None).unwrap();
        assert_eq!(summary.scored, 3);
        assert_eq!(summary.skipped, 0);
        assert_eq!(ds.headers, vec!["id", "text", "sentiment"]);
        assert_eq!(ds.comments(2), vec![Some("-1"), Some("0"), Some("1")]);

        let before = ds.clone();
        let again = analyzer.process(&mut ds, None).unwrap();
        assert_eq!(again.scored, 0);
        assert_eq!(again.skipped, 3);
        assert_eq!(ds, before);
    }

    #[test]
    fn test_with_columns_shares_backend() {
        let classifier = std::sync::Arc::new(FixedClassifier::new("negative", 0.9));
        let backend = ModelBackend::Local(LocalModel::new(Box::new(classifier.clone()), 512));
        let analyzer = SentimentAnalyzer::with_backend(AnalyzerConfig::default(), backend).unwrap();

        let relabeled = analyzer.with_columns(Some("body".to_string()), Some("trust".to_string())).unwrap();
        assert_eq!(relabeled.config().text_column, "body");
        assert_eq!(relabeled.config().label_column, "trust");
        assert_eq!(analyzer.config().text_column, "text");

        let mut ds = Dataset::from_csv_str("body
chán quá
").unwrap();
        relabeled.process(&mut ds, None).unwrap();
        assert_eq!(ds.headers, vec!["body", "trust"]);
        assert_eq!(classifier.seen.lock().unwrap().len(), 1);

        let err = analyzer.with_columns(Some("x".to_string()), Some("x".to_string()));
        assert!(matches!(err, Err(SentimentError::Configuration(_))));
    }

    #[test]
    fn test_process_requires_text_column() {
        let analyzer = local("neutral", 0.9);
        let mut ds = Dataset::from_csv_str("id,comment\n1,hay\n").unwrap();
        let err = analyzer.process(&mut ds, None).unwrap_err();
        assert!(matches!(err, SentimentError::InputFormat(_)));
        assert_eq!(ds.headers, vec!["id", "comment"]);
    }

    #[test]
    fn test_process_file_overwrites_input_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comments.csv");
        std::fs::write(&path, "\u{feff}text\nchán quá\n").unwrap();

        let analyzer = local("negative", 0.9);
        let summary = analyzer.process_file(&path, None, None).unwrap();
        assert_eq!(summary.distribution.negative, 1);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with('\u{feff}'));
        assert!(written.contains("text,sentiment"));
        assert!(written.contains("chán quá,-1"));
    }
}
