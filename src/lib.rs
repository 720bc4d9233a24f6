//! Ternary sentiment labelling (-1 / 0 / 1) for Vietnamese social-media
//! comments. Lexicon signals are fused with a transformer classifier or an
//! LLM under a fixed precedence policy, and applied to CSV datasets with
//! resume support.

pub mod analyzer;
pub mod batch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fusion;
pub mod inference;
pub mod label;
pub mod lexicon;
pub mod llm;
pub mod model;
pub mod report;
pub mod server;
pub mod signals;

pub use analyzer::{Explanation, ProcessSummary, SentimentAnalyzer};
pub use config::{AnalyzerConfig, Backend};
pub use dataset::Dataset;
pub use error::{InferenceError, Result, SentimentError};
pub use fusion::{keyword_decision, resolve, resolve_outcome};
pub use label::SentimentLabel;
pub use model::{
    Fallback, LlmModel, LocalModel, ModelBackend, ModelJudgment, RawClassification,
    SequenceClassifier, TextGenerator,
};
pub use report::LabelDistribution;
pub use signals::{extract, SignalBundle};
