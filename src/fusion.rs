//! Reconciles lexicon signals with the model's verdict.
//!
//! `resolve` walks a fixed precedence table: the first matching rule wins.
//! Emoji reinforcement then runs on that label, and neutral damping runs on
//! whatever emoji reinforcement left. `keyword_decision` is the model-free table used when the LLM
//! answer could not be used.

use crate::error::InferenceError;
use crate::label::SentimentLabel;
use crate::model::{Fallback, ModelJudgment};
use crate::signals::SignalBundle;
use serde::Serialize;
use utoipa::ToSchema;

/// Which precedence rule produced a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Explanatory phrasing with no clear polarity
    NeutralOverride,
    StrongNegative,
    StrongPositive,
    LexiconNegativeOverUnsureModel,
    LexiconPositiveOverUnsureModel,
    NegativeGapOverridesModel,
    PositiveGapOverridesModel,
    ConfidentModel,
    NegativeLean,
    PositiveLean,
    ModelDefault,
    /// Model unavailable; decided from keywords alone
    KeywordFallback,
    /// Nothing to score
    EmptyComment,
}

/// Post-rule correction applied to the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    EmojiNegative,
    EmojiPositive,
    NeutralDamping,
}

/// A label together with how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Resolution {
    #[schema(value_type = i8)]
    pub label: SentimentLabel,
    pub rule: Rule,
    /// Adjustments in the order they were applied
    pub adjustments: Vec<Adjustment>,
}

impl Resolution {
    fn plain(label: SentimentLabel, rule: Rule) -> Self {
        Self {
            label,
            rule,
            adjustments: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::plain(SentimentLabel::Neutral, Rule::EmptyComment)
    }
}

/// Final label for `signals` given a successful model judgment.
pub fn resolve(signals: &SignalBundle, judgment: ModelJudgment) -> SentimentLabel {
    resolve_explained(signals, judgment).label
}

pub fn resolve_explained(signals: &SignalBundle, judgment: ModelJudgment) -> Resolution {
    let pos = signals.positive;
    let neg = signals.negative;
    let neu = signals.neutral;
    let conf = judgment.confidence;
    let model = judgment.label;

    if neu > 0.5 && signals.polarity_gap() < 0.4 {
        return Resolution::plain(SentimentLabel::Neutral, Rule::NeutralOverride);
    }

    let (label, rule) = if neg > 0.7 {
        (SentimentLabel::Negative, Rule::StrongNegative)
    } else if pos > 0.7 && neg < 0.3 {
        (SentimentLabel::Positive, Rule::StrongPositive)
    } else if neg > 0.5 && conf < 0.6 {
        (SentimentLabel::Negative, Rule::LexiconNegativeOverUnsureModel)
    } else if pos > 0.5 && neg < 0.3 && conf < 0.6 {
        (SentimentLabel::Positive, Rule::LexiconPositiveOverUnsureModel)
    } else if neg > pos + 0.4 && model.value() >= 0 {
        (SentimentLabel::Negative, Rule::NegativeGapOverridesModel)
    } else if pos > neg + 0.4 && model.value() <= 0 {
        (SentimentLabel::Positive, Rule::PositiveGapOverridesModel)
    } else if signals.polarity_gap() < 0.3 && conf > 0.7 {
        (model, Rule::ConfidentModel)
    } else if neg > pos + 0.3 {
        (SentimentLabel::Negative, Rule::NegativeLean)
    } else if pos > neg + 0.3 {
        (SentimentLabel::Positive, Rule::PositiveLean)
    } else {
        (model, Rule::ModelDefault)
    };

    let mut resolution = Resolution::plain(label, rule);
    if let Some((label, adjustment)) = reinforce_with_emoji(signals, resolution.label) {
        resolution.label = label;
        resolution.adjustments.push(adjustment);
    }
    if damps_to_neutral(signals, resolution.label) {
        resolution.label = SentimentLabel::Neutral;
        resolution.adjustments.push(Adjustment::NeutralDamping);
    }
    resolution
}

fn reinforce_with_emoji(signals: &SignalBundle, label: SentimentLabel) -> Option<(SentimentLabel, Adjustment)> {
    if signals.negative_emoji >= 2 && label.value() >= 0 {
        Some((SentimentLabel::Negative, Adjustment::EmojiNegative))
    } else if signals.positive_emoji >= 2 && signals.negative < 0.4 && label.value() <= 0 {
        Some((SentimentLabel::Positive, Adjustment::EmojiPositive))
    } else {
        None
    }
}

/// A polar label backed by a weak directional score in a mostly neutral comment.
fn damps_to_neutral(signals: &SignalBundle, label: SentimentLabel) -> bool {
    signals.neutral > 0.4
        && match label {
            SentimentLabel::Positive => signals.positive < 0.5,
            SentimentLabel::Negative => signals.negative < 0.5,
            SentimentLabel::Neutral => false,
        }
}

/// Keyword-only decision, ignoring any model output.
pub fn keyword_decision(signals: &SignalBundle) -> SentimentLabel {
    let pos = signals.positive;
    let neg = signals.negative;

    if neg > 0.5 {
        SentimentLabel::Negative
    } else if pos > 0.5 && neg < 0.3 {
        SentimentLabel::Positive
    } else if neg > pos + 0.2 {
        SentimentLabel::Negative
    } else if pos > neg + 0.2 {
        SentimentLabel::Positive
    } else if signals.neutral > 0.6 && signals.polarity_gap() < 0.2 {
        SentimentLabel::Neutral
    } else if neg > 0.2 {
        SentimentLabel::Negative
    } else if pos > 0.2 {
        SentimentLabel::Positive
    } else {
        SentimentLabel::Neutral
    }
}

/// Resolve a model outcome, routing failures through the backend's fallback.
pub fn resolve_outcome(
    signals: &SignalBundle,
    outcome: &Result<ModelJudgment, InferenceError>,
    fallback: Fallback,
) -> Resolution {
    match (outcome, fallback) {
        (Ok(judgment), _) => resolve_explained(signals, *judgment),
        (Err(_), Fallback::Abstain) => resolve_explained(signals, ModelJudgment::abstain()),
        (Err(_), Fallback::KeywordTable) => {
            Resolution::plain(keyword_decision(signals), Rule::KeywordFallback)
        }
    }
}
