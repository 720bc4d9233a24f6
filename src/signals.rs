//! Lexicon-based signal extraction.
//!
//! Scans a comment against the lexicon and produces three bounded scores plus
//! a sarcasm flag. No I/O, no randomness: the same comment always yields the
//! same bundle.

use crate::lexicon::{
    NEGATIVE_EMOJIS, NEGATIVE_KEYWORDS, NEGATIVE_PHRASES, NEUTRAL_PHRASES, POSITIVE_EMOJIS,
    POSITIVE_KEYWORDS, REASSURANCE_PHRASES, SARCASM,
};
use serde::Serialize;
use utoipa::ToSchema;

pub const PHRASE_WEIGHT: f64 = 0.5;
pub const NEUTRAL_PHRASE_WEIGHT: f64 = 0.4;
pub const KEYWORD_WEIGHT: f64 = 0.25;
pub const EMOJI_WEIGHT: f64 = 0.15;
pub const REASSURANCE_BOOST: f64 = 0.4;
pub const SARCASM_NEGATIVE_BOOST: f64 = 0.3;
pub const SARCASM_POSITIVE_DAMPING: f64 = 0.3;
/// Negative score above which sarcastic positive wording is discounted.
pub const SARCASM_CONTEXT: f64 = 0.3;

/// Lexicon evidence for one comment. Scores are clamped to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
pub struct SignalBundle {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub sarcasm: bool,
    /// Positive emoji occurrences in the raw comment
    pub positive_emoji: usize,
    /// Negative emoji occurrences in the raw comment
    pub negative_emoji: usize,
}

impl SignalBundle {
    /// Absolute distance between the two polarity scores.
    pub fn polarity_gap(&self) -> f64 {
        (self.positive - self.negative).abs()
    }
}

/// Extract lexicon signals from a comment.
pub fn extract(comment: &str) -> SignalBundle {
    let lower = comment.to_lowercase();

    let mut positive = 0.0;
    let mut negative = 0.0;
    let mut neutral = 0.0;

    negative += PHRASE_WEIGHT * count_matches(&lower, NEGATIVE_PHRASES.iter()) as f64;
    neutral += NEUTRAL_PHRASE_WEIGHT * count_matches(&lower, NEUTRAL_PHRASES.iter()) as f64;
    positive += KEYWORD_WEIGHT * count_matches(&lower, POSITIVE_KEYWORDS.iter()) as f64;
    negative += KEYWORD_WEIGHT * count_matches(&lower, NEGATIVE_KEYWORDS.iter()) as f64;

    let positive_emoji = count_occurrences(comment, POSITIVE_EMOJIS.iter());
    let negative_emoji = count_occurrences(comment, NEGATIVE_EMOJIS.iter());
    positive += EMOJI_WEIGHT * positive_emoji as f64;
    negative += EMOJI_WEIGHT * negative_emoji as f64;

    if REASSURANCE_PHRASES.iter().any(|p| lower.contains(p)) {
        positive += REASSURANCE_BOOST;
    }

    let sarcasm = SARCASM.is_match(comment);
    if sarcasm && negative > 0.0 {
        negative += SARCASM_NEGATIVE_BOOST;
    }
    // Sarcastic praise inside an already negative comment
    if sarcasm && positive > 0.0 && negative > SARCASM_CONTEXT {
        positive = f64::max(0.0, positive - SARCASM_POSITIVE_DAMPING);
    }

    SignalBundle {
        positive: clamp_unit(positive),
        negative: clamp_unit(negative),
        neutral: clamp_unit(neutral),
        sarcasm,
        positive_emoji,
        negative_emoji,
    }
}

/// Number of distinct lexicon entries contained in `text`.
fn count_matches<'a>(text: &str, entries: impl Iterator<Item = &'a &'static str>) -> usize {
    entries.filter(|entry| text.contains(**entry)).count()
}

/// Total occurrences of every glyph in `text`.
fn count_occurrences<'a>(text: &str, glyphs: impl Iterator<Item = &'a &'static str>) -> usize {
    glyphs.map(|glyph| text.matches(*glyph).count()).sum()
}

fn clamp_unit(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}
