//! The ternary label written into the dataset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Final sentiment of a comment: -1 negative, 0 neutral, 1 positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    /// Numeric value stored in the label column.
    pub fn value(self) -> i8 {
        match self {
            SentimentLabel::Negative => -1,
            SentimentLabel::Neutral => 0,
            SentimentLabel::Positive => 1,
        }
    }

    /// Map an integer to a label; anything outside -1..=1 is rejected.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            -1 => Some(SentimentLabel::Negative),
            0 => Some(SentimentLabel::Neutral),
            1 => Some(SentimentLabel::Positive),
            _ => None,
        }
    }

    /// Parse an existing dataset cell. Accepts `1`, `-1`, `0` and their float
    /// spellings (`1.0`) which pandas produces for columns that held NaN.
    pub fn parse_cell(cell: &str) -> Option<Self> {
        let cell = cell.trim();
        if let Ok(v) = cell.parse::<i64>() {
            return Self::from_value(v);
        }
        let f = cell.parse::<f64>().ok()?;
        if f.fract() != 0.0 {
            return None;
        }
        Self::from_value(f as i64)
    }

    pub fn name(self) -> &'static str {
        match self {
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Positive => "positive",
        }
    }
}

impl From<SentimentLabel> for i8 {
    fn from(label: SentimentLabel) -> i8 {
        label.value()
    }
}

impl TryFrom<i8> for SentimentLabel {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        SentimentLabel::from_value(v as i64).ok_or_else(|| format!("invalid sentiment label: {}", v))
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}
