//! Label distribution summary for a labeled dataset.

use crate::dataset::Dataset;
use crate::label::SentimentLabel;
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct LabelDistribution {
    pub total: usize,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    /// Empty or invalid label cells
    pub unlabeled: usize,
}

impl LabelDistribution {
    /// Count label cells in `label_column`. A missing column counts every row
    /// as unlabeled.
    pub fn from_dataset(dataset: &Dataset, label_column: &str) -> Self {
        let mut dist = Self {
            total: dataset.len(),
            ..Default::default()
        };
        let column = dataset.column_index(label_column);
        for row in 0..dataset.len() {
            let label = column
                .and_then(|c| dataset.cell(row, c))
                .and_then(SentimentLabel::parse_cell);
            dist.record(label);
        }
        dist
    }

    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a SentimentLabel>) -> Self {
        let mut dist = Self::default();
        for label in labels {
            dist.total += 1;
            dist.record(Some(*label));
        }
        dist
    }

    fn record(&mut self, label: Option<SentimentLabel>) {
        match label {
            Some(SentimentLabel::Positive) => self.positive += 1,
            Some(SentimentLabel::Neutral) => self.neutral += 1,
            Some(SentimentLabel::Negative) => self.negative += 1,
            None => self.unlabeled += 1,
        }
    }

    pub fn labeled(&self) -> usize {
        self.positive + self.neutral + self.negative
    }

    /// Share of `count` over all rows, in percent.
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }

    /// positive / negative, `None` when there are no negatives.
    pub fn positive_negative_ratio(&self) -> Option<f64> {
        (self.negative > 0).then(|| self.positive as f64 / self.negative as f64)
    }
}

impl fmt::Display for LabelDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total rows: {}", self.total)?;
        writeln!(f, "  Positive (1):  {:>6} ({:.1}%)", self.positive, self.percent(self.positive))?;
        writeln!(f, "  Neutral (0):   {:>6} ({:.1}%)", self.neutral, self.percent(self.neutral))?;
        writeln!(f, "  Negative (-1): {:>6} ({:.1}%)", self.negative, self.percent(self.negative))?;
        if self.unlabeled > 0 {
            writeln!(f, "  Unlabeled:     {:>6} ({:.1}%)", self.unlabeled, self.percent(self.unlabeled))?;
        }
        match self.positive_negative_ratio() {
            Some(ratio) => write!(f, "  Positive/negative ratio: {:.2}", ratio),
            None => write!(f, "  Positive/negative ratio: n/a"),
        }
    }
}
