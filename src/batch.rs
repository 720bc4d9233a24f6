//! Chunked scoring over a list of comments.
//!
//! Knows nothing about datasets or resume state: it gets a slice of comments
//! and returns one label per comment, in the same order.

use crate::error::InferenceError;
use crate::fusion::{self, Resolution};
use crate::model::{ModelBackend, ModelJudgment};
use crate::signals;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Characters of a comment shown in failure logs.
const LOG_PREVIEW_CHARS: usize = 50;

/// Progress callback: `(completed_chunks, total_chunks)`.
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize);

pub struct BatchRunner<'a> {
    backend: &'a ModelBackend,
    chunk_delay: Duration,
}

impl<'a> BatchRunner<'a> {
    /// `chunk_delay` only applies to backends that pace their requests.
    pub fn new(backend: &'a ModelBackend, chunk_delay: Duration) -> Self {
        Self { backend, chunk_delay }
    }

    /// Effective chunk size after the backend's own limit.
    pub fn effective_chunk_size(&self, requested: usize) -> usize {
        let size = requested.max(1);
        match self.backend.max_chunk_size() {
            Some(max) => size.min(max),
            None => size,
        }
    }

    /// Score every comment. The result has exactly `comments.len()` labels.
    pub fn run(
        &self,
        comments: &[Option<&str>],
        chunk_size: usize,
        mut on_progress: Option<ProgressFn<'_>>,
    ) -> Vec<Resolution> {
        let chunk_size = self.effective_chunk_size(chunk_size);
        let total_chunks = comments.len().div_ceil(chunk_size);
        let mut results = Vec::with_capacity(comments.len());

        for (index, chunk) in comments.chunks(chunk_size).enumerate() {
            results.extend(self.run_chunk(chunk));

            let done = index + 1;
            debug!("Chunk {}/{} scored", done, total_chunks);
            if let Some(callback) = on_progress.as_mut() {
                callback(done, total_chunks);
            }
            if done < total_chunks && self.backend.paces_requests() && !self.chunk_delay.is_zero() {
                thread::sleep(self.chunk_delay);
            }
        }
        results
    }

    fn run_chunk(&self, chunk: &[Option<&str>]) -> Vec<Resolution> {
        // Only non-empty comments reach the model.
        let texts: Vec<&str> = chunk.iter().filter_map(|c| non_empty(*c)).collect();
        let outcomes = if texts.is_empty() {
            Vec::new()
        } else {
            self.backend.judge_batch(&texts)
        };
        let mut outcomes = outcomes.into_iter();
        let mut sent = 0;
        let fallback = self.backend.fallback();

        chunk
            .iter()
            .map(|comment| match non_empty(*comment) {
                None => Resolution::empty(),
                Some(text) => {
                    let outcome: Result<ModelJudgment, InferenceError> = outcomes
                        .next()
                        .unwrap_or(Err(InferenceError::MissingItem(sent)));
                    sent += 1;
                    if let Err(e) = &outcome {
                        warn!("Model failed on '{}': {}. Using fallback", preview(text), e);
                    }
                    fusion::resolve_outcome(&signals::extract(text), &outcome, fallback)
                }
            })
            .collect()
    }
}

fn non_empty(comment: Option<&str>) -> Option<&str> {
    comment.filter(|c| !c.trim().is_empty())
}

fn preview(text: &str) -> &str {
    crate::model::truncate_chars(text, LOG_PREVIEW_CHARS)
}
