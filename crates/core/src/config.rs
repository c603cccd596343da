//! Run configuration, passed explicitly into each component.

use crate::error::PipelineError;
use std::num::NonZeroU32;

/// Default number of subtitle records sent per translation request.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default target language.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Bounds for the retry loop around a single batch.
///
/// The default is unbounded: a batch is resubmitted until the backend
/// returns one line per input. Callers that need a liveness guarantee set
/// `max_attempts` and handle
/// [`PipelineError::RetryBudgetExhausted`](crate::error::PipelineError).
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    pub max_attempts: Option<NonZeroU32>,
}

impl RetryPolicy {
    /// Policy that gives up after `max_attempts` tries per batch.
    pub fn bounded(max_attempts: NonZeroU32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }
}

/// Settings for one translation run.
#[derive(Debug, Clone)]
pub struct TranslateConfig {
    /// Language the subtitles are translated into.
    pub target_language: String,
    /// Records per translation request.
    pub batch_size: usize,
    /// Model identifier handed to the backend.
    pub model: String,
    /// Log retry diagnostics at warn level instead of debug.
    pub verbose: bool,
    /// Batches in flight at once; 1 selects the resumable sequential mode.
    pub workers: usize,
    /// Retry bounds for each batch.
    pub retry: RetryPolicy,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            target_language: DEFAULT_LANGUAGE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            model: DEFAULT_MODEL.to_string(),
            verbose: false,
            workers: 1,
            retry: RetryPolicy::default(),
        }
    }
}

impl TranslateConfig {
    /// Reject settings that would misbehave before any network call is made.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.batch_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
