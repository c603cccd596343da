//! Typed pipeline errors callers can match on.
//!
//! Most failures travel as `anyhow` errors; the kinds below are the ones
//! with dedicated handling at the call site.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rejected before any network activity begins.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A bounded retry policy ran out of attempts for one batch.
    #[error("retry budget exhausted after {attempts} attempts")]
    RetryBudgetExhausted { attempts: u32 },
}
