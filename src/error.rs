//! Error taxonomy for the preparation stages.
//!
//! Every variant describes malformed input and none of them are retryable.
//! Incomplete rows (missing `ad_id`, missing metric cells) are not errors;
//! the stages drop or zero-fill them silently.

use std::fmt;

use thiserror::Error;

pub type PrepResult<T> = Result<T, PrepError>;

/// Stage of the pipeline that emptied the working table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    DateFilter,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Normalize => write!(f, "normalization (no rows with non-zero cost)"),
            Stage::DateFilter => write!(f, "date filtering (no rows inside the cutoff window)"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PrepError {
    #[error("schema error: {0}")]
    Schema(String),
    #[error("invalid weight for '{metric}': {reason}")]
    InvalidWeight { metric: String, reason: String },
    #[error("row {row}: column '{column}' holds '{value}', expected a non-negative number")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },
    #[error("row {row}: weighted successes are too large to encode as trials")]
    TrialsOverflow { row: usize },
    #[error("row {row}: date '{value}' does not match YYYY-MM-DD")]
    InvalidDateFormat { row: usize, value: String },
    #[error("ad_id '{ad_id}' appears with conflicting identity attributes")]
    ConflictingOption { ad_id: String },
    #[error("no eligible records left after {stage}")]
    EmptyResult { stage: Stage },
}

impl PrepError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn invalid_weight(metric: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidWeight {
            metric: metric.into(),
            reason: reason.into(),
        }
    }
}
