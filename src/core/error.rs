//! Core capability errors (parsing, validation, note formatting).
//!
//! These are domain/refusal states, not library implementation details.

use thiserror::Error;

use crate::error::Transience;

/// Invalid identifier read from the change feed or the command line.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum InvalidId {
    #[error("change id `{raw}` is invalid: {reason}")]
    Change { raw: String, reason: String },
    #[error("change key `{raw}` is invalid: {reason}")]
    ChangeKey { raw: String, reason: String },
    #[error("project name `{raw}` is invalid: {reason}")]
    Project { raw: String, reason: String },
    #[error("commit id `{raw}` is invalid: {reason}")]
    Commit { raw: String, reason: String },
    #[error("label `{raw}` is invalid: {reason}")]
    Label { raw: String, reason: String },
}

/// Canonical error enum for core capability.
#[derive(Debug, Error, Clone)]
#[non_exhaustive]
pub enum CoreError {
    #[error(transparent)]
    InvalidId(#[from] InvalidId),
    #[error("failed to format submission time: {0}")]
    DateFormat(String),
}

impl From<time::error::Format> for CoreError {
    fn from(err: time::error::Format) -> Self {
        CoreError::DateFormat(err.to_string())
    }
}

impl CoreError {
    pub fn transience(&self) -> Transience {
        // Core errors are pure domain/input failures.
        Transience::Permanent
    }
}
