//! Error types for the autosave scheduler

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the autosave scheduler
///
/// Save failures never escape the scheduler on their own; they are only
/// returned to a caller that awaited an explicit flush.
#[derive(Debug, Error)]
pub enum AutosaveError {
    #[error("save failed: {0:#}")]
    Save(anyhow::Error),

    #[error("save timed out after {0:?}")]
    TimedOut(Duration),

    #[error("save task did not complete: {0}")]
    TaskFailed(String),

    #[error("autosave requires a running tokio runtime")]
    NoRuntime,

    #[error("invalid autosave config: {0}")]
    InvalidConfig(String),
}

/// Result type for autosave operations
pub type Result<T> = std::result::Result<T, AutosaveError>;
