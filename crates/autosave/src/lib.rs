//! Debounced autosave for Desyn editing sessions
//!
//! This crate provides:
//! - A debounced persistence scheduler (last-write-wins, single-flight saves)
//! - A final flush when the editing session ends
//! - Status snapshots and a watch channel for save indicators
//! - Optional dirty tracking, save timeout and retry with backoff

pub mod config;
pub mod debounce;
pub mod error;
pub mod operation;
pub mod retry;
pub mod status;

// Re-exports
pub use config::{AutosaveConfig, DEFAULT_INTERVAL};
pub use debounce::{Autosaver, FinalSave};
pub use error::{AutosaveError, Result};
pub use operation::SaveOperation;
pub use retry::{RetryPolicy, Retrying};
pub use status::{SavePhase, SaveStatus};
