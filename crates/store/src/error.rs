//! Store error types

use thiserror::Error;
use ulid::Ulid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sled::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[source] bincode::Error),

    #[error("failed to decode record: {0}")]
    Decode(#[source] bincode::Error),

    #[error("invalid document payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("document not found: {0}")]
    NotFound(Ulid),

    #[error("corrupt key in document tree ({0} bytes)")]
    CorruptKey(usize),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
