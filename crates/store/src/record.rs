//! Document record layout

use crate::error::{Result, StoreError};
use desyn_core::ContentHash;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Document identifier (ULID for timestamp + uniqueness)
pub type DocumentId = Ulid;

/// Store-assigned bookkeeping for one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: DocumentId,
    /// Unix milliseconds
    pub created_at_ms: u64,
    /// Unix milliseconds, assigned on every write that changes content
    pub updated_at_ms: u64,
    /// Starts at 1, bumped on every content change
    pub revision: u64,
    /// BLAKE3 of the payload bytes
    pub content_hash: ContentHash,
    pub size_bytes: u64,
}

/// A decoded document
#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    pub meta: DocumentMeta,
    pub value: T,
}

/// On-disk record: bincode envelope around JSON payload bytes
#[derive(Serialize, Deserialize)]
pub(crate) struct Record {
    pub meta: DocumentMeta,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(StoreError::Encode)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(StoreError::Decode)
    }
}
