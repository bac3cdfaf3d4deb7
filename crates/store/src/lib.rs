//! Document persistence for Desyn
//!
//! This crate provides:
//! - Document records keyed by ULID (sled embedded DB)
//! - Store-assigned update timestamps and revisions
//! - Content hashing to skip writes of unchanged payloads
//! - An autosave target that writes one document

pub mod error;
pub mod record;
pub mod saver;
pub mod store;

// Re-exports
pub use error::{Result, StoreError};
pub use record::{Document, DocumentId, DocumentMeta};
pub use saver::DocumentSaver;
pub use store::{DocumentStore, PutOutcome};
