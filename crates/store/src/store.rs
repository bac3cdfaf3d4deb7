//! Document store using sled

use crate::error::{Result, StoreError};
use crate::record::{Document, DocumentId, DocumentMeta, Record};
use desyn_core::hash_bytes;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;
use ulid::Ulid;

/// Result of writing a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// Content changed; a new revision was written
    Written(DocumentMeta),
    /// Content matched the stored revision; nothing was written
    Unchanged(DocumentMeta),
}

impl PutOutcome {
    pub fn meta(&self) -> &DocumentMeta {
        match self {
            PutOutcome::Written(meta) | PutOutcome::Unchanged(meta) => meta,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, PutOutcome::Written(_))
    }
}

/// Keyed document records with store-assigned timestamps
pub struct DocumentStore {
    /// Sled database
    db: Db,
    /// In-memory index: document id -> metadata
    index: RwLock<BTreeMap<Ulid, DocumentMeta>>,
}

impl DocumentStore {
    /// Open or create a store in the given directory
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path.join("documents.db"))?;

        // Build in-memory index on startup
        let mut index = BTreeMap::new();
        for item in db.iter() {
            let (key, value) = item?;
            let id = decode_key(&key)?;
            let record = Record::deserialize(&value)?;
            index.insert(id, record.meta);
        }

        debug!("Opened document store with {} documents", index.len());

        Ok(Self {
            db,
            index: RwLock::new(index),
        })
    }

    /// Create a new document, returning its metadata
    pub fn create<T: Serialize>(&self, value: &T) -> Result<DocumentMeta> {
        let payload = serde_json::to_vec(value)?;
        let now = current_timestamp_ms();
        let meta = DocumentMeta {
            id: Ulid::new(),
            created_at_ms: now,
            updated_at_ms: now,
            revision: 1,
            content_hash: hash_bytes(&payload),
            size_bytes: payload.len() as u64,
        };

        let mut index = self.index.write();
        self.write_record(&meta, payload)?;
        index.insert(meta.id, meta.clone());

        debug!("Created document {}", meta.id);
        Ok(meta)
    }

    /// Replace the content of an existing document
    ///
    /// Writes are skipped when the payload bytes are unchanged, so the
    /// timestamp only moves when the content does.
    pub fn put<T: Serialize>(&self, id: &DocumentId, value: &T) -> Result<PutOutcome> {
        let payload = serde_json::to_vec(value)?;
        let content_hash = hash_bytes(&payload);

        // Hold the index lock across read-modify-write
        let mut index = self.index.write();
        let previous = index.get(id).cloned().ok_or(StoreError::NotFound(*id))?;

        if previous.content_hash == content_hash {
            return Ok(PutOutcome::Unchanged(previous));
        }

        let meta = DocumentMeta {
            // Never move backwards, even if the wall clock does
            updated_at_ms: current_timestamp_ms().max(previous.updated_at_ms),
            revision: previous.revision + 1,
            content_hash,
            size_bytes: payload.len() as u64,
            ..previous
        };

        self.write_record(&meta, payload)?;
        index.insert(*id, meta.clone());

        debug!("Wrote document {} revision {}", id, meta.revision);
        Ok(PutOutcome::Written(meta))
    }

    /// Get a document by ID
    pub fn get<T: DeserializeOwned>(&self, id: &DocumentId) -> Result<Option<Document<T>>> {
        let value = match self.db.get(id.to_bytes())? {
            Some(v) => v,
            None => return Ok(None),
        };

        let record = Record::deserialize(&value)?;
        let value = serde_json::from_slice(&record.payload)?;
        Ok(Some(Document {
            meta: record.meta,
            value,
        }))
    }

    /// Get metadata without decoding the payload
    pub fn meta(&self, id: &DocumentId) -> Option<DocumentMeta> {
        self.index.read().get(id).cloned()
    }

    /// All documents, most recently updated first
    pub fn list(&self) -> Vec<DocumentMeta> {
        let mut metas: Vec<_> = self.index.read().values().cloned().collect();
        metas.sort_by(|a, b| {
            b.updated_at_ms
                .cmp(&a.updated_at_ms)
                .then_with(|| b.id.cmp(&a.id))
        });
        metas
    }

    /// Delete a document, returning whether it existed
    pub fn delete(&self, id: &DocumentId) -> Result<bool> {
        let mut index = self.index.write();
        if !index.contains_key(id) {
            return Ok(false); // Already deleted
        }

        // Index follows disk
        self.db.remove(id.to_bytes())?;
        self.db.flush()?;
        index.remove(id);
        Ok(true)
    }

    /// Get the total number of documents
    pub fn count(&self) -> usize {
        self.index.read().len()
    }

    fn write_record(&self, meta: &DocumentMeta, payload: Vec<u8>) -> Result<()> {
        let record = Record {
            meta: meta.clone(),
            payload,
        };
        self.db.insert(meta.id.to_bytes(), record.serialize()?)?;

        // Flush to ensure durability
        self.db.flush()?;
        Ok(())
    }
}

fn decode_key(key: &[u8]) -> Result<Ulid> {
    let bytes: [u8; 16] = key
        .try_into()
        .map_err(|_| StoreError::CorruptKey(key.len()))?;
    Ok(Ulid::from_bytes(bytes))
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
