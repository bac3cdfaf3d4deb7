//! Autosave target backed by the document store

use crate::record::DocumentId;
use crate::store::{DocumentStore, PutOutcome};
use anyhow::Context;
use async_trait::async_trait;
use autosave::SaveOperation;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Writes every autosaved value into one document
pub struct DocumentSaver<T> {
    store: Arc<DocumentStore>,
    id: DocumentId,
    _value: PhantomData<fn(T)>,
}

impl<T> DocumentSaver<T> {
    pub fn new(store: Arc<DocumentStore>, id: DocumentId) -> Self {
        Self {
            store,
            id,
            _value: PhantomData,
        }
    }
}

#[async_trait]
impl<T> SaveOperation<T> for DocumentSaver<T>
where
    T: Serialize + Send + 'static,
{
    async fn save(&self, value: T) -> anyhow::Result<()> {
        let store = Arc::clone(&self.store);
        let id = self.id;

        // sled calls block
        let outcome = tokio::task::spawn_blocking(move || store.put(&id, &value))
            .await
            .context("document write task failed")?
            .with_context(|| format!("failed to write document {}", id))?;

        match outcome {
            PutOutcome::Written(meta) => {
                debug!("Document {} saved as revision {}", id, meta.revision)
            }
            PutOutcome::Unchanged(_) => debug!("Document {} unchanged", id),
        }
        Ok(())
    }
}
