//! The caller-supplied save operation

use async_trait::async_trait;
use std::future::Future;

/// Persists one snapshot of the edited document
///
/// Implementations should be idempotent where they can; the scheduler may
/// hand the same value over more than once.
#[async_trait]
pub trait SaveOperation<T>: Send + Sync + 'static {
    async fn save(&self, value: T) -> anyhow::Result<()>;
}

/// Closures returning a future are save operations
///
/// ```ignore
/// let saver = Autosaver::new(|frames: Vec<Frame>| async move {
///     store.write(frames).await
/// }, AutosaveConfig::default())?;
/// ```
#[async_trait]
impl<T, F, Fut> SaveOperation<T> for F
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn save(&self, value: T) -> anyhow::Result<()> {
        (self)(value).await
    }
}
