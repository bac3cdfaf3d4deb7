//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use desyn_store::{DocumentId, DocumentMeta, DocumentStore};
use owo_colors::OwoColorize;
use std::path::Path;
use ulid::Ulid;

/// Open the document store under the data directory
pub fn open_store(data_dir: &Path) -> Result<DocumentStore> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
    DocumentStore::open(data_dir).context("Failed to open document store")
}

/// Resolve a document reference to its ID
/// Supports:
/// - Full ULID: "01HN8XYZ..."
/// - ULID prefix: "01HN8" (at least 4 characters, must be unique)
pub fn resolve_document_ref(reference: &str, store: &DocumentStore) -> Result<DocumentId> {
    if let Ok(ulid) = Ulid::from_string(reference) {
        if store.meta(&ulid).is_some() {
            return Ok(ulid);
        }
        anyhow::bail!("Document not found: {}", reference);
    }

    if reference.len() < 4 {
        anyhow::bail!("Document reference '{}' is too short (need at least 4 characters)", reference);
    }

    let prefix = reference.to_uppercase();
    let matching: Vec<_> = store
        .list()
        .into_iter()
        .filter(|meta| meta.id.to_string().starts_with(&prefix))
        .collect();

    match matching.as_slice() {
        [only] => Ok(only.id),
        [] => anyhow::bail!("Unknown document reference: '{}'", reference),
        many => anyhow::bail!(
            "Ambiguous document prefix '{}': matches {} documents",
            reference,
            many.len()
        ),
    }
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts_ms: u64) -> String {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    let datetime = UNIX_EPOCH + Duration::from_millis(ts_ms);

    match SystemTime::now().duration_since(datetime) {
        Ok(elapsed) => format_elapsed(elapsed),
        Err(_) => "in the future".to_string(),
    }
}

/// Format a duration as "N units ago"
pub fn format_elapsed(elapsed: std::time::Duration) -> String {
    let seconds = elapsed.as_secs();

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Display a document in compact format
pub fn display_document_compact(meta: &DocumentMeta, name: &str) {
    let id_short = meta.id.to_string()[..10].to_string();
    println!(
        "{} {} {} {}",
        id_short.yellow(),
        name.bold(),
        format!("rev {}", meta.revision).cyan(),
        format_relative_time(meta.updated_at_ms).dimmed()
    );
}
