use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DocumentId, IndexEntry};

/// Turns text into a vector. Implementations own their retry/timeout policy.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g., `ollama:nomic-embed-text`).
    fn embedder_id(&self) -> &str;
    /// Embed one text. Fails with `Error::EmbeddingService` once retries are spent.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Durable index of chunk vectors, keyed by chunk id with lookup by document.
///
/// Every write is atomic with respect to its batch: a concurrent reader sees
/// either all of it or none of it.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or update entries by chunk id.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;
    /// Make `entries` the complete entry set of `doc_id` in one step.
    async fn replace_document(&self, doc_id: &str, entries: Vec<IndexEntry>) -> Result<()>;
    /// Remove every entry of `doc_id`. Removing nothing is not an error.
    async fn delete_by_document(&self, doc_id: &str) -> Result<()>;
    /// Entries of `doc_id`, ordered by ordinal.
    async fn get_by_document(&self, doc_id: &str) -> Result<Vec<IndexEntry>>;
    /// Consistent snapshot of every entry.
    async fn get_all(&self) -> Result<Vec<IndexEntry>>;
    /// Distinct document ids present in the store.
    async fn documents(&self) -> Result<Vec<DocumentId>>;
}

/// The host application's view of its documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Current content of `doc_id`; `Error::NotFound` when it no longer exists.
    async fn read(&self, doc_id: &str) -> Result<String>;
    /// Every document currently known to the host.
    async fn list(&self) -> Result<Vec<DocumentId>>;
}
