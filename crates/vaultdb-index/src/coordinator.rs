//! Index coordinator: the only writer of the vector store.
//!
//! Each document has a slot holding a FIFO async lock (at most one reindex in
//! flight per document), the highest revision requested so far, and the
//! revision of the last committed write. A request that finds a newer
//! revision requested or committed is skipped, so the final entries always
//! reflect the latest content regardless of completion order.
//!
//! Reindexing is all-or-nothing: every chunk is embedded before anything is
//! written, and the new entry set replaces the old one in a single store
//! operation.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{Mutex as AsyncMutex, Semaphore};

use vaultdb_core::chunker::{Chunker, ChunkingConfig};
use vaultdb_core::config::IndexSettings;
use vaultdb_core::traits::{Embedder, VectorStore};
use vaultdb_core::types::{DocumentId, IndexEntry, Revision};
use vaultdb_core::{Error, Result};
use vaultdb_vector::cache::{hash_content, CacheEntry, EmbeddingCache};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReindexOutcome {
    /// The document's entries now reflect this request's content.
    Indexed { revision: Revision, chunks: usize, embedded: usize, cached: usize },
    /// The document's entries were removed.
    Removed { revision: Revision },
    /// A newer revision was requested or committed; nothing was written.
    Superseded { revision: Revision, latest: Revision },
}

#[derive(Default)]
struct DocSlot {
    requested: AtomicU64,
    committed: AsyncMutex<Option<Revision>>,
}

pub struct IndexCoordinator {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    cache: Option<Arc<dyn EmbeddingCache>>,
    chunker: Chunker,
    permits: Semaphore,
    // One slot per document ever seen; never pruned, a stale slot must keep
    // its committed revision for requests still queued on it.
    slots: Mutex<HashMap<DocumentId, Arc<DocSlot>>>,
    revisions: AtomicU64,
}

impl IndexCoordinator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chunking: ChunkingConfig,
        settings: &IndexSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            cache: None,
            chunker: Chunker::new(chunking),
            permits: Semaphore::new(settings.max_concurrent_documents.max(1)),
            slots: Mutex::new(HashMap::new()),
            revisions: AtomicU64::new(0),
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn EmbeddingCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Next revision in issue order.
    pub fn next_revision(&self) -> Revision {
        Revision(self.revisions.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn slot(&self, doc_id: &str) -> Result<Arc<DocSlot>> {
        let mut slots = self.slots.lock().map_err(|_| Error::Operation("coordinator slot map poisoned".into()))?;
        Ok(slots.entry(doc_id.to_string()).or_default().clone())
    }

    /// Reindex `doc_id` with `text`, ordered after every earlier request.
    pub async fn reindex_document(&self, doc_id: &str, text: &str) -> Result<ReindexOutcome> {
        let revision = self.next_revision();
        self.reindex_at(doc_id, revision, text).await
    }

    /// Reindex `doc_id` with `text` as of `revision`.
    pub async fn reindex_at(&self, doc_id: &str, revision: Revision, text: &str) -> Result<ReindexOutcome> {
        let slot = self.slot(doc_id)?;
        slot.requested.fetch_max(revision.0, Ordering::SeqCst);
        let mut committed = slot.committed.lock().await;
        if let Some(latest) = newer_than(&slot, *committed, revision) {
            tracing::debug!(doc_id, %revision, %latest, "reindex superseded");
            return Ok(ReindexOutcome::Superseded { revision, latest });
        }

        let _permit = self.permits.acquire().await.map_err(|e| Error::Operation(format!("worker pool closed: {e}")))?;
        let start = Instant::now();
        let (entries, embedded, cached) = self.build_entries(doc_id, text).await?;
        let chunks = entries.len();
        self.store.replace_document(doc_id, entries).await?;
        *committed = Some(revision);

        tracing::info!(doc_id, %revision, chunks, embedded, cached, elapsed_ms = start.elapsed().as_millis() as u64, "reindexed document");
        Ok(ReindexOutcome::Indexed { revision, chunks, embedded, cached })
    }

    /// Remove every entry of `doc_id`, ordered after every earlier request.
    pub async fn remove_document(&self, doc_id: &str) -> Result<ReindexOutcome> {
        let revision = self.next_revision();
        self.remove_at(doc_id, revision).await
    }

    pub async fn remove_at(&self, doc_id: &str, revision: Revision) -> Result<ReindexOutcome> {
        let slot = self.slot(doc_id)?;
        slot.requested.fetch_max(revision.0, Ordering::SeqCst);
        let mut committed = slot.committed.lock().await;
        if let Some(latest) = newer_than(&slot, *committed, revision) {
            tracing::debug!(doc_id, %revision, %latest, "removal superseded");
            return Ok(ReindexOutcome::Superseded { revision, latest });
        }
        self.store.delete_by_document(doc_id).await?;
        *committed = Some(revision);
        tracing::info!(doc_id, %revision, "removed document");
        Ok(ReindexOutcome::Removed { revision })
    }

    pub async fn entries_for(&self, doc_id: &str) -> Result<Vec<IndexEntry>> {
        self.store.get_by_document(doc_id).await
    }

    /// Chunk and embed `text`. Returns the entries plus how many vectors came
    /// from the embedder and from the cache. Fails on the first embedding
    /// error without touching the store.
    async fn build_entries(&self, doc_id: &str, text: &str) -> Result<(Vec<IndexEntry>, usize, usize)> {
        let chunks = self.chunker.chunk_document(doc_id, text);
        let hashes: Vec<String> = chunks.iter().map(|c| hash_content(&c.text)).collect();
        let embedder_id = self.embedder.embedder_id().to_string();
        let mut known = self.cached_vectors(&embedder_id, &hashes).await;

        let mut entries = Vec::with_capacity(chunks.len());
        let mut fresh = Vec::new();
        let mut cached = 0;
        for (chunk, hash) in chunks.into_iter().zip(hashes) {
            let vector = match known.get(&hash) {
                Some(v) => {
                    cached += 1;
                    v.clone()
                }
                None => match self.embedder.embed(&chunk.text).await {
                    Ok(v) => {
                        fresh.push(CacheEntry { content_hash: hash.clone(), embedder_id: embedder_id.clone(), vector: v.clone() });
                        known.insert(hash.clone(), v.clone());
                        v
                    }
                    Err(err) => {
                        tracing::warn!(doc_id, ordinal = chunk.ordinal, error = %err, "embedding failed, keeping previous entries");
                        self.remember(&fresh).await;
                        return Err(err);
                    }
                },
            };
            tracing::debug!(doc_id, ordinal = chunk.ordinal, dim = vector.len(), "chunk ready");
            entries.push(IndexEntry {
                chunk_id: chunk.id,
                doc_id: chunk.doc_id,
                ordinal: chunk.ordinal,
                content: chunk.text,
                content_hash: hash,
                embedder_id: embedder_id.clone(),
                vector,
            });
        }
        let embedded = fresh.len();
        self.remember(&fresh).await;
        Ok((entries, embedded, cached))
    }

    async fn cached_vectors(&self, embedder_id: &str, hashes: &[String]) -> HashMap<String, Vec<f32>> {
        let Some(cache) = &self.cache else { return HashMap::new() };
        match cache.get_many(embedder_id, hashes).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(error = %err, "embedding cache lookup failed, embedding everything");
                HashMap::new()
            }
        }
    }

    async fn remember(&self, fresh: &[CacheEntry]) {
        let Some(cache) = &self.cache else { return };
        if fresh.is_empty() {
            return;
        }
        if let Err(err) = cache.put_many(fresh).await {
            tracing::warn!(error = %err, "embedding cache write failed");
        }
    }
}

/// The newest revision that makes `revision` stale, if any.
fn newer_than(slot: &DocSlot, committed: Option<Revision>, revision: Revision) -> Option<Revision> {
    let requested = Revision(slot.requested.load(Ordering::SeqCst));
    let latest = committed.map_or(requested, |c| c.max(requested));
    if latest > revision || committed.is_some_and(|c| c >= revision) {
        Some(latest)
    } else {
        None
    }
}
