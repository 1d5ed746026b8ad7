mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use common::{contents, coordinator, Scripted};
use vaultdb_core::chunker::ChunkingConfig;
use vaultdb_core::config::IndexSettings;
use vaultdb_core::traits::VectorStore;
use vaultdb_core::types::{DocumentId, IndexEntry, Revision};
use vaultdb_core::{Error, Result};
use vaultdb_index::{IndexCoordinator, ReindexOutcome};
use vaultdb_vector::{MemoryEmbeddingCache, MemoryVectorStore};

#[tokio::test]
async fn reindex_writes_one_entry_per_chunk() {
    let embedder = Scripted::new();
    let (coord, store) = coordinator(embedder.clone());

    let outcome = coord.reindex_document("a.md", "Para one.\n\nPara two.\n\n\n").await.unwrap();
    assert!(matches!(outcome, ReindexOutcome::Indexed { chunks: 2, embedded: 2, cached: 0, .. }));

    let entries = store.get_by_document("a.md").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].chunk_id, "a.md-0");
    assert_eq!(entries[1].chunk_id, "a.md-1");
    assert_eq!(entries[1].content, "Para two.");
    assert_eq!(entries[0].embedder_id, "scripted");
}

#[tokio::test]
async fn reindex_is_idempotent() {
    let embedder = Scripted::new();
    let (coord, store) = coordinator(embedder);

    coord.reindex_document("a.md", "alpha\n\nbeta").await.unwrap();
    let first = store.get_all().await.unwrap();
    coord.reindex_document("a.md", "alpha\n\nbeta").await.unwrap();
    assert_eq!(store.get_all().await.unwrap(), first);
}

#[tokio::test]
async fn edit_replaces_previous_chunks() {
    let embedder = Scripted::new();
    let (coord, store) = coordinator(embedder);

    coord.reindex_document("a.md", "one\n\ntwo\n\nthree").await.unwrap();
    coord.reindex_document("b.md", "other").await.unwrap();
    coord.reindex_document("a.md", "only").await.unwrap();

    assert_eq!(contents(store.as_ref(), "a.md").await, vec!["only"]);
    assert_eq!(contents(store.as_ref(), "b.md").await, vec!["other"]);
}

#[tokio::test]
async fn empty_document_clears_its_entries() {
    let embedder = Scripted::new();
    let (coord, store) = coordinator(embedder);

    coord.reindex_document("a.md", "something").await.unwrap();
    let outcome = coord.reindex_document("a.md", "  \n\n \n").await.unwrap();
    assert!(matches!(outcome, ReindexOutcome::Indexed { chunks: 0, .. }));
    assert!(store.get_by_document("a.md").await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_chunk_leaves_previous_entries() {
    for failing in 0..3 {
        let embedder = Scripted::new();
        let (coord, store) = coordinator(embedder.clone());
        coord.reindex_document("a.md", "x\n\ny\n\nz").await.unwrap();

        embedder.fail_on(&format!("n{failing}"));
        let err = coord.reindex_document("a.md", "n0\n\nn1\n\nn2").await.unwrap_err();
        assert!(err.is_embedding(), "chunk {failing}: {err}");
        assert_eq!(contents(store.as_ref(), "a.md").await, vec!["x", "y", "z"], "chunk {failing}");

        embedder.heal();
        coord.reindex_document("a.md", "n0\n\nn1\n\nn2").await.unwrap();
        assert_eq!(contents(store.as_ref(), "a.md").await, vec!["n0", "n1", "n2"]);
    }
}

#[tokio::test]
async fn older_request_issued_late_is_superseded() {
    let embedder = Scripted::new();
    embedder.delay("newer", Duration::from_millis(200));
    let (coord, store) = coordinator(embedder);

    let slow = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.reindex_at("a.md", Revision(2), "newer").await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    let stale = coord.reindex_at("a.md", Revision(1), "older").await.unwrap();
    assert_eq!(stale, ReindexOutcome::Superseded { revision: Revision(1), latest: Revision(2) });

    assert!(matches!(slow.await.unwrap().unwrap(), ReindexOutcome::Indexed { revision: Revision(2), .. }));
    assert_eq!(contents(store.as_ref(), "a.md").await, vec!["newer"]);
}

#[tokio::test]
async fn newer_request_waits_for_running_one() {
    let embedder = Scripted::new();
    embedder.delay("older", Duration::from_millis(150));
    let (coord, store) = coordinator(embedder);

    let first = {
        let coord = coord.clone();
        tokio::spawn(async move { coord.reindex_at("a.md", Revision(1), "older").await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    let second = coord.reindex_at("a.md", Revision(2), "newer").await.unwrap();
    assert!(matches!(second, ReindexOutcome::Indexed { revision: Revision(2), .. }));
    first.await.unwrap().unwrap();

    assert_eq!(contents(store.as_ref(), "a.md").await, vec!["newer"]);
}

#[tokio::test]
async fn many_concurrent_edits_end_on_the_last_issued() {
    let embedder = Scripted::new();
    let (coord, store) = coordinator(embedder.clone());

    let mut tasks = Vec::new();
    for i in 1..=10u64 {
        let text = format!("version {i}");
        embedder.delay(&text, Duration::from_millis((10 - i) * 10));
        let coord = coord.clone();
        tasks.push(tokio::spawn(async move { coord.reindex_at("a.md", Revision(i), &text).await }));
    }
    for t in tasks {
        t.await.unwrap().unwrap();
    }
    assert_eq!(contents(store.as_ref(), "a.md").await, vec!["version 10"]);
}

#[tokio::test]
async fn remove_is_idempotent_and_blocks_older_reindex() {
    let embedder = Scripted::new();
    let (coord, store) = coordinator(embedder);

    coord.reindex_at("a.md", Revision(1), "body").await.unwrap();
    assert!(matches!(coord.remove_at("a.md", Revision(3)).await.unwrap(), ReindexOutcome::Removed { .. }));
    coord.remove_document("a.md").await.expect("second removal is fine");
    coord.remove_document("never.md").await.expect("unknown document is fine");

    let late = coord.reindex_at("a.md", Revision(2), "resurrected").await.unwrap();
    assert!(matches!(late, ReindexOutcome::Superseded { .. }));
    assert!(store.get_by_document("a.md").await.unwrap().is_empty());
}

#[tokio::test]
async fn cache_skips_known_paragraphs() {
    let embedder = Scripted::new();
    let store = Arc::new(MemoryVectorStore::new());
    let cache = Arc::new(MemoryEmbeddingCache::new());
    let coord = IndexCoordinator::new(embedder.clone(), store.clone(), ChunkingConfig::default(), &IndexSettings::default())
        .with_cache(cache.clone());

    coord.reindex_document("a.md", "shared\n\nfirst").await.unwrap();
    assert_eq!(embedder.calls(), 2);
    let outcome = coord.reindex_document("b.md", "shared\n\nsecond").await.unwrap();
    assert!(matches!(outcome, ReindexOutcome::Indexed { embedded: 1, cached: 1, .. }));
    assert_eq!(embedder.calls(), 3);
    assert_eq!(cache.len(), 3);

    let a = store.get_by_document("a.md").await.unwrap();
    let b = store.get_by_document("b.md").await.unwrap();
    assert_eq!(a[0].vector, b[0].vector);
}

#[tokio::test]
async fn cache_keeps_vectors_from_a_failed_attempt() {
    let embedder = Scripted::new();
    let store = Arc::new(MemoryVectorStore::new());
    let cache = Arc::new(MemoryEmbeddingCache::new());
    let coord = IndexCoordinator::new(embedder.clone(), store, ChunkingConfig::default(), &IndexSettings::default())
        .with_cache(cache.clone());

    embedder.fail_on("three");
    coord.reindex_document("a.md", "one\n\ntwo\n\nthree").await.unwrap_err();
    assert_eq!(cache.len(), 2);

    embedder.heal();
    let outcome = coord.reindex_document("a.md", "one\n\ntwo\n\nthree").await.unwrap();
    assert!(matches!(outcome, ReindexOutcome::Indexed { embedded: 1, cached: 2, .. }));
}

/// Memory store whose next `replace_document` fails once armed.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryVectorStore,
    fail_next_replace: AtomicBool,
}

#[async_trait]
impl VectorStore for FlakyStore {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        self.inner.upsert(entries).await
    }

    async fn replace_document(&self, doc_id: &str, entries: Vec<IndexEntry>) -> Result<()> {
        if self.fail_next_replace.swap(false, Ordering::SeqCst) {
            return Err(Error::storage("disk full"));
        }
        self.inner.replace_document(doc_id, entries).await
    }

    async fn delete_by_document(&self, doc_id: &str) -> Result<()> {
        self.inner.delete_by_document(doc_id).await
    }

    async fn get_by_document(&self, doc_id: &str) -> Result<Vec<IndexEntry>> {
        self.inner.get_by_document(doc_id).await
    }

    async fn get_all(&self) -> Result<Vec<IndexEntry>> {
        self.inner.get_all().await
    }

    async fn documents(&self) -> Result<Vec<DocumentId>> {
        self.inner.documents().await
    }
}

#[tokio::test]
async fn storage_failure_keeps_previous_entries_and_revision() {
    let store = Arc::new(FlakyStore::default());
    let coord = IndexCoordinator::new(Scripted::new(), store.clone(), ChunkingConfig::default(), &IndexSettings::default());
    coord.reindex_at("a.md", Revision(1), "old one\n\nold two").await.unwrap();

    store.fail_next_replace.store(true, Ordering::SeqCst);
    let err = coord.reindex_at("a.md", Revision(2), "new").await.unwrap_err();
    assert!(err.is_storage(), "{err}");
    assert_eq!(contents(store.as_ref(), "a.md").await, vec!["old one", "old two"]);

    // the failed revision was never committed, so it can be retried as is
    let retried = coord.reindex_at("a.md", Revision(2), "new").await.unwrap();
    assert!(matches!(retried, ReindexOutcome::Indexed { revision: Revision(2), chunks: 1, .. }));
    assert_eq!(contents(store.as_ref(), "a.md").await, vec!["new"]);
}
