mod common;

use std::sync::Arc;

use common::Scripted;
use vaultdb_core::traits::VectorStore;
use vaultdb_core::types::{chunk_id, IndexEntry};
use vaultdb_index::{rank, SearchEngine};
use vaultdb_vector::{hash_content, MemoryVectorStore};

fn entry(doc: &str, vector: Vec<f32>) -> IndexEntry {
    IndexEntry {
        chunk_id: chunk_id(doc, 0),
        doc_id: doc.to_string(),
        ordinal: 0,
        content: format!("{doc} body"),
        content_hash: hash_content(doc),
        embedder_id: "scripted".to_string(),
        vector,
    }
}

async fn engine(entries: Vec<IndexEntry>) -> (Arc<Scripted>, SearchEngine) {
    let embedder = Scripted::new();
    embedder.vector("query", vec![1.0, 0.0]);
    let store = Arc::new(MemoryVectorStore::new());
    store.upsert(entries).await.unwrap();
    let engine = SearchEngine::new(embedder.clone(), store);
    (embedder, engine)
}

fn abcd() -> Vec<IndexEntry> {
    vec![entry("a", vec![1.0, 0.0]), entry("b", vec![1.0, 0.0]), entry("c", vec![0.0, 1.0]), entry("d", vec![-1.0, 0.0])]
}

fn docs(hits: &[vaultdb_core::types::SearchHit]) -> Vec<&str> {
    hits.iter().map(|h| h.doc_id.as_str()).collect()
}

#[tokio::test]
async fn ranks_by_cosine_descending() {
    let (_, engine) = engine(abcd()).await;

    let hits = engine.search("query", 10, -1.0).await.unwrap();
    assert_eq!(docs(&hits), vec!["a", "b", "c", "d"]);
    let scores: Vec<f32> = hits.iter().map(|h| h.score).collect();
    assert_eq!(scores, vec![1.0, 1.0, 0.0, -1.0]);
    assert_eq!(hits[0].chunk_id, "a-0");
    assert_eq!(hits[0].content, "a body");
}

#[tokio::test]
async fn min_score_filters() {
    let (_, engine) = engine(abcd()).await;
    let hits = engine.search("query", 10, 0.5).await.unwrap();
    assert_eq!(docs(&hits), vec!["a", "b"]);
}

#[tokio::test]
async fn k_truncates_and_zero_k_skips_embedding() {
    let (embedder, engine) = engine(abcd()).await;
    assert_eq!(docs(&engine.search("query", 3, -1.0).await.unwrap()), vec!["a", "b", "c"]);
    let calls = embedder.calls();

    assert!(engine.search("query", 0, 0.0).await.unwrap().is_empty());
    assert!(engine.search("   ", 5, 0.0).await.unwrap().is_empty());
    assert_eq!(embedder.calls(), calls);
}

#[tokio::test]
async fn empty_store_yields_nothing() {
    let (_, engine) = engine(Vec::new()).await;
    assert!(engine.search("query", 5, 0.0).await.unwrap().is_empty());
}

#[tokio::test]
async fn mismatched_dimensions_are_skipped() {
    let (_, engine) = engine(vec![entry("a", vec![1.0, 0.0]), entry("wide", vec![1.0, 0.0, 0.0])]).await;

    let ranking = engine.search_with_report("query", 10, 0.0).await.unwrap();
    assert_eq!(docs(&ranking.hits), vec!["a"]);
    assert_eq!(ranking.mismatches.len(), 1);
    assert_eq!(ranking.mismatches[0].doc_id, "wide");
    assert_eq!((ranking.mismatches[0].expected, ranking.mismatches[0].found), (2, 3));
}

#[tokio::test]
async fn query_embedding_failure_is_an_error() {
    let (embedder, engine) = engine(abcd()).await;
    embedder.fail_on("query");
    let err = engine.search("query", 5, 0.0).await.unwrap_err();
    assert!(err.is_embedding());
}

#[test]
fn ties_keep_scan_order() {
    let entries: Vec<IndexEntry> = ["z", "y", "x"].iter().map(|d| entry(d, vec![2.0, 2.0])).collect();
    let ranking = rank(&[1.0, 1.0], entries, 10, 0.0);
    assert_eq!(docs(&ranking.hits), vec!["z", "y", "x"]);
}

#[test]
fn zero_vectors_score_zero() {
    let ranking = rank(&[1.0, 0.0], vec![entry("zero", vec![0.0, 0.0])], 10, -1.0);
    assert_eq!(ranking.hits[0].score, 0.0);
    assert!(rank(&[1.0, 0.0], vec![entry("zero", vec![0.0, 0.0])], 10, 0.1).hits.is_empty());
}
