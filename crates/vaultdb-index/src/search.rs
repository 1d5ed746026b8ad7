//! Exact cosine-similarity search by linear scan over the vector store.
use std::sync::Arc;

use vaultdb_core::traits::{Embedder, VectorStore};
use vaultdb_core::types::{ChunkId, DocumentId, IndexEntry, SearchHit};
use vaultdb_core::Result;

/// `dot(a, b) / (|a| * |b|)`, or `0.0` when either vector has zero magnitude.
/// `None` when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return Some(0.0);
    }
    // + 0.0 folds -0.0 into 0.0 so ties sort stably
    Some(((dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0) as f32) + 0.0)
}

/// A stored entry skipped because its vector length differs from the query's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionMismatch {
    pub chunk_id: ChunkId,
    pub doc_id: DocumentId,
    pub expected: usize,
    pub found: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    pub hits: Vec<SearchHit>,
    pub mismatches: Vec<DimensionMismatch>,
}

/// Score every entry against `query`, drop scores below `min_score`, and keep
/// the best `k`. Equal scores keep scan order.
pub fn rank(query: &[f32], entries: Vec<IndexEntry>, k: usize, min_score: f32) -> Ranking {
    let mut ranking = Ranking::default();
    for entry in entries {
        let Some(score) = cosine_similarity(query, &entry.vector) else {
            ranking.mismatches.push(DimensionMismatch {
                chunk_id: entry.chunk_id,
                doc_id: entry.doc_id,
                expected: query.len(),
                found: entry.vector.len(),
            });
            continue;
        };
        if score.is_nan() || score < min_score {
            continue;
        }
        ranking.hits.push(SearchHit {
            doc_id: entry.doc_id,
            chunk_id: entry.chunk_id,
            ordinal: entry.ordinal,
            score,
            content: entry.content,
        });
    }
    ranking.hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranking.hits.truncate(k);
    ranking
}

pub struct SearchEngine {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl SearchEngine {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Top `k` chunks for `query_text` scoring at least `min_score`.
    pub async fn search(&self, query_text: &str, k: usize, min_score: f32) -> Result<Vec<SearchHit>> {
        Ok(self.search_with_report(query_text, k, min_score).await?.hits)
    }

    /// Like [`search`](Self::search), also returning the entries skipped for a
    /// dimension mismatch.
    pub async fn search_with_report(&self, query_text: &str, k: usize, min_score: f32) -> Result<Ranking> {
        if k == 0 || query_text.trim().is_empty() {
            return Ok(Ranking::default());
        }
        let query = self.embedder.embed(query_text).await?;
        let entries = self.store.get_all().await?;
        let scanned = entries.len();
        let ranking = rank(&query, entries, k, min_score);
        for m in &ranking.mismatches {
            tracing::warn!(chunk_id = %m.chunk_id, doc_id = %m.doc_id, expected = m.expected, found = m.found, "dimension mismatch, entry skipped");
        }
        tracing::debug!(scanned, hits = ranking.hits.len(), skipped = ranking.mismatches.len(), "search complete");
        Ok(ranking)
    }
}
