//! Domain types shared by the chunker, the stores and the search engine.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type DocumentId = String;
pub type ChunkId = String;

/// Build the chunk identifier for `ordinal` within `doc_id`.
///
/// Identifiers are unique within a document and stable for one chunking of
/// one content snapshot; an edit re-derives all of them.
pub fn chunk_id(doc_id: &str, ordinal: usize) -> ChunkId {
    format!("{doc_id}-{ordinal}")
}

/// A contiguous, non-empty span of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: DocumentId,
    pub ordinal: usize,
    pub text: String,
}

/// The persisted unit of the vector store.
///
/// - `chunk_id`/`doc_id`: identity and owning document
/// - `ordinal`: position of the chunk within the document
/// - `content`: chunk text, kept for rendering results
/// - `content_hash`: blake3 of `content`, the embedding cache key
/// - `embedder_id`: provider/model that produced `vector`
/// - `vector`: embedding of any dimension, stored as returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_id: ChunkId,
    pub doc_id: DocumentId,
    pub ordinal: usize,
    pub content: String,
    pub content_hash: String,
    pub embedder_id: String,
    pub vector: Vec<f32>,
}

impl IndexEntry {
    pub fn dim(&self) -> usize {
        self.vector.len()
    }
}

/// One ranked result of a similarity query. Higher `score` is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocumentId,
    pub chunk_id: ChunkId,
    pub ordinal: usize,
    pub score: f32,
    pub content: String,
}

/// Logical version of a document's content, used to order reindex requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Revision(pub u64);

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}
