//! vaultdb-vector
//!
//! Vector store implementations (LanceDB-backed and in-memory), their Arrow
//! schemas, and the content-hash keyed embedding cache.

pub mod cache;
pub mod memory;
pub mod schema;
pub mod store;
pub mod table;

pub use cache::{hash_content, EmbeddingCache, LanceEmbeddingCache, MemoryEmbeddingCache};
pub use memory::MemoryVectorStore;
pub use store::LanceVectorStore;
