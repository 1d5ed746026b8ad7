//! vaultdb-core
//!
//! Domain types, error taxonomy, configuration and the seams (`Embedder`,
//! `VectorStore`, `DocumentSource`) shared by the embedding, storage and
//! indexing crates.

pub mod chunker;
pub mod config;
pub mod error;
pub mod source;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
