use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Network failure, timeout, non-success status or unusable payload from
    /// the embedding service.
    #[error("Embedding service error: {0}")]
    EmbeddingService(String),

    /// Durability or read failure in the vector store or embedding cache.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A payload did not match the schema it was decoded against.
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    pub fn embedding(err: impl std::fmt::Display) -> Self {
        Self::EmbeddingService(err.to_string())
    }

    pub fn is_embedding(&self) -> bool {
        matches!(self, Self::EmbeddingService(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
