//! vaultdb-embed
//!
//! Embedding providers: an HTTP client for an Ollama-compatible embedding
//! endpoint with bounded retry, and a deterministic fake for tests and
//! offline development.

pub mod fake;
pub mod ollama;
pub mod retry;

use std::sync::Arc;

use vaultdb_core::config::EmbeddingSettings;
use vaultdb_core::traits::Embedder;
use vaultdb_core::Result;

pub use fake::FakeEmbedder;
pub use ollama::OllamaEmbedder;
pub use retry::RetryPolicy;

/// Build the embedder selected by `settings`.
///
/// `embedding.fake` (or `APP_USE_FAKE_EMBEDDINGS=1`, folded in by the config
/// loader) selects [`FakeEmbedder`]; otherwise the HTTP client is used.
pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.fake {
        tracing::info!(dim = settings.fake_dim, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.fake_dim)));
    }
    tracing::info!(endpoint = %settings.endpoint, model = %settings.model, "using ollama embedder");
    Ok(Arc::new(OllamaEmbedder::from_settings(settings)?))
}
