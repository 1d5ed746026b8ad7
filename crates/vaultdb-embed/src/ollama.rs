//! Ollama-compatible embedding client.
//!
//! `POST {endpoint}/api/embeddings` with `{"model", "prompt"}`; the reply must
//! decode as `{"embedding": [f32, ...]}` with at least one component.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use vaultdb_core::config::EmbeddingSettings;
use vaultdb_core::traits::Embedder;
use vaultdb_core::{Error, Result};

use crate::retry::{retry, Attempt, RetryPolicy};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Strictly decode an embedding reply body.
pub fn decode_embedding(body: &[u8]) -> Result<Vec<f32>> {
    let parsed: EmbeddingResponse =
        serde_json::from_slice(body).map_err(|e| Error::Parse(format!("embedding response: {e}")))?;
    if parsed.embedding.is_empty() {
        return Err(Error::Parse("embedding response: empty vector".into()));
    }
    Ok(parsed.embedding)
}

pub struct OllamaEmbedder {
    client: Client,
    url: String,
    model: String,
    id: String,
    retry: RetryPolicy,
}

impl OllamaEmbedder {
    pub fn new(endpoint: &str, model: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/api/embeddings", endpoint.trim_end_matches('/')),
            model: model.to_string(),
            id: format!("ollama:{model}"),
            retry,
        })
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Self::new(
            &settings.endpoint,
            &settings.model,
            Duration::from_millis(settings.timeout_ms),
            RetryPolicy::from_settings(settings),
        )
    }

    async fn attempt(&self, text: &str) -> std::result::Result<Vec<f32>, Attempt> {
        let request = EmbeddingRequest { model: &self.model, prompt: text };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Attempt::Retry(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let msg = format!("{} returned {}: {}", self.url, status, body.chars().take(200).collect::<String>());
            return Err(if is_transient(status) { Attempt::Retry(msg) } else { Attempt::Fail(Error::EmbeddingService(msg)) });
        }

        let body = response.bytes().await.map_err(|e| Attempt::Retry(describe(&e)))?;
        decode_embedding(&body).map_err(|e| Attempt::Fail(Error::EmbeddingService(e.to_string())))
    }
}

fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let vector = retry(&self.retry, "embedding request", |_| self.attempt(text)).await?;
        tracing::debug!(model = %self.model, dim = vector.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded text");
        Ok(vector)
    }
}
