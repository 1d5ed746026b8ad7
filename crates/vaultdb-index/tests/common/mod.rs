#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use vaultdb_core::chunker::ChunkingConfig;
use vaultdb_core::config::IndexSettings;
use vaultdb_core::traits::{Embedder, VectorStore};
use vaultdb_core::{Error, Result};
use vaultdb_index::IndexCoordinator;
use vaultdb_vector::MemoryVectorStore;

/// Embedder with per-text vectors, delays and failures.
#[derive(Default)]
pub struct Scripted {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    delays: Mutex<HashMap<String, Duration>>,
    failing: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl Scripted {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn vector(&self, text: &str, v: Vec<f32>) {
        self.vectors.lock().unwrap().insert(text.to_string(), v);
    }

    pub fn delay(&self, text: &str, d: Duration) {
        self.delays.lock().unwrap().insert(text.to_string(), d);
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for Scripted {
    fn embedder_id(&self) -> &str {
        "scripted"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().get(text).copied();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.failing.lock().unwrap().contains(text) {
            return Err(Error::embedding(format!("scripted failure for {text:?}")));
        }
        let known = self.vectors.lock().unwrap().get(text).cloned();
        Ok(known.unwrap_or_else(|| vec![text.len() as f32, 1.0]))
    }
}

pub fn coordinator(embedder: Arc<Scripted>) -> (Arc<IndexCoordinator>, Arc<MemoryVectorStore>) {
    let store = Arc::new(MemoryVectorStore::new());
    let coordinator = IndexCoordinator::new(
        embedder,
        store.clone() as Arc<dyn VectorStore>,
        ChunkingConfig::default(),
        &IndexSettings::default(),
    );
    (Arc::new(coordinator), store)
}

pub async fn contents(store: &dyn VectorStore, doc_id: &str) -> Vec<String> {
    store.get_by_document(doc_id).await.unwrap().into_iter().map(|e| e.content).collect()
}
