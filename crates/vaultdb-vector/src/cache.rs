//! Embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! The coordinator consults the cache before calling the embedding service
//! and writes misses through, so unchanged paragraphs of an edited note are
//! not embedded again.
use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{Array, ListArray, RecordBatch, StringArray, TimestampMillisecondArray};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

use vaultdb_core::{Error, Result};

use crate::schema::build_cache_schema;
use crate::table::{batch_reader, ensure_table, sql_literal, string_column, vector_array};

pub fn hash_content(s: &str) -> String {
    blake3::hash(s.as_bytes()).to_hex().to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub content_hash: String,
    pub embedder_id: String,
    pub vector: Vec<f32>,
}

#[async_trait]
pub trait EmbeddingCache: Send + Sync {
    /// Cached vectors for the given hashes, keyed by hash. Misses are absent.
    async fn get_many(&self, embedder_id: &str, hashes: &[String]) -> Result<HashMap<String, Vec<f32>>>;
    async fn put_many(&self, entries: &[CacheEntry]) -> Result<()>;
}

pub struct LanceEmbeddingCache {
    table: Table,
    write_lock: Mutex<()>,
}

impl LanceEmbeddingCache {
    pub async fn open(conn: &Connection, table_name: &str) -> Result<Self> {
        let table = ensure_table(conn, table_name, build_cache_schema()).await?;
        Ok(Self { table, write_lock: Mutex::new(()) })
    }
}

#[async_trait]
impl EmbeddingCache for LanceEmbeddingCache {
    async fn get_many(&self, embedder_id: &str, hashes: &[String]) -> Result<HashMap<String, Vec<f32>>> {
        let mut out = HashMap::new();
        if hashes.is_empty() {
            return Ok(out);
        }
        let in_list = hashes.iter().map(|h| sql_literal(h)).collect::<Vec<_>>().join(",");
        let filter = format!("embedder_id = {} AND content_hash IN ({})", sql_literal(embedder_id), in_list);
        let mut stream = self.table.query().only_if(filter).execute().await.map_err(Error::storage)?;
        while let Some(batch) = stream.try_next().await.map_err(Error::storage)? {
            let hash_col = string_column(&batch, "content_hash")?;
            let vec_col = batch
                .column_by_name("vector")
                .and_then(|c| c.as_any().downcast_ref::<ListArray>())
                .ok_or_else(|| Error::Storage("cache column vector missing".into()))?;
            for i in 0..batch.num_rows() {
                if !vec_col.is_valid(i) {
                    continue;
                }
                let vals = vec_col.value(i).as_primitive::<Float32Type>().values().to_vec();
                if !vals.is_empty() {
                    out.insert(hash_col.value(i).to_string(), vals);
                }
            }
        }
        Ok(out)
    }

    async fn put_many(&self, entries: &[CacheEntry]) -> Result<()> {
        let mut unique: HashMap<(&str, &str), &CacheEntry> = HashMap::new();
        for e in entries {
            unique.insert((e.content_hash.as_str(), e.embedder_id.as_str()), e);
        }
        if unique.is_empty() {
            return Ok(());
        }
        let rows: Vec<&CacheEntry> = unique.into_values().collect();
        let now = Utc::now().timestamp_millis();
        let batch = RecordBatch::try_new(
            build_cache_schema(),
            vec![
                Arc::new(StringArray::from(rows.iter().map(|e| e.content_hash.as_str()).collect::<Vec<_>>())),
                Arc::new(StringArray::from(rows.iter().map(|e| e.embedder_id.as_str()).collect::<Vec<_>>())),
                Arc::new(vector_array(rows.iter().map(|e| &e.vector))),
                Arc::new(TimestampMillisecondArray::from(vec![now; rows.len()])),
            ],
        )
        .map_err(Error::storage)?;
        let _guard = self.write_lock.lock().await;
        let mut mi = self.table.merge_insert(&["content_hash", "embedder_id"]);
        mi.when_not_matched_insert_all();
        mi.execute(batch_reader(batch)).await.map_err(Error::storage)?;
        Ok(())
    }
}

/// Process-local cache, for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryEmbeddingCache {
    entries: RwLock<HashMap<(String, String), Vec<f32>>>,
}

impl MemoryEmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EmbeddingCache for MemoryEmbeddingCache {
    async fn get_many(&self, embedder_id: &str, hashes: &[String]) -> Result<HashMap<String, Vec<f32>>> {
        let entries = self.entries.read().map_err(|_| Error::Storage("cache lock poisoned".into()))?;
        Ok(hashes
            .iter()
            .filter_map(|h| entries.get(&(h.clone(), embedder_id.to_string())).map(|v| (h.clone(), v.clone())))
            .collect())
    }

    async fn put_many(&self, entries: &[CacheEntry]) -> Result<()> {
        let mut map = self.entries.write().map_err(|_| Error::Storage("cache lock poisoned".into()))?;
        for e in entries {
            map.insert((e.content_hash.clone(), e.embedder_id.clone()), e.vector.clone());
        }
        Ok(())
    }
}
