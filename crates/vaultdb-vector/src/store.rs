//! LanceDB-backed vector store.
//!
//! One table of `IndexEntry` rows keyed by `chunk_id`. Every mutation is a
//! single Lance commit, so a reader (which always scans one table version)
//! sees a document's previous chunk set or its new one, never a mix.
use async_trait::async_trait;
use lancedb::index::scalar::BTreeIndexBuilder;
use lancedb::index::Index;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{Connection, Table};
use futures::TryStreamExt;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tokio::sync::Mutex;

use vaultdb_core::traits::VectorStore;
use vaultdb_core::types::{DocumentId, IndexEntry};
use vaultdb_core::{Error, Result};

use crate::schema::build_entries_schema;
use crate::table::{batch_reader, collect_entries, doc_filter, ensure_table, entries_to_record_batch, open_db, string_column};

pub struct LanceVectorStore {
    table: Table,
    table_name: String,
    // Single writer process: in-process writes are serialised so concurrent
    // documents never race on a Lance commit. Reads do not take this.
    write_lock: Mutex<()>,
}

impl LanceVectorStore {
    pub async fn open(db_path: &Path, table_name: &str) -> Result<Self> {
        let conn = open_db(db_path.to_string_lossy().as_ref()).await?;
        Self::with_connection(&conn, table_name).await
    }

    pub async fn with_connection(conn: &Connection, table_name: &str) -> Result<Self> {
        let table = ensure_table(conn, table_name, build_entries_schema()).await?;
        Ok(Self { table, table_name: table_name.to_string(), write_lock: Mutex::new(()) })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub async fn count(&self) -> Result<usize> {
        self.table.count_rows(None).await.map_err(Error::storage)
    }

    /// Build the `doc_id` secondary index if it does not exist yet. Returns
    /// whether an index was created. An empty table is left alone.
    pub async fn ensure_document_index(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let indices = self.table.list_indices().await.map_err(Error::storage)?;
        if indices.iter().any(|i| i.columns.iter().any(|c| c == "doc_id")) {
            return Ok(false);
        }
        if self.table.count_rows(None).await.map_err(Error::storage)? == 0 {
            return Ok(false);
        }
        self.table
            .create_index(&["doc_id"], Index::BTree(BTreeIndexBuilder::default()))
            .execute()
            .await
            .map_err(Error::storage)?;
        tracing::info!(table = %self.table_name, "built doc_id index");
        Ok(true)
    }

    /// Insert-or-update `entries` by chunk id in one commit. With `scope`, rows
    /// matching that filter but absent from `entries` are deleted in the same
    /// commit.
    async fn merge(&self, entries: &[IndexEntry], scope: Option<String>) -> Result<()> {
        let reader = batch_reader(entries_to_record_batch(entries)?);
        let _guard = self.write_lock.lock().await;
        let mut mi = self.table.merge_insert(&["chunk_id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        if let Some(filter) = scope {
            mi.when_not_matched_by_source_delete(Some(filter));
        }
        mi.execute(reader).await.map_err(Error::storage)?;
        Ok(())
    }
}

/// Keep the last entry for each chunk id, preserving first-seen order.
fn dedup_by_chunk(entries: Vec<IndexEntry>) -> Vec<IndexEntry> {
    let mut seen = HashSet::new();
    let mut out: Vec<IndexEntry> = entries.into_iter().rev().filter(|e| seen.insert(e.chunk_id.clone())).collect();
    out.reverse();
    out
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let entries = dedup_by_chunk(entries);
        self.merge(&entries, None).await?;
        tracing::debug!(table = %self.table_name, rows = entries.len(), "upserted entries");
        Ok(())
    }

    async fn replace_document(&self, doc_id: &str, entries: Vec<IndexEntry>) -> Result<()> {
        if let Some(stray) = entries.iter().find(|e| e.doc_id != doc_id) {
            return Err(Error::Operation(format!("entry {} belongs to {}, not {}", stray.chunk_id, stray.doc_id, doc_id)));
        }
        if entries.is_empty() {
            return self.delete_by_document(doc_id).await;
        }
        let entries = dedup_by_chunk(entries);
        self.merge(&entries, Some(doc_filter(doc_id))).await?;
        tracing::debug!(table = %self.table_name, doc_id, rows = entries.len(), "replaced document entries");
        Ok(())
    }

    async fn delete_by_document(&self, doc_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.table.delete(&doc_filter(doc_id)).await.map_err(Error::storage)?;
        Ok(())
    }

    async fn get_by_document(&self, doc_id: &str) -> Result<Vec<IndexEntry>> {
        let stream = self.table.query().only_if(doc_filter(doc_id)).execute().await.map_err(Error::storage)?;
        let mut entries = collect_entries(stream).await?;
        entries.sort_by_key(|e| e.ordinal);
        Ok(entries)
    }

    async fn get_all(&self) -> Result<Vec<IndexEntry>> {
        let stream = self.table.query().execute().await.map_err(Error::storage)?;
        collect_entries(stream).await
    }

    async fn documents(&self) -> Result<Vec<DocumentId>> {
        let mut stream = self
            .table
            .query()
            .select(Select::columns(&["doc_id"]))
            .execute()
            .await
            .map_err(Error::storage)?;
        let mut ids = BTreeSet::new();
        while let Some(batch) = stream.try_next().await.map_err(Error::storage)? {
            let col = string_column(&batch, "doc_id")?;
            for i in 0..batch.num_rows() {
                ids.insert(col.value(i).to_string());
            }
        }
        Ok(ids.into_iter().collect())
    }
}
