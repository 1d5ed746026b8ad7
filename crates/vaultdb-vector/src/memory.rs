//! In-memory vector store with the same contract as the Lance store.
//!
//! Entries keyed by chunk id plus a document → chunk ids secondary index, both
//! behind one lock so every operation observes a single consistent state.
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use vaultdb_core::traits::VectorStore;
use vaultdb_core::types::{ChunkId, DocumentId, IndexEntry};
use vaultdb_core::{Error, Result};

#[derive(Default)]
struct Inner {
    entries: HashMap<ChunkId, IndexEntry>,
    by_document: BTreeMap<DocumentId, BTreeSet<ChunkId>>,
}

impl Inner {
    fn remove_document(&mut self, doc_id: &str) {
        if let Some(ids) = self.by_document.remove(doc_id) {
            for id in ids {
                self.entries.remove(&id);
            }
        }
    }

    fn insert(&mut self, entry: IndexEntry) {
        if let Some(old) = self.entries.get(&entry.chunk_id) {
            if old.doc_id != entry.doc_id {
                let old_doc = old.doc_id.clone();
                if let Some(ids) = self.by_document.get_mut(&old_doc) {
                    ids.remove(&entry.chunk_id);
                    if ids.is_empty() {
                        self.by_document.remove(&old_doc);
                    }
                }
            }
        }
        self.by_document.entry(entry.doc_id.clone()).or_default().insert(entry.chunk_id.clone());
        self.entries.insert(entry.chunk_id.clone(), entry);
    }

    fn document_entries(&self, doc_id: &str) -> Vec<IndexEntry> {
        let mut out: Vec<IndexEntry> = self
            .by_document
            .get(doc_id)
            .map(|ids| ids.iter().filter_map(|id| self.entries.get(id).cloned()).collect())
            .unwrap_or_default();
        out.sort_by_key(|e| e.ordinal);
        out
    }
}

#[derive(Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Inner>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.entries.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner.read().map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        let mut inner = self.write()?;
        for entry in entries {
            inner.insert(entry);
        }
        Ok(())
    }

    async fn replace_document(&self, doc_id: &str, entries: Vec<IndexEntry>) -> Result<()> {
        if let Some(stray) = entries.iter().find(|e| e.doc_id != doc_id) {
            return Err(Error::Operation(format!("entry {} belongs to {}, not {}", stray.chunk_id, stray.doc_id, doc_id)));
        }
        let mut inner = self.write()?;
        inner.remove_document(doc_id);
        for entry in entries {
            inner.insert(entry);
        }
        Ok(())
    }

    async fn delete_by_document(&self, doc_id: &str) -> Result<()> {
        self.write()?.remove_document(doc_id);
        Ok(())
    }

    async fn get_by_document(&self, doc_id: &str) -> Result<Vec<IndexEntry>> {
        Ok(self.read()?.document_entries(doc_id))
    }

    /// Snapshot ordered by document id, then ordinal.
    async fn get_all(&self) -> Result<Vec<IndexEntry>> {
        let inner = self.read()?;
        Ok(inner.by_document.keys().flat_map(|doc| inner.document_entries(doc)).collect())
    }

    async fn documents(&self) -> Result<Vec<DocumentId>> {
        Ok(self.read()?.by_document.keys().cloned().collect())
    }
}
