//! Filesystem-backed document source.
//!
//! Document ids are `/`-separated paths relative to the vault root, so the
//! same note keeps the same id across platforms.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::traits::DocumentSource;
use crate::types::DocumentId;

#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        let extensions = extensions.into_iter().map(|e| e.trim_start_matches('.').to_ascii_lowercase()).collect();
        Self { root: root.into(), extensions }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a document id onto a path under the root, refusing ids that escape it.
    pub fn path_for(&self, doc_id: &str) -> Result<PathBuf> {
        let rel = Path::new(doc_id);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if doc_id.is_empty() || escapes {
            return Err(Error::NotFound(format!("{doc_id} is not a path inside the vault")));
        }
        Ok(self.root.join(rel))
    }

    /// Document id for a path under the root.
    pub fn doc_id_for(&self, path: &Path) -> Option<DocumentId> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if parts.is_empty() { None } else { Some(parts.join("/")) }
    }

    fn wanted(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Every wanted file under the root, sorted. Any walk error fails the
    /// whole listing: callers treat absent ids as deleted documents.
    fn list_sync(&self) -> Result<Vec<DocumentId>> {
        if !self.root.is_dir() {
            return Err(Error::NotFound(format!("vault root {} is not a directory", self.root.display())));
        }
        let mut ids = Vec::new();
        let walker = walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
        for entry in walker {
            let entry = entry.map_err(|e| Error::Operation(format!("vault scan of {} failed: {e}", self.root.display())))?;
            if !entry.file_type().is_file() || !self.wanted(entry.path()) {
                continue;
            }
            if let Some(id) = self.doc_id_for(entry.path()) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl DocumentSource for FsVault {
    async fn read(&self, doc_id: &str) -> Result<String> {
        let path = self.path_for(doc_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    tracing::debug!(doc_id, valid_up_to = e.utf8_error().valid_up_to(), "non-UTF-8 content, decoding lossily");
                    String::from_utf8_lossy(e.as_bytes()).to_string()
                }
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(doc_id.to_string())),
            Err(e) => Err(Error::Operation(format!("failed to read {}: {}", path.display(), e))),
        }
    }

    async fn list(&self) -> Result<Vec<DocumentId>> {
        let vault = self.clone();
        tokio::task::spawn_blocking(move || vault.list_sync())
            .await
            .map_err(|e| Error::Operation(format!("vault scan failed: {e}")))?
    }
}
