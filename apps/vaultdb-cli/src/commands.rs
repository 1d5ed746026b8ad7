use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use indicatif::{ProgressBar, ProgressStyle};

use vaultdb_core::config::{Config, Settings};
use vaultdb_core::source::FsVault;
use vaultdb_core::traits::{DocumentSource, Embedder, VectorStore};
use vaultdb_core::types::SearchHit;
use vaultdb_embed::build_embedder;
use vaultdb_index::{
    render_markdown, results_file_name, DocumentEvent, IndexCoordinator, IndexQueue, ReindexOutcome, SearchEngine,
};
use vaultdb_vector::table::open_db;
use vaultdb_vector::{LanceEmbeddingCache, LanceVectorStore};

pub struct App {
    settings: Settings,
    vault: Arc<FsVault>,
    store: Arc<LanceVectorStore>,
    embedder: Arc<dyn Embedder>,
    coordinator: Arc<IndexCoordinator>,
}

impl App {
    pub async fn open(config: &Config, vault_root: Option<PathBuf>) -> Result<Self> {
        let settings = config.settings()?;
        let root = vault_root.unwrap_or_else(|| settings.vault.root());
        let vault = Arc::new(FsVault::new(root, settings.vault.extensions.clone()));

        let db_path = settings.store.db_path();
        std::fs::create_dir_all(&db_path).with_context(|| format!("creating {}", db_path.display()))?;
        let conn = open_db(db_path.to_string_lossy().as_ref()).await?;
        let store = Arc::new(LanceVectorStore::with_connection(&conn, &settings.store.table).await?);
        let embedder = build_embedder(&settings.embedding)?;

        let mut coordinator =
            IndexCoordinator::new(embedder.clone(), store.clone(), settings.chunking.clone(), &settings.index);
        if settings.store.cache_enabled {
            let cache = LanceEmbeddingCache::open(&conn, &settings.store.cache_table).await?;
            coordinator = coordinator.with_cache(Arc::new(cache));
        }
        tracing::debug!(vault = %vault.root().display(), db = %db_path.display(), "opened");

        Ok(Self { settings, vault, store, embedder, coordinator: Arc::new(coordinator) })
    }

    pub async fn sync(&self) -> Result<()> {
        let docs = self.vault.list().await?;
        let present: HashSet<&str> = docs.iter().map(String::as_str).collect();
        let stale: Vec<String> =
            self.store.documents().await?.into_iter().filter(|d| !present.contains(d.as_str())).collect();
        println!("Syncing {} documents from {}", docs.len(), self.vault.root().display());

        let (queue, mut outcomes) =
            IndexQueue::new(self.coordinator.clone(), self.vault.clone(), &self.settings.index).with_outcomes();
        let handle = queue.spawn();

        let pb = ProgressBar::new((docs.len() + stale.len()) as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")?
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        let progress = {
            let pb = pb.clone();
            tokio::spawn(async move {
                while let Some(done) = outcomes.recv().await {
                    pb.set_message(done.doc_id);
                    pb.inc(1);
                }
            })
        };

        for doc in docs {
            handle.notify(DocumentEvent::Modified(doc)).await?;
        }
        for doc in stale {
            handle.notify(DocumentEvent::Deleted(doc)).await?;
        }
        let report = handle.shutdown().await?;
        progress.await?;
        pb.finish_and_clear();

        if self.store.ensure_document_index().await? {
            println!("Built document index on {}", self.store.table_name());
        }
        println!(
            "✅ Indexed {}, removed {}, skipped {} ({} chunks stored)",
            report.indexed,
            report.removed,
            report.superseded + report.coalesced,
            self.store.count().await?
        );
        for (doc, err) in &report.failed {
            eprintln!("❌ {doc}: {err}");
        }
        if !report.failed.is_empty() {
            bail!("{} documents failed to index", report.failed.len());
        }
        Ok(())
    }

    pub async fn reindex(&self, doc: &str) -> Result<()> {
        let outcome = match self.vault.read(doc).await {
            Ok(text) => self.coordinator.reindex_document(doc, &text).await?,
            Err(e) if e.is_not_found() => self.coordinator.remove_document(doc).await?,
            Err(e) => return Err(e.into()),
        };
        print_outcome(doc, &outcome);
        Ok(())
    }

    pub async fn remove(&self, doc: &str) -> Result<()> {
        let outcome = self.coordinator.remove_document(doc).await?;
        print_outcome(doc, &outcome);
        Ok(())
    }

    pub async fn query(
        &self,
        text: &str,
        k: Option<usize>,
        min_score: Option<f32>,
        markdown: bool,
        write: Option<&Path>,
    ) -> Result<()> {
        let k = k.unwrap_or(self.settings.search.default_k);
        let min_score = min_score.unwrap_or(self.settings.search.min_score);
        let engine = SearchEngine::new(self.embedder.clone(), self.store.clone());
        let hits = engine.search(text, k, min_score).await?;

        let note = render_markdown(text, &hits);
        if markdown {
            print!("{note}");
        } else {
            print_hits(&hits);
        }
        if let Some(dir) = write {
            tokio::fs::create_dir_all(dir).await?;
            let path = dir.join(results_file_name(text));
            tokio::fs::write(&path, note).await.with_context(|| format!("writing {}", path.display()))?;
            println!("📝 Wrote {}", path.display());
        }
        Ok(())
    }

    pub async fn show(&self, doc: &str) -> Result<()> {
        let entries = self.coordinator.entries_for(doc).await?;
        if entries.is_empty() {
            println!("{doc} is not indexed");
            return Ok(());
        }
        for e in entries {
            println!("[{}] {} dim={} {}", e.ordinal, e.chunk_id, e.dim(), preview(&e.content, 80));
        }
        Ok(())
    }
}

fn print_outcome(doc: &str, outcome: &ReindexOutcome) {
    match outcome {
        ReindexOutcome::Indexed { chunks, embedded, cached, .. } => {
            println!("✅ {doc}: {chunks} chunks ({embedded} embedded, {cached} cached)")
        }
        ReindexOutcome::Removed { .. } => println!("🗑  {doc}: removed"),
        ReindexOutcome::Superseded { latest, .. } => println!("⏭  {doc}: superseded by {latest}"),
    }
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results.");
        return;
    }
    for (i, hit) in hits.iter().enumerate() {
        println!("{}. {:.4}  {} (chunk {})", i + 1, hit.score, hit.doc_id, hit.ordinal);
        println!("   {}", preview(&hit.content, 100));
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\n b\tc", 10), "a b c");
        assert_eq!(preview("abcdef", 3), "abc…");
    }
}
