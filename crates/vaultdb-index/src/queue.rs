//! Change-notification queue feeding the coordinator.
//!
//! Events for one document are applied in notification order and at most one
//! runs at a time; events that pile up behind a running one collapse into
//! the latest. Different documents run concurrently up to a fixed limit.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{Id as TaskId, JoinHandle, JoinSet};

use crate::coordinator::{IndexCoordinator, ReindexOutcome};
use vaultdb_core::config::IndexSettings;
use vaultdb_core::traits::DocumentSource;
use vaultdb_core::types::{DocumentId, Revision};
use vaultdb_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Created or edited; the current content is read when the event runs.
    Modified(DocumentId),
    Deleted(DocumentId),
}

impl DocumentEvent {
    pub fn doc_id(&self) -> &str {
        match self {
            DocumentEvent::Modified(id) | DocumentEvent::Deleted(id) => id,
        }
    }
}

/// Result of one applied event, streamed to [`IndexQueue::with_outcomes`].
#[derive(Debug)]
pub struct Completed {
    pub doc_id: DocumentId,
    pub result: Result<ReindexOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueReport {
    pub indexed: usize,
    pub removed: usize,
    pub superseded: usize,
    /// Events replaced by a later event for the same document before running.
    pub coalesced: usize,
    pub failed: Vec<(DocumentId, String)>,
}

impl QueueReport {
    fn record(&mut self, done: &Completed) {
        match &done.result {
            Ok(ReindexOutcome::Indexed { .. }) => self.indexed += 1,
            Ok(ReindexOutcome::Removed { .. }) => self.removed += 1,
            Ok(ReindexOutcome::Superseded { .. }) => self.superseded += 1,
            Err(e) => self.failed.push((done.doc_id.clone(), e.to_string())),
        }
    }
}

pub struct IndexQueue {
    coordinator: Arc<IndexCoordinator>,
    source: Arc<dyn DocumentSource>,
    capacity: usize,
    concurrency: usize,
    outcomes: Option<mpsc::UnboundedSender<Completed>>,
}

impl IndexQueue {
    pub fn new(coordinator: Arc<IndexCoordinator>, source: Arc<dyn DocumentSource>, settings: &IndexSettings) -> Self {
        Self {
            coordinator,
            source,
            capacity: settings.queue_capacity.max(1),
            concurrency: settings.max_concurrent_documents.max(1),
            outcomes: None,
        }
    }

    /// Also stream every applied event's result.
    pub fn with_outcomes(mut self) -> (Self, mpsc::UnboundedReceiver<Completed>) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outcomes = Some(tx);
        (self, rx)
    }

    pub fn spawn(self) -> IndexQueueHandle {
        let (tx, rx) = mpsc::channel(self.capacity);
        let task = tokio::spawn(self.dispatch(rx));
        IndexQueueHandle { tx, task }
    }

    async fn dispatch(self, mut rx: mpsc::Receiver<DocumentEvent>) -> QueueReport {
        let mut report = QueueReport::default();
        let mut ready: VecDeque<DocumentId> = VecDeque::new();
        let mut queued: HashMap<DocumentId, (DocumentEvent, Revision)> = HashMap::new();
        let mut in_flight: HashSet<DocumentId> = HashSet::new();
        // Task id to document, so a task that panics still frees its document.
        let mut running: HashMap<TaskId, DocumentId> = HashMap::new();
        let mut tasks: JoinSet<Completed> = JoinSet::new();
        let mut open = true;

        loop {
            while in_flight.len() < self.concurrency {
                let Some(doc_id) = ready.pop_front() else { break };
                let Some((event, revision)) = queued.remove(&doc_id) else { continue };
                in_flight.insert(doc_id.clone());
                let task = tasks.spawn(run(self.coordinator.clone(), self.source.clone(), event, revision));
                running.insert(task.id(), doc_id);
            }
            if !open && tasks.is_empty() && ready.is_empty() {
                break;
            }

            tokio::select! {
                event = rx.recv(), if open => match event {
                    Some(event) => {
                        let doc_id = event.doc_id().to_string();
                        let revision = self.coordinator.next_revision();
                        tracing::debug!(doc_id = %doc_id, %revision, ?event, "queued");
                        if queued.insert(doc_id.clone(), (event, revision)).is_some() {
                            report.coalesced += 1;
                        } else if !in_flight.contains(&doc_id) {
                            ready.push_back(doc_id);
                        }
                    }
                    None => open = false,
                },
                Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                    let done = match joined {
                        Ok((id, done)) => {
                            running.remove(&id);
                            done
                        }
                        Err(e) => {
                            let Some(doc_id) = running.remove(&e.id()) else {
                                tracing::error!(error = %e, "unknown index task failed");
                                continue;
                            };
                            tracing::error!(doc_id = %doc_id, error = %e, "index task panicked");
                            Completed { result: Err(Error::Operation(format!("indexing {doc_id} panicked"))), doc_id }
                        }
                    };
                    in_flight.remove(&done.doc_id);
                    if queued.contains_key(&done.doc_id) {
                        ready.push_back(done.doc_id.clone());
                    }
                    report.record(&done);
                    if let Some(tx) = &self.outcomes {
                        let _ = tx.send(done);
                    }
                }
                else => break,
            }
        }
        tracing::info!(
            indexed = report.indexed,
            removed = report.removed,
            superseded = report.superseded,
            coalesced = report.coalesced,
            failed = report.failed.len(),
            "index queue drained"
        );
        report
    }
}

/// Sender side of a running [`IndexQueue`].
pub struct IndexQueueHandle {
    tx: mpsc::Sender<DocumentEvent>,
    task: JoinHandle<QueueReport>,
}

impl IndexQueueHandle {
    /// Enqueue an event, waiting while the queue is full.
    pub async fn notify(&self, event: DocumentEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| Error::Operation("index queue is closed".to_string()))
    }

    /// Stop accepting events, finish everything queued and report.
    pub async fn shutdown(self) -> Result<QueueReport> {
        let IndexQueueHandle { tx, task } = self;
        drop(tx);
        task.await.map_err(|e| Error::Operation(format!("index queue failed: {e}")))
    }
}

async fn run(
    coordinator: Arc<IndexCoordinator>,
    source: Arc<dyn DocumentSource>,
    event: DocumentEvent,
    revision: Revision,
) -> Completed {
    let doc_id = event.doc_id().to_string();
    let result = apply(&coordinator, source.as_ref(), event, revision).await;
    if let Err(e) = &result {
        tracing::error!(doc_id = %doc_id, %revision, error = %e, "indexing failed");
    }
    Completed { doc_id, result }
}

async fn apply(
    coordinator: &IndexCoordinator,
    source: &dyn DocumentSource,
    event: DocumentEvent,
    revision: Revision,
) -> Result<ReindexOutcome> {
    match event {
        DocumentEvent::Deleted(doc_id) => coordinator.remove_at(&doc_id, revision).await,
        DocumentEvent::Modified(doc_id) => match source.read(&doc_id).await {
            Ok(text) => coordinator.reindex_at(&doc_id, revision, &text).await,
            Err(e) if e.is_not_found() => {
                tracing::debug!(doc_id = %doc_id, "gone before indexing, removing");
                coordinator.remove_at(&doc_id, revision).await
            }
            Err(e) => Err(e),
        },
    }
}
