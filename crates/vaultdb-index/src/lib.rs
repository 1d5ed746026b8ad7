//! vaultdb-index
//!
//! Orchestration on top of the stores: the coordinator that keeps each
//! document's entries in step with its content, the change-notification
//! queue that feeds it, and similarity search over the stored vectors.

pub mod coordinator;
pub mod queue;
pub mod render;
pub mod search;

pub use coordinator::{IndexCoordinator, ReindexOutcome};
pub use queue::{Completed, DocumentEvent, IndexQueue, IndexQueueHandle, QueueReport};
pub use render::{render_markdown, results_file_name};
pub use search::{cosine_similarity, rank, DimensionMismatch, Ranking, SearchEngine};
