//! Paragraph chunker.
//!
//! A paragraph ends at a blank line (empty or whitespace-only). Paragraphs are
//! trimmed and empty ones dropped. An optional word budget splits long
//! paragraphs into overlapping windows before they reach the embedder.

use serde::{Deserialize, Serialize};

use crate::types::{chunk_id, Chunk};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Secondary split for paragraphs longer than this many words. `None`
    /// leaves paragraphs whole.
    pub max_words: Option<usize>,
    pub overlap_percent: f32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { max_words: None, overlap_percent: 0.2 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for paragraph in paragraphs(text) {
            match self.config.max_words {
                Some(max) if max > 0 && paragraph.split_whitespace().count() > max => {
                    chunks.extend(self.split_paragraph_with_overlap(&paragraph, max));
                }
                _ => chunks.push(paragraph),
            }
        }
        chunks
    }

    pub fn chunk_document(&self, doc_id: &str, text: &str) -> Vec<Chunk> {
        self.chunk(text)
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| Chunk { id: chunk_id(doc_id, ordinal), doc_id: doc_id.to_string(), ordinal, text })
            .collect()
    }

    fn split_paragraph_with_overlap(&self, paragraph: &str, words_per_chunk: usize) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let overlap = (words_per_chunk as f32 * self.config.overlap_percent.clamp(0.0, 0.9)) as usize;
        let step = words_per_chunk.saturating_sub(overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + words_per_chunk).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start += step;
        }
        chunks
    }
}

/// Paragraphs as trimmed slices of `text`, so each one stays a contiguous
/// span of the input whatever the line endings.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut span: Option<(usize, usize)> = None;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let start = offset;
        offset += line.len();
        if line.trim().is_empty() {
            if let Some((s, e)) = span.take() {
                out.push(text[s..e].trim().to_string());
            }
        } else {
            let end = start + line.trim_end_matches(&['\r', '\n'][..]).len();
            span = Some(span.map_or((start, end), |(s, _)| (s, end)));
        }
    }
    if let Some((s, e)) = span {
        out.push(text[s..e].trim().to_string());
    }
    out
}
