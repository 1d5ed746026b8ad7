//! Markdown rendering of query results as a note with backlinks.
use std::fmt::Write as _;

use vaultdb_core::types::SearchHit;

pub fn render_markdown(query: &str, hits: &[SearchHit]) -> String {
    let mut out = format!("# Query Results for \"{query}\"\n\n");
    if hits.is_empty() {
        out.push_str("_No results._\n");
        return out;
    }
    for hit in hits {
        let _ = writeln!(out, "- [[{}]] (chunk {}, Similarity: {:.4})", hit.doc_id, hit.ordinal, hit.score);
    }
    out
}

/// File name for a results note: characters that are not allowed in note
/// names become `_`, capped at 100 characters.
pub fn results_file_name(query: &str) -> String {
    let cleaned: String = query
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '#' | '^' | '[' | ']') || c.is_control() { '_' } else { c })
        .take(100)
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() { "query.md".to_string() } else { format!("{cleaned}.md") }
}
