use vaultdb_core::chunker::{Chunker, ChunkingConfig};

#[test]
fn blank_lines_separate_paragraphs() {
    let chunks = Chunker::default().chunk("para one\n\npara two\n\n\npara three");
    assert_eq!(chunks, vec!["para one", "para two", "para three"]);
}

#[test]
fn no_blank_lines_yields_single_chunk() {
    let chunks = Chunker::default().chunk("line one\nline two\n");
    assert_eq!(chunks, vec!["line one\nline two"]);
}

#[test]
fn blank_document_yields_nothing() {
    assert!(Chunker::default().chunk("").is_empty());
    assert!(Chunker::default().chunk("  \n\n\t\n   ").is_empty());
}

#[test]
fn whitespace_only_lines_count_as_blank() {
    let chunks = Chunker::default().chunk("  alpha  \n   \n\tbeta\r\n\r\ngamma");
    assert_eq!(chunks, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn crlf_paragraphs_stay_spans_of_the_text() {
    let text = "line one\r\nline two\r\n\r\nnext";
    let chunks = Chunker::default().chunk(text);
    assert_eq!(chunks, vec!["line one\r\nline two", "next"]);
    assert!(chunks.iter().all(|c| text.contains(c.as_str())));
}

#[test]
fn chunk_ids_follow_document_and_ordinal() {
    let chunks = Chunker::default().chunk_document("notes/today.md", "first\n\nsecond");
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].id, "notes/today.md-0");
    assert_eq!(chunks[1].id, "notes/today.md-1");
    assert_eq!(chunks[1].ordinal, 1);
    assert_eq!(chunks[1].doc_id, "notes/today.md");
    assert_eq!(chunks[1].text, "second");
}

#[test]
fn chunking_is_deterministic() {
    let text = "a b c\n\nd e f\n\n\ng";
    let chunker = Chunker::default();
    assert_eq!(chunker.chunk_document("d", text), chunker.chunk_document("d", text));
}

#[test]
fn long_paragraphs_split_only_when_budget_is_set() {
    let words: Vec<String> = (0..10).map(|i| format!("w{i}")).collect();
    let text = words.join(" ");

    assert_eq!(Chunker::default().chunk(&text).len(), 1);

    let chunker = Chunker::new(ChunkingConfig { max_words: Some(4), overlap_percent: 0.25 });
    let chunks = chunker.chunk(&text);
    // windows of 4 words stepping by 3
    assert_eq!(chunks, vec!["w0 w1 w2 w3", "w3 w4 w5 w6", "w6 w7 w8 w9"]);
}
