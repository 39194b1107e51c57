//! Chunk assembly: per-page for PDFs, whole-text otherwise.

use super::helpers::{char_len, split_recursive, tail_chars};
use super::types::{Chunk, ChunkConfig};
use crate::document::ExtractedDocument;

/// Chunk a document using a strategy appropriate for its source type.
pub fn chunk_document(doc: &ExtractedDocument, config: &ChunkConfig) -> Vec<Chunk> {
    let mut chunks = match doc.file_type.as_str() {
        "pdf" => chunk_pdf(doc, config),
        _ => chunk_block(&doc.full_text(), config, Some(1)),
    };
    for (i, c) in chunks.iter_mut().enumerate() {
        c.index = i;
    }
    chunks
}

// ── PDF strategy ────────────────────────────────────────────────────────────

/// Each page is chunked independently -- no overlap across page boundaries.
fn chunk_pdf(doc: &ExtractedDocument, config: &ChunkConfig) -> Vec<Chunk> {
    let mut all_chunks = Vec::new();
    for page in &doc.pages {
        all_chunks.extend(chunk_block(&page.text, config, Some(page.page_number)));
    }
    all_chunks
}

// ── Single text block ───────────────────────────────────────────────────────

/// Split one block of text into overlapping chunks. A block no longer than
/// the maximum yields exactly one chunk equal to the (trimmed) original.
fn chunk_block(text: &str, config: &ChunkConfig, page_number: Option<usize>) -> Vec<Chunk> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if char_len(text) <= config.max_chunk_chars {
        return vec![Chunk {
            index: 0,
            content: text.to_string(),
            page_number,
        }];
    }

    let fragments = split_recursive(text, config.fragment_budget(), &config.separators);

    let mut chunks = Vec::with_capacity(fragments.len());
    for (i, frag) in fragments.iter().enumerate() {
        let content = if i > 0 && config.overlap_chars > 0 {
            let overlap = tail_chars(&fragments[i - 1], config.overlap_chars);
            format!("{overlap}{frag}")
        } else {
            frag.clone()
        };
        chunks.push(Chunk {
            index: 0, // assigned globally by chunk_document
            content,
            page_number,
        });
    }
    chunks
}
