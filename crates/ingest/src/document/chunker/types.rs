//! Chunk configuration and output types.

// ── Configuration ───────────────────────────────────────────────────────────

/// Configuration for the chunking engine.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum characters per chunk, overlap included (default: 800).
    pub max_chunk_chars: usize,
    /// Characters of overlap carried from the previous chunk (default: 200).
    pub overlap_chars: usize,
    /// Separators tried in order; the empty string forces a character split.
    pub separators: Vec<String>,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 800,
            overlap_chars: 200,
            separators: default_separators(),
        }
    }
}

impl ChunkConfig {
    /// Budget for fresh text per chunk once overlap is accounted for.
    pub(crate) fn fragment_budget(&self) -> usize {
        self.max_chunk_chars.saturating_sub(self.overlap_chars).max(1)
    }
}

/// Paragraph break, line break, sentence end, space, then hard split.
pub fn default_separators() -> Vec<String> {
    vec![
        "\n\n".to_string(),
        "\n".to_string(),
        ".".to_string(),
        " ".to_string(),
        String::new(),
    ]
}

// ── Chunk output ────────────────────────────────────────────────────────────

/// A chunk of text with metadata for attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// 0-based index within the document.
    pub index: usize,
    /// The chunk text content.
    pub content: String,
    /// Page number (from PDF page, or 1 for other sources).
    pub page_number: Option<usize>,
}
