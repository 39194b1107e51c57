//! Recursive separator chunking engine.
//!
//! Splits extracted documents into overlapping chunks suitable for embedding.
//! The splitter tries each configured separator in order and falls back to a
//! harder split only when a piece still exceeds the size budget; PDF pages
//! are chunked independently so no chunk straddles a page boundary.

mod helpers;
mod strategies;
mod types;

pub use strategies::chunk_document;
pub use types::{Chunk, ChunkConfig};
