//! Persistent flat vector index with brute-force nearest-neighbor search.
//!
//! The index is a single MessagePack file on disk. Writers load it, append
//! entries and save it back atomically; readers search an in-memory snapshot.

pub mod error;
pub mod store;

pub use error::IndexError;
pub use store::{IndexEntry, SearchHit, VectorIndex};
