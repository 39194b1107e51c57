use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::IndexError;

/// One embedded chunk as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub content: String,
    pub source: String,
    pub embedding: Vec<f32>,
    pub indexed_at: DateTime<Utc>,
}

/// A search result, nearest first. Lower distance means more similar.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub content: String,
    pub source: String,
    pub distance: f32,
}

/// Flat append-only vector index.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append entries, returning how many were added. Every embedding must
    /// match the index dimension; nothing is written on mismatch.
    pub fn append(&mut self, entries: Vec<IndexEntry>) -> Result<usize, IndexError> {
        for entry in &entries {
            if entry.embedding.len() != self.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: entry.embedding.len(),
                });
            }
        }
        let added = entries.len();
        self.entries.extend(entries);
        Ok(added)
    }

    /// Return the `k` entries nearest to `query` by L2 distance, nearest
    /// first. Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                content: entry.content.clone(),
                source: entry.source.clone(),
                distance: l2_distance(query, &entry.embedding),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    /// Load the index from `path`. An absent or unreadable file yields
    /// `None` rather than an error: the caller treats it as an empty
    /// knowledge base.
    pub fn load(path: &Path) -> Result<Option<Self>, IndexError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read index file {}: {e}", path.display());
                return Ok(None);
            }
        };
        match rmp_serde::from_slice::<Self>(&bytes) {
            Ok(index) => {
                debug!(
                    "Loaded index from {}: {} entries, dimension {}",
                    path.display(),
                    index.entries.len(),
                    index.dimension
                );
                Ok(Some(index))
            }
            Err(e) => {
                warn!("Index file {} is corrupt, ignoring: {e}", path.display());
                Ok(None)
            }
        }
    }

    /// Persist the index to `path`. Writes to a temporary file in the same
    /// directory and renames it over the target, so a concurrent load never
    /// observes a half-written file.
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = rmp_serde::to_vec(self)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;

        debug!(
            "Saved index to {}: {} entries ({} bytes)",
            path.display(),
            self.entries.len(),
            bytes.len()
        );
        Ok(())
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
