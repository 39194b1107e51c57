use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use helpdesk_core::Config;
use helpdesk_index::VectorIndex;
use helpdesk_ingest::embedding::{create_embedder, Embedder};
use helpdesk_llm::Responder;

use crate::sessions::SessionStore;

/// Shared application state.
///
/// The index lives behind a `tokio::sync::RwLock`: ingestion holds the write
/// lock across append + save, queries only take the read lock. `None` means
/// no knowledge has been ingested yet.
pub struct AppState {
    pub config: Config,
    pub index: RwLock<Option<VectorIndex>>,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub responder: Option<Responder>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(
        config: Config,
        index: Option<VectorIndex>,
        embedder: Option<Arc<dyn Embedder>>,
        responder: Option<Responder>,
    ) -> Self {
        Self {
            config,
            index: RwLock::new(index),
            embedder,
            responder,
            sessions: SessionStore::new(),
        }
    }

    /// Build state from config: load any existing index from disk and set up
    /// the upstream backends. Missing credentials are not fatal; the chat
    /// endpoint degrades to a fixed answer instead.
    pub fn initialize(config: Config) -> anyhow::Result<Self> {
        let index = VectorIndex::load(&config.storage.index_path)?;
        match &index {
            Some(index) => info!(
                "Loaded knowledge index: {} entries, dimension {}",
                index.len(),
                index.dimension()
            ),
            None => info!("No knowledge index yet at {}", config.storage.index_path.display()),
        }

        let embedder = match create_embedder(&config.embedding, &config.ollama) {
            Ok(embedder) => Some(embedder),
            Err(e) => {
                warn!("Embedding backend not available: {e}");
                None
            }
        };

        let responder = match Responder::from_config(&config.llm, &config.ollama) {
            Ok(responder) => {
                info!("LLM responder ready (provider: {})", config.llm.provider);
                Some(responder)
            }
            Err(e) => {
                warn!("LLM responder not available: {e}");
                None
            }
        };

        Ok(Self::new(config, index, embedder, responder))
    }
}
