use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub ollama: OllamaConfig,
    pub retrieval: RetrievalConfig,
    pub chunking: ChunkingConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            storage: StorageConfig::from_env(),
            embedding: EmbeddingConfig::from_env(),
            llm: LlmConfig::from_env(),
            ollama: OllamaConfig::from_env(),
            retrieval: RetrievalConfig::from_env(),
            chunking: ChunkingConfig::from_env(),
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:     {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  storage:    upload_dir={}, index_path={}",
            self.storage.upload_dir.display(),
            self.storage.index_path.display()
        );
        tracing::info!(
            "  embedding:  provider={}, model={}, dims={}",
            self.embedding.provider,
            self.embedding.model,
            self.embedding.dimensions
        );
        tracing::info!(
            "  llm:        provider={}, model={}, temperature={}",
            self.llm.provider,
            self.llm.model,
            self.llm.temperature
        );
        tracing::info!(
            "  retrieval:  top_k={}, score_threshold={}",
            self.retrieval.top_k,
            self.retrieval.score_threshold
        );
        tracing::info!(
            "  chunking:   max_chars={}, overlap={}",
            self.chunking.max_chars,
            self.chunking.overlap_chars
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "server": { "host": self.server.host, "port": self.server.port },
            "storage": {
                "upload_dir": self.storage.upload_dir,
                "index_path": self.storage.index_path,
            },
            "embedding": {
                "provider": self.embedding.provider,
                "model": self.embedding.model,
                "dimensions": self.embedding.dimensions,
                "configured": self.embedding.is_configured(),
            },
            "llm": {
                "provider": self.llm.provider,
                "model": self.llm.model,
                "temperature": self.llm.temperature,
                "configured": self.llm.is_configured(),
            },
            "retrieval": {
                "top_k": self.retrieval.top_k,
                "score_threshold": self.retrieval.score_threshold,
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_u16("PORT", 8000),
            cors_origin: env_or("CORS_ORIGIN", "*"),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory where uploaded originals are retained.
    pub upload_dir: PathBuf,
    /// On-disk location of the serialized vector index.
    pub index_path: PathBuf,
}

impl StorageConfig {
    fn from_env() -> Self {
        Self {
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", "knowledge_base")),
            index_path: PathBuf::from(env_or("INDEX_PATH", "database/vector_index")),
        }
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai" or "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
}

impl EmbeddingConfig {
    fn from_env() -> Self {
        Self {
            provider: env_or("EMBEDDING_PROVIDER", "openai"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_base_url: env_opt("OPENAI_BASE_URL"),
            model: env_or("EMBEDDING_MODEL", "text-embedding-3-small"),
            dimensions: env_usize("EMBEDDING_DIMENSIONS", 1536),
            batch_size: env_usize("EMBEDDING_BATCH_SIZE", 64),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── LLM ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" or "ollama"
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env() -> Self {
        Self {
            provider: env_or("LLM_PROVIDER", "openai"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_base_url: env_opt("OPENAI_BASE_URL"),
            model: env_or("LLM_MODEL", "gpt-4o-mini"),
            temperature: env_f32("LLM_TEMPERATURE", 0.0),
            max_tokens: env_u32("LLM_MAX_TOKENS", 1024),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Ollama (local models) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub embedding_model: String,
}

impl OllamaConfig {
    fn from_env() -> Self {
        Self {
            url: env_or("OLLAMA_URL", "http://localhost:11434"),
            model: env_or("OLLAMA_MODEL", "llama3.2"),
            embedding_model: env_or("OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
        }
    }
}

// ── Retrieval ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of nearest chunks fetched per query.
    pub top_k: usize,
    /// Distance cutoff: hits at or above this score are discarded.
    pub score_threshold: f32,
}

impl RetrievalConfig {
    fn from_env() -> Self {
        Self {
            top_k: env_usize("RETRIEVAL_TOP_K", 8),
            score_threshold: env_f32("RETRIEVAL_SCORE_THRESHOLD", 1.35),
        }
    }
}

// ── Chunking ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl ChunkingConfig {
    fn from_env() -> Self {
        let max_chars = env_usize("CHUNK_CHARS", 800);
        let mut overlap_chars = env_usize("CHUNK_OVERLAP", 200);
        // Overlap must leave room for fresh text in every chunk.
        if overlap_chars >= max_chars {
            overlap_chars = max_chars / 4;
        }
        Self {
            max_chars,
            overlap_chars,
        }
    }
}
