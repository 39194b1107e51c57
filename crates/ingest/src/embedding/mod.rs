//! Embedding backends behind a common [`Embedder`] trait.

use std::sync::Arc;

use helpdesk_core::config::{EmbeddingConfig, OllamaConfig};

pub mod ollama;
pub mod openai;
pub mod traits;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{Embedder, EmbeddingError};

/// Build the embedding backend selected by configuration.
pub fn create_embedder(
    config: &EmbeddingConfig,
    ollama: &OllamaConfig,
) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| EmbeddingError::MissingCredential("OPENAI_API_KEY".to_string()))?;
            Ok(Arc::new(OpenAiEmbedder::new(
                api_key,
                config.model.clone(),
                config.openai_base_url.clone(),
                config.dimensions,
            )))
        }
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            ollama.url.clone(),
            ollama.embedding_model.clone(),
            config.dimensions,
        ))),
        other => Err(EmbeddingError::Api(format!(
            "unknown embedding provider '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_config(key: Option<&str>) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "openai".to_string(),
            openai_api_key: key.map(str::to_string),
            openai_base_url: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            batch_size: 64,
        }
    }

    fn ollama_config() -> OllamaConfig {
        OllamaConfig {
            url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
        }
    }

    #[test]
    fn openai_without_key_is_missing_credential() {
        let err = create_embedder(&openai_config(None), &ollama_config()).unwrap_err();
        assert!(matches!(err, EmbeddingError::MissingCredential(_)));
    }

    #[test]
    fn openai_with_key_builds() {
        let embedder = create_embedder(&openai_config(Some("sk-test")), &ollama_config()).unwrap();
        assert_eq!(embedder.dimensions(), 1536);
    }

    #[test]
    fn ollama_provider_needs_no_key() {
        let mut config = openai_config(None);
        config.provider = "ollama".to_string();
        assert!(create_embedder(&config, &ollama_config()).is_ok());
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = openai_config(None);
        config.provider = "tf-idf".to_string();
        assert!(create_embedder(&config, &ollama_config()).is_err());
    }
}
