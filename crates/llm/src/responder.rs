//! Prompt assembly for retrieval-augmented answers.

use helpdesk_core::config::{LlmConfig, OllamaConfig};
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message, Role};
use crate::providers::create_provider;

const CONTEXT_PLACEHOLDER: &str = "{context}";

const SYSTEM_TEMPLATE: &str = "You are a campus helpdesk support agent. \
Your primary role is to answer student questions based EXCLUSIVELY on the provided documents.

AGENT PROTOCOLS:
- REFERENCE DATA ONLY: Strictly use the provided context to answer.
- DO NOT HALLUCINATE: If you don't find the answer in the context, say: \"I apologize, but I don't have information about that in my current records. Please reach out to the college office.\"
- BE CONCISE: Provide direct, crisp, and well-formatted answers with bullet points where appropriate.
- SOCIAL CHAT: Respond warmly to greetings (like 'Vanakam') then prompt for a college-related question.

Context: {context}";

const GREETING_TOKENS: &[&str] = &["hi", "hello", "hey", "vanakam", "namaste"];

/// Case-insensitive check for a social greeting anywhere in the query.
pub fn is_greeting(query: &str) -> bool {
    let lower = query.to_lowercase();
    GREETING_TOKENS.iter().any(|g| lower.contains(g))
}

/// Turns a query plus retrieved context into a model answer.
pub struct Responder {
    provider: Box<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl Responder {
    pub fn new(provider: Box<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(
        llm_config: &LlmConfig,
        ollama_config: &OllamaConfig,
    ) -> Result<Self, LlmError> {
        let provider = create_provider(llm_config, ollama_config)?;
        Ok(Self::new(
            provider,
            llm_config.temperature,
            llm_config.max_tokens,
        ))
    }

    /// Answer `query` grounded on `context` (retrieved chunk texts joined by
    /// blank lines). The model's text is returned verbatim.
    pub async fn answer(&self, query: &str, context: &str) -> Result<String, LlmError> {
        let system = SYSTEM_TEMPLATE.replace(CONTEXT_PLACEHOLDER, context);
        debug!(
            "Sending completion: {} context chars, query {:?}",
            context.len(),
            query
        );

        let messages = vec![
            Message {
                role: Role::System,
                content: system,
            },
            Message {
                role: Role::User,
                content: query.to_string(),
            },
        ];

        self.provider
            .complete(messages, self.temperature, self.max_tokens)
            .await
    }
}
