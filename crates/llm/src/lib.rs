//! Chat-completion providers and the retrieval-augmented responder.

pub mod provider;
pub mod providers;
pub mod responder;

pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
pub use responder::{is_greeting, Responder};
