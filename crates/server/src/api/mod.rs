//! HTTP handlers.

mod chat;
mod health;
mod ingestion;

pub use chat::{chat, session_history};
pub use health::health;
pub use ingestion::{train_url, upload_knowledge_base};

#[cfg(test)]
mod tests;
