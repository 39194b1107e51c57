//! Retrieval-augmented chat endpoint and session history.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use helpdesk_llm::{is_greeting, LlmError};

use crate::sessions::Exchange;
use crate::state::AppState;

const MSG_NOT_CONNECTED: &str =
    "I'm sorry, I'm having trouble connecting to my AI services. Please check the API config.";
const MSG_NO_DOCUMENTS: &str = "Hello! I don't have any college documents to study yet. \
     Please upload a PDF in the Admin section so I can help you better.";
const MSG_GREETING: &str = "Vanakam! I am your campus support agent. I can assist you with \
     details from our records. How can I help you today?";
const MSG_NO_MATCH: &str = "I apologize, but I don't have that specific information in the \
     current college documents. Please visit the college office for the latest details.";
const MSG_UPSTREAM: &str =
    "I'm sorry, I ran into a problem while generating an answer. Please try again in a moment.";

#[derive(Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Machine-readable outcome for clients; the `answer` stays human-friendly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatErrorKind {
    InvalidQuery,
    MissingCredential,
    NoDocuments,
    NoMatch,
    UpstreamError,
    UpstreamTimeout,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub error: Option<ChatErrorKind>,
    pub version: &'static str,
}

fn reply(answer: impl Into<String>, error: Option<ChatErrorKind>) -> ChatResponse {
    ChatResponse {
        answer: answer.into(),
        error,
        version: env!("CARGO_PKG_VERSION"),
    }
}

/// `POST /chat` — always HTTP 200; failures are folded into the answer text
/// with `error` set so callers can tell outcomes apart.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let query = request.query.trim().to_string();
    let response = answer_query(&state, &query).await;

    if let Some(session_id) = request.session_id.as_deref() {
        if response.error != Some(ChatErrorKind::InvalidQuery) {
            state.sessions.record(session_id, &query, &response.answer);
        }
    }

    Json(response)
}

async fn answer_query(state: &AppState, query: &str) -> ChatResponse {
    if query.is_empty() {
        return reply(
            "Please ask a question.",
            Some(ChatErrorKind::InvalidQuery),
        );
    }

    let (embedder, responder) = match (&state.embedder, &state.responder) {
        (Some(embedder), Some(responder)) => (embedder, responder),
        _ => return reply(MSG_NOT_CONNECTED, Some(ChatErrorKind::MissingCredential)),
    };

    // The emptiness check and the search take separate short read guards;
    // no lock is held across the embedding round-trip.
    {
        let guard = state.index.read().await;
        match guard.as_ref() {
            Some(index) if !index.is_empty() => {}
            _ => return reply(MSG_NO_DOCUMENTS, Some(ChatErrorKind::NoDocuments)),
        }
    }

    let query_vector = match embedder.embed_batch(&[query]).await {
        Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
        Ok(_) => {
            error!("Embedding backend returned no vector for the query");
            return reply(MSG_UPSTREAM, Some(ChatErrorKind::UpstreamError));
        }
        Err(e) => return upstream_failure(e),
    };

    let context = {
        let guard = state.index.read().await;
        let index = match guard.as_ref() {
            Some(index) if !index.is_empty() => index,
            _ => return reply(MSG_NO_DOCUMENTS, Some(ChatErrorKind::NoDocuments)),
        };

        let hits = match index.search(&query_vector, state.config.retrieval.top_k) {
            Ok(hits) => hits,
            Err(e) => {
                error!("Index search failed: {e}");
                return reply(MSG_UPSTREAM, Some(ChatErrorKind::UpstreamError));
            }
        };

        let threshold = state.config.retrieval.score_threshold;
        let relevant: Vec<String> = hits
            .into_iter()
            .filter(|hit| hit.distance < threshold)
            .map(|hit| hit.content)
            .collect();
        debug!("Query {query:?}: {} passages under threshold", relevant.len());
        relevant.join("\n\n")
    };

    if context.is_empty() {
        if is_greeting(query) {
            return reply(MSG_GREETING, None);
        }
        return reply(MSG_NO_MATCH, Some(ChatErrorKind::NoMatch));
    }

    match responder.answer(query, &context).await {
        Ok(answer) => reply(answer, None),
        Err(LlmError::Timeout(e)) => {
            error!("Completion timed out: {e}");
            reply(MSG_UPSTREAM, Some(ChatErrorKind::UpstreamTimeout))
        }
        Err(e) => {
            error!("Completion failed: {e}");
            reply(MSG_UPSTREAM, Some(ChatErrorKind::UpstreamError))
        }
    }
}

fn upstream_failure(err: helpdesk_ingest::embedding::EmbeddingError) -> ChatResponse {
    use helpdesk_ingest::embedding::EmbeddingError;

    error!("Query embedding failed: {err}");
    match err {
        EmbeddingError::Timeout(_) => reply(MSG_UPSTREAM, Some(ChatErrorKind::UpstreamTimeout)),
        EmbeddingError::MissingCredential(_) => {
            reply(MSG_NOT_CONNECTED, Some(ChatErrorKind::MissingCredential))
        }
        _ => reply(MSG_UPSTREAM, Some(ChatErrorKind::UpstreamError)),
    }
}

/// `GET /sessions/{id}/history`
pub async fn session_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<Exchange>>, (StatusCode, String)> {
    state
        .sessions
        .history(&session_id)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "unknown session".to_string()))
}
