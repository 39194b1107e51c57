use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub entries_indexed: usize,
    pub embedder_ready: bool,
    pub llm_ready: bool,
    /// Active configuration with credentials stripped.
    pub config: serde_json::Value,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let entries_indexed = state
        .index
        .read()
        .await
        .as_ref()
        .map(|index| index.len())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        entries_indexed,
        embedder_ready: state.embedder.is_some(),
        llm_ready: state.responder.is_some(),
        config: state.config.redacted_summary(),
    })
}
