//! Knowledge ingestion: file upload and URL crawling.

use std::path::Path;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use helpdesk_index::{IndexEntry, IndexError, VectorIndex};
use helpdesk_ingest::document::chunker::{chunk_document, ChunkConfig};
use helpdesk_ingest::document::{
    extract_file, fetch_url, ExtractedDocument, ExtractionError, SUPPORTED_EXTENSIONS,
};
use helpdesk_ingest::embedding::EmbeddingError;

use crate::state::AppState;

#[derive(Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub status: &'static str,
}

#[derive(Deserialize)]
pub struct TrainUrlRequest {
    pub url: String,
}

/// `POST /uploadknowledgebase` — multipart file upload into the knowledge base.
pub async fn upload_knowledge_base(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SyncResponse>, (StatusCode, String)> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("malformed multipart body: {e}"),
        )
    })? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("failed to read upload: {e}"),
                    )
                })?
                .to_vec();
            upload = Some((filename, bytes));
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "missing 'file' field in multipart body".to_string(),
        )
    })?;

    // Strip any path components a client may have sent along.
    let filename = Path::new(&filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let extension = Path::new(&filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("unsupported file type '.{extension}'; expected .pdf, .txt or .docx"),
        ));
    }

    // Keep the original file alongside the index.
    let dest = state.config.storage.upload_dir.join(&filename);
    tokio::fs::write(&dest, &bytes).await.map_err(|e| {
        error!("Failed to persist upload {}: {e}", dest.display());
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to store the uploaded file".to_string(),
        )
    })?;

    let document = extract_file(&bytes, &filename).map_err(extraction_error_response)?;
    let count = ingest_document(&state, document).await?;

    Ok(Json(SyncResponse {
        message: format!(
            "Successfully embedded {count} data points from {filename} into the knowledge base."
        ),
        status: "synchronized",
    }))
}

/// `POST /trainurl` — crawl a web page into the knowledge base.
pub async fn train_url(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TrainUrlRequest>,
) -> Result<Json<SyncResponse>, (StatusCode, String)> {
    let url = request.url.trim().to_string();
    if !url.starts_with("http") {
        return Err((
            StatusCode::BAD_REQUEST,
            "URL must start with http".to_string(),
        ));
    }

    let document = fetch_url(&url).await.map_err(extraction_error_response)?;
    let count = ingest_document(&state, document).await?;

    Ok(Json(SyncResponse {
        message: format!(
            "Successfully crawled and embedded {count} data points from {url} into the knowledge base."
        ),
        status: "synchronized",
    }))
}

/// Shared pipeline: chunk, embed, then append + save under the write lock.
async fn ingest_document(
    state: &AppState,
    document: ExtractedDocument,
) -> Result<usize, (StatusCode, String)> {
    let embedder = state.embedder.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "embedding backend is not configured".to_string(),
        )
    })?;

    let chunk_config = ChunkConfig {
        max_chunk_chars: state.config.chunking.max_chars,
        overlap_chars: state.config.chunking.overlap_chars,
        ..ChunkConfig::default()
    };
    let chunks = chunk_document(&document, &chunk_config);
    if chunks.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "document contains no extractable text".to_string(),
        ));
    }

    let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(state.config.embedding.batch_size.max(1)) {
        let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .map_err(embedding_error_response)?;
        if vectors.len() != texts.len() {
            error!(
                "Embedding backend returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            );
            return Err((
                StatusCode::BAD_GATEWAY,
                "embedding service returned an unexpected response".to_string(),
            ));
        }
        embeddings.extend(vectors);
    }

    let now = Utc::now();
    let entries: Vec<IndexEntry> = chunks
        .iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| IndexEntry {
            content: chunk.content.clone(),
            source: document.source.clone(),
            embedding,
            indexed_at: now,
        })
        .collect();

    // Single writer: append and save inside one critical section so
    // concurrent ingestions cannot overwrite each other's entries.
    let mut guard = state.index.write().await;
    let index = guard.get_or_insert_with(|| VectorIndex::new(embedder.dimensions()));
    let added = index.append(entries).map_err(index_error_response)?;
    index
        .save(&state.config.storage.index_path)
        .map_err(index_error_response)?;
    let total = index.len();
    drop(guard);

    info!(
        "Indexed {added} chunks from {} ({total} entries total)",
        document.source
    );
    Ok(added)
}

pub(super) fn extraction_error_response(err: ExtractionError) -> (StatusCode, String) {
    error!("Extraction failed: {err}");
    match err {
        ExtractionError::UnsupportedFormat(ext) => (
            StatusCode::BAD_REQUEST,
            format!("unsupported file type '.{ext}'; expected .pdf, .txt or .docx"),
        ),
        ExtractionError::Fetch(_) => (
            StatusCode::BAD_GATEWAY,
            "failed to fetch the requested URL".to_string(),
        ),
        ExtractionError::Pdf(_) | ExtractionError::Docx(_) | ExtractionError::Io(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to extract text from the document".to_string(),
        ),
    }
}

pub(super) fn embedding_error_response(err: EmbeddingError) -> (StatusCode, String) {
    error!("Embedding failed: {err}");
    match err {
        EmbeddingError::MissingCredential(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "embedding backend is not configured".to_string(),
        ),
        EmbeddingError::Timeout(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            "embedding service timed out".to_string(),
        ),
        EmbeddingError::Http(_) | EmbeddingError::Api(_) => (
            StatusCode::BAD_GATEWAY,
            "embedding service request failed".to_string(),
        ),
        EmbeddingError::DimensionMismatch { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "embedding service returned vectors of the wrong size".to_string(),
        ),
    }
}

fn index_error_response(err: IndexError) -> (StatusCode, String) {
    error!("Index update failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "failed to update the knowledge index".to_string(),
    )
}
