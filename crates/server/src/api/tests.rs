use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use helpdesk_core::config::{
    ChunkingConfig, Config, EmbeddingConfig, LlmConfig, OllamaConfig, RetrievalConfig,
    ServerConfig, StorageConfig,
};
use helpdesk_ingest::embedding::{Embedder, EmbeddingError};
use helpdesk_llm::{LlmError, LlmProvider, Message, Responder};

use crate::router::build_router;
use crate::state::AppState;

// ── Fakes ───────────────────────────────────────────────────────────

/// Maps any text mentioning "principal" to one axis and everything else to
/// another, so related texts are close and unrelated ones are ~1.41 apart.
#[derive(Debug)]
struct FakeEmbedder {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                if t.to_lowercase().contains("principal") {
                    vec![1.0, 0.0, 0.0, 0.0]
                } else {
                    vec![0.0, 1.0, 0.0, 0.0]
                }
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        4
    }
}

/// Echoes the system prompt so tests can check the retrieved context made it
/// into the completion request.
struct FakeProvider {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("Based on the records: {}", messages[0].content))
    }
}

/// Embeds like [`FakeEmbedder`] but stalls first, keeping a request
/// in flight long enough for the test to inspect lock availability.
#[derive(Debug)]
struct SlowEmbedder {
    delay: std::time::Duration,
}

#[async_trait]
impl Embedder for SlowEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        tokio::time::sleep(self.delay).await;
        Ok(texts.iter().map(|_| vec![0.0, 1.0, 0.0, 0.0]).collect())
    }

    fn dimensions(&self) -> usize {
        4
    }
}

// ── Harness ─────────────────────────────────────────────────────────

fn test_config(dir: &std::path::Path) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origin: "*".to_string(),
        },
        storage: StorageConfig {
            upload_dir: dir.join("knowledge_base"),
            index_path: dir.join("database").join("vector_index"),
        },
        embedding: EmbeddingConfig {
            provider: "openai".to_string(),
            openai_api_key: Some("sk-test".to_string()),
            openai_base_url: None,
            model: "text-embedding-3-small".to_string(),
            dimensions: 4,
            batch_size: 64,
        },
        llm: LlmConfig {
            provider: "openai".to_string(),
            openai_api_key: Some("sk-test".to_string()),
            openai_base_url: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 512,
        },
        ollama: OllamaConfig {
            url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
        },
        retrieval: RetrievalConfig {
            top_k: 8,
            score_threshold: 1.35,
        },
        chunking: ChunkingConfig {
            max_chars: 800,
            overlap_chars: 200,
        },
    }
}

struct Harness {
    app: Router,
    state: Arc<AppState>,
    embed_calls: Arc<AtomicUsize>,
    llm_calls: Arc<AtomicUsize>,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    harness_with_backends(true)
}

fn harness_with_backends(with_backends: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.storage.upload_dir).unwrap();

    let embed_calls = Arc::new(AtomicUsize::new(0));
    let llm_calls = Arc::new(AtomicUsize::new(0));

    let (embedder, responder) = if with_backends {
        let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder {
            calls: embed_calls.clone(),
        });
        let provider = Box::new(FakeProvider {
            calls: llm_calls.clone(),
        });
        (Some(embedder), Some(Responder::new(provider, 0.0, 512)))
    } else {
        (None, None)
    };

    let state = Arc::new(AppState::new(config, None, embedder, responder));
    Harness {
        app: build_router(state.clone()),
        state,
        embed_calls,
        llm_calls,
        _dir: dir,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn chat_request(query: &str, session_id: Option<&str>) -> Request<Body> {
    let mut body = serde_json::json!({ "query": query });
    if let Some(id) = session_id {
        body["session_id"] = serde_json::json!(id);
    }
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

const BOUNDARY: &str = "helpdesk-test-boundary";

fn upload_request(filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/uploadknowledgebase")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ── Chat flow ───────────────────────────────────────────────────────

#[tokio::test]
async fn chat_without_knowledge_reports_no_documents() {
    let h = harness();
    let (status, json) = send(&h.app, chat_request("Who is the principal?", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["answer"]
        .as_str()
        .unwrap()
        .contains("don't have any college documents"));
    assert_eq!(json["error"], "no_documents");
    // The embedder must not be called when there is nothing to search.
    assert_eq!(h.embed_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn chat_without_backends_reports_connection_trouble() {
    let h = harness_with_backends(false);
    let (status, json) = send(&h.app, chat_request("Who is the principal?", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["answer"].as_str().unwrap().contains("trouble connecting"));
    assert_eq!(json["error"], "missing_credential");
}

#[tokio::test]
async fn blank_query_is_invalid() {
    let h = harness();
    let (status, json) = send(&h.app, chat_request("   ", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["error"], "invalid_query");
}

#[tokio::test]
async fn greeting_with_no_relevant_passages_gets_greeting() {
    let h = harness();
    let (status, _) = send(
        &h.app,
        upload_request("campus.txt", b"Principal: Dr. Jane Doe"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&h.app, chat_request("vanakam", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["answer"].as_str().unwrap().starts_with("Vanakam!"));
    assert_eq!(json["error"], serde_json::Value::Null);
    assert_eq!(h.llm_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unrelated_query_gets_fallback_without_calling_llm() {
    let h = harness();
    send(
        &h.app,
        upload_request("campus.txt", b"Principal: Dr. Jane Doe"),
    )
    .await;

    let (status, json) = send(&h.app, chat_request("mess menu for tomorrow", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["answer"]
        .as_str()
        .unwrap()
        .contains("don't have that specific information"));
    assert_eq!(json["error"], "no_match");
    assert_eq!(h.llm_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upload_then_ask_end_to_end() {
    let h = harness();

    let (status, json) = send(
        &h.app,
        upload_request("campus.txt", b"Principal: Dr. Jane Doe"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "synchronized");
    assert!(json["message"].as_str().unwrap().contains("campus.txt"));

    // The original file is kept in the upload directory.
    let saved = h.state.config.storage.upload_dir.join("campus.txt");
    assert!(saved.exists());

    let (status, json) = send(&h.app, chat_request("Who is the principal?", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["answer"].as_str().unwrap().contains("Jane Doe"));
    assert_eq!(json["error"], serde_json::Value::Null);
    assert_eq!(h.llm_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn repeated_uploads_append_to_the_index() {
    let h = harness();
    send(&h.app, upload_request("a.txt", b"Principal: Dr. Jane Doe")).await;
    send(&h.app, upload_request("a.txt", b"Principal: Dr. Jane Doe")).await;

    let guard = h.state.index.read().await;
    let index = guard.as_ref().unwrap();
    assert_eq!(index.len(), 2);

    // The persisted snapshot matches the in-memory index.
    let reloaded = helpdesk_index::VectorIndex::load(&h.state.config.storage.index_path)
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.len(), 2);
}

#[tokio::test]
async fn in_flight_embed_does_not_hold_the_index_lock() {
    use std::time::Duration;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(&config.storage.upload_dir).unwrap();

    let embedder: Arc<dyn Embedder> = Arc::new(SlowEmbedder {
        delay: Duration::from_millis(500),
    });
    let provider = Box::new(FakeProvider {
        calls: Arc::new(AtomicUsize::new(0)),
    });

    let mut index = helpdesk_index::VectorIndex::new(4);
    index
        .append(vec![helpdesk_index::IndexEntry {
            content: "Principal: Dr. Jane Doe".to_string(),
            source: "campus.txt".to_string(),
            embedding: vec![1.0, 0.0, 0.0, 0.0],
            indexed_at: chrono::Utc::now(),
        }])
        .unwrap();

    let state = Arc::new(AppState::new(
        config,
        Some(index),
        Some(embedder),
        Some(Responder::new(provider, 0.0, 512)),
    ));
    let app = build_router(state.clone());

    let chat = tokio::spawn(async move {
        app.oneshot(chat_request("Who is the principal?", None))
            .await
            .unwrap()
    });

    // Let the chat request reach the embed call, then demand the write
    // lock the way an ingestion would. It must be granted while the embed
    // is still sleeping.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let write = tokio::time::timeout(Duration::from_millis(100), state.index.write()).await;
    assert!(
        write.is_ok(),
        "write lock unavailable while a chat embed is in flight"
    );
    drop(write);

    let response = chat.await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ── Ingestion validation ────────────────────────────────────────────

#[tokio::test]
async fn upload_rejects_unknown_extension() {
    let h = harness();
    let (status, _) = send(&h.app, upload_request("malware.exe", b"payload")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let h = harness();
    let body = format!("--{BOUNDARY}--\r\n");
    let request = Request::builder()
        .method("POST")
        .uri("/uploadknowledgebase")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn train_url_rejects_non_http_input() {
    let h = harness();
    let request = Request::builder()
        .method("POST")
        .uri("/trainurl")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"url": "ftp://college.example/notes"}"#))
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Sessions and health ─────────────────────────────────────────────

#[tokio::test]
async fn session_history_round_trip() {
    let h = harness();
    send(&h.app, chat_request("Who is the principal?", Some("s-1"))).await;

    let request = Request::builder()
        .uri("/sessions/s-1/history")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);
    let history = json.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["query"], "Who is the principal?");

    let request = Request::builder()
        .uri("/sessions/unknown/history")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_index_size() {
    let h = harness();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["entries_indexed"], 0);
    assert_eq!(json["embedder_ready"], true);

    // The config summary is exposed but never the credentials.
    assert_eq!(json["config"]["embedding"]["provider"], "openai");
    assert!(!serde_json::to_string(&json).unwrap().contains("sk-test"));
}
