//! Loopback stand-ins for the file host and the AI gateway.
//!
//! One axum server answers both:
//!   GET  /files/doc.pdf          → a tiny PDF (any other name → 404)
//!   POST /v1/chat/completions    → whatever `Completion` is configured
//! Every hit is counted so tests can assert that nothing was called.

#![allow(dead_code)]

pub mod rest;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docuscan::ServiceConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\ntrailer << >>\n%%EOF\n";

/// What the mock gateway answers.
#[derive(Debug, Clone)]
pub enum Completion {
    Text(String),
    Status(u16, String),
    NullContent,
}

pub struct MockState {
    pub completion: Mutex<Completion>,
    pub file_hits: AtomicUsize,
    pub ai_hits: AtomicUsize,
    pub last_request: Mutex<Option<serde_json::Value>>,
    pub last_auth: Mutex<Option<String>>,
}

impl MockState {
    pub fn file_hits(&self) -> usize {
        self.file_hits.load(Ordering::SeqCst)
    }

    pub fn ai_hits(&self) -> usize {
        self.ai_hits.load(Ordering::SeqCst)
    }

    pub fn set_completion(&self, completion: Completion) {
        *self.completion.lock().unwrap() = completion;
    }
}

pub struct Mock {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl Mock {
    pub fn file_url(&self, name: &str) -> String {
        format!("{}/files/{}", self.base_url, name)
    }

    /// Config pointing the gateway client at this mock.
    pub fn config(&self) -> ServiceConfig {
        ServiceConfig::builder()
            .ai_gateway_url(&self.base_url)
            .ai_api_key("test-key")
            .build()
            .unwrap()
    }
}

async fn serve_file(State(state): State<Arc<MockState>>, Path(name): Path<String>) -> Response {
    state.file_hits.fetch_add(1, Ordering::SeqCst);
    if name == "doc.pdf" {
        ([(header::CONTENT_TYPE, "application/pdf")], PDF_BYTES.to_vec()).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn completions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.ai_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_request.lock().unwrap() = Some(body);
    *state.last_auth.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let completion = state.completion.lock().unwrap().clone();
    match completion {
        Completion::Text(text) => Json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": text } }]
        }))
        .into_response(),
        Completion::Status(code, body) => {
            (StatusCode::from_u16(code).unwrap(), body).into_response()
        }
        Completion::NullContent => Json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        }))
        .into_response(),
    }
}

/// Route library logs to the test harness; `RUST_LOG=docuscan=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn spawn_mock(completion: Completion) -> Mock {
    init_tracing();
    let state = Arc::new(MockState {
        completion: Mutex::new(completion),
        file_hits: AtomicUsize::new(0),
        ai_hits: AtomicUsize::new(0),
        last_request: Mutex::new(None),
        last_auth: Mutex::new(None),
    });
    let app = Router::new()
        .route("/files/:name", get(serve_file))
        .route("/v1/chat/completions", post(completions))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Mock {
        base_url: format!("http://{addr}"),
        state,
    }
}
