//! Loopback stand-in for a PostgREST table and a storage bucket.
//!
//!   GET/POST/PATCH /rest/v1/conversions       rows kept as JSON objects
//!   POST/GET       /storage/v1/object/:bucket/*path
//! PATCH honours the `id=eq.` and `status=in.(...)` filters. Every request's
//! query string and auth headers are recorded for assertions.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docuscan::RestConnection;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const SERVICE_KEY: &str = "service-key";

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: &'static str,
    pub path: String,
    pub query: HashMap<String, String>,
    pub prefer: Option<String>,
    pub apikey: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct BackendState {
    pub rows: Mutex<Vec<Value>>,
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub seen: Mutex<Vec<Seen>>,
    /// When set, table requests answer with this status and body.
    pub table_error: Mutex<Option<(u16, String)>>,
    /// When set, uploads answer with this status and body.
    pub upload_error: Mutex<Option<(u16, String)>>,
}

impl BackendState {
    pub fn last(&self) -> Seen {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }

    fn record(
        &self,
        method: &'static str,
        path: String,
        query: HashMap<String, String>,
        headers: &HeaderMap,
    ) {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.seen.lock().unwrap().push(Seen {
            method,
            path,
            query,
            prefer: text("prefer"),
            apikey: text("apikey"),
            authorization: text(header::AUTHORIZATION.as_str()),
            content_type: text(header::CONTENT_TYPE.as_str()),
        });
    }

    fn table_error(&self) -> Option<Response> {
        self.table_error
            .lock()
            .unwrap()
            .clone()
            .map(|(code, body)| (StatusCode::from_u16(code).unwrap(), body).into_response())
    }
}

pub struct Backend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl Backend {
    pub fn connection(&self) -> RestConnection {
        RestConnection::new(&self.base_url, SERVICE_KEY).unwrap()
    }
}

fn eq_filter(query: &HashMap<String, String>) -> Option<&str> {
    query.get("id").and_then(|v| v.strip_prefix("eq."))
}

async fn select_rows(
    State(state): State<Arc<BackendState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.record("GET", "/rest/v1/conversions".into(), query.clone(), &headers);
    if let Some(err) = state.table_error() {
        return err;
    }

    let mut rows = state.rows.lock().unwrap().clone();
    if let Some(id) = eq_filter(&query) {
        rows.retain(|r| r["id"] == id);
    }
    if query.get("order").map(String::as_str) == Some("created_at.desc") {
        rows.sort_by(|a, b| b["created_at"].as_str().cmp(&a["created_at"].as_str()));
    }
    if let Some(limit) = query.get("limit").and_then(|l| l.parse::<usize>().ok()) {
        rows.truncate(limit);
    }
    Json(rows).into_response()
}

async fn insert_row(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(mut row): Json<Value>,
) -> Response {
    state.record("POST", "/rest/v1/conversions".into(), HashMap::new(), &headers);
    if let Some(err) = state.table_error() {
        return err;
    }

    let mut rows = state.rows.lock().unwrap();
    let n = rows.len();
    row["id"] = json!(format!("row-{n}"));
    row["created_at"] = json!(format!("2026-01-01T00:{n:02}:00Z"));
    rows.push(row.clone());
    (StatusCode::CREATED, Json(vec![row])).into_response()
}

async fn patch_rows(
    State(state): State<Arc<BackendState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    state.record("PATCH", "/rest/v1/conversions".into(), query.clone(), &headers);
    if let Some(err) = state.table_error() {
        return err;
    }

    let id = eq_filter(&query).unwrap_or_default();
    let allowed: Vec<&str> = query
        .get("status")
        .and_then(|v| v.strip_prefix("in.("))
        .and_then(|v| v.strip_suffix(')'))
        .map(|v| v.split(',').collect())
        .unwrap_or_default();

    let mut updated = Vec::new();
    for row in state.rows.lock().unwrap().iter_mut() {
        if row["id"] != id || !allowed.iter().any(|s| row["status"] == *s) {
            continue;
        }
        if let (Some(fields), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
            for (k, v) in changes {
                fields.insert(k.clone(), v.clone());
            }
        }
        updated.push(row.clone());
    }
    Json(updated).into_response()
}

async fn upload_object(
    State(state): State<Arc<BackendState>>,
    Path((bucket, path)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let key = format!("{bucket}/{path}");
    state.record("POST", key.clone(), HashMap::new(), &headers);
    if let Some((code, msg)) = state.upload_error.lock().unwrap().clone() {
        return (StatusCode::from_u16(code).unwrap(), msg).into_response();
    }
    state.objects.lock().unwrap().insert(key.clone(), body.to_vec());
    Json(json!({ "Key": key })).into_response()
}

async fn download_object(
    State(state): State<Arc<BackendState>>,
    Path((bucket, path)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let key = format!("{bucket}/{path}");
    state.record("GET", key.clone(), HashMap::new(), &headers);
    let stored = state.objects.lock().unwrap().get(&key).cloned();
    match stored {
        Some(bytes) => bytes.into_response(),
        None => (StatusCode::NOT_FOUND, "Object not found").into_response(),
    }
}

pub async fn spawn_backend() -> Backend {
    super::init_tracing();
    let state = Arc::new(BackendState::default());
    let app = Router::new()
        .route(
            "/rest/v1/conversions",
            get(select_rows).post(insert_row).patch(patch_rows),
        )
        .route(
            "/storage/v1/object/:bucket/*path",
            post(upload_object).get(download_object),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Backend {
        base_url: format!("http://{addr}"),
        state,
    }
}
