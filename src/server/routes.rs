//! Router configuration.

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderName, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::handlers;
use super::AppState;

/// Largest request body accepted (uploads included).
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// `Access-Control-Allow-Origin: *` plus the headers browser clients send.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            HeaderName::from_static("content-type"),
        ])
}

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Conversion request handler
        .route("/functions/v1/process-pdf", post(handlers::process_pdf))
        .route("/process-pdf", post(handlers::process_pdf))
        // Uploads and records
        .route("/api/uploads", post(handlers::upload))
        .route(
            "/api/conversions",
            get(handlers::list_conversions).post(handlers::create_conversion),
        )
        .route("/api/conversions/:id", get(handlers::get_conversion))
        .route(
            "/api/conversions/:id/document",
            get(handlers::conversion_document),
        )
        .route("/objects/*path", get(handlers::serve_object))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer())
        .with_state(state)
}
