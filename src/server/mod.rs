//! HTTP surface.
//!
//! Exposes the conversion request handler at `/functions/v1/process-pdf`
//! together with the upload, record and export endpoints a browser client
//! needs. Every response carries permissive CORS headers.

mod handlers;
mod routes;

pub use routes::{cors_layer, create_router, MAX_BODY_BYTES};

use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::DocuScanError;
use crate::handler::ConversionHandler;
use crate::store::{ObjectStore, RecordStore};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<ConversionHandler>,
    pub records: Arc<dyn RecordStore>,
    pub objects: Arc<dyn ObjectStore>,
    /// Default size of the history listing.
    pub history_limit: usize,
}

impl AppState {
    pub fn new(
        handler: Arc<ConversionHandler>,
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        history_limit: usize,
    ) -> Self {
        Self {
            handler,
            records,
            objects,
            history_limit,
        }
    }
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), DocuScanError> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DocuScanError::Internal(format!("bind {addr}: {e}")))?;
    tracing::info!("Starting server at http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| DocuScanError::Internal(format!("server error: {e}")))
}
