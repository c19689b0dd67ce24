//! Request handlers for the HTTP surface.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::{error, warn};

use super::AppState;
use crate::error::DocuScanError;
use crate::export::{export_docx, DOCX_MEDIA_TYPE};
use crate::handler::{ProcessRequest, ProcessResponse};
use crate::orchestrator::{upload_pdf, UploadFile};
use crate::pipeline::encode::PDF_MEDIA_TYPE;
use crate::record::{ConversionStatus, NewConversion};
use crate::store::objects::validate_object_path;
use crate::store::{ObjectStore, RecordStore};

/// Upper bound for `?limit=` on the history listing.
const MAX_LIST_LIMIT: usize = 1000;

/// `{ "error": message }` with the status that fits the error.
pub struct ApiError(DocuScanError);

impl From<DocuScanError> for ApiError {
    fn from(e: DocuScanError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// Health check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /functions/v1/process-pdf`: run one conversion.
///
/// The pipeline runs on its own task so it finishes and persists its outcome
/// even if the caller disconnects.
pub async fn process_pdf(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ProcessRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            let err = DocuScanError::InvalidRequest(e.to_string());
            warn!("{}", err);
            return (err.status_code(), Json(ProcessResponse::failed(err.to_string())))
                .into_response();
        }
    };

    let handler = state.handler.clone();
    match tokio::spawn(async move { handler.process(request).await }).await {
        Ok(outcome) => (outcome.status, Json(outcome.body)).into_response(),
        Err(e) => {
            let err = DocuScanError::Internal(format!("conversion task failed: {e}"));
            error!("{}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ProcessResponse::failed(err.to_string())),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

/// `POST /api/uploads?filename=`: store a raw PDF body.
pub async fn upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Response, ApiError> {
    if body.is_empty() {
        return Err(DocuScanError::Validation("upload body is empty".into()).into());
    }
    let name = query
        .filename
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "document.pdf".to_string());
    let stored = upload_pdf(state.objects.as_ref(), &UploadFile::new(name, body.to_vec())).await?;
    Ok((StatusCode::CREATED, Json(stored)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CreateConversion {
    pub original_filename: String,
    pub original_file_path: String,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// `POST /api/conversions`: create a `pending` record.
pub async fn create_conversion(
    State(state): State<AppState>,
    Json(body): Json<CreateConversion>,
) -> Result<Response, ApiError> {
    if body.original_filename.trim().is_empty() || body.original_file_path.trim().is_empty() {
        return Err(DocuScanError::Validation(
            "original_filename and original_file_path are required".into(),
        )
        .into());
    }
    let record = state
        .records
        .insert(NewConversion {
            original_filename: body.original_filename,
            original_file_path: body.original_file_path,
            file_size: body.file_size,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// `GET /api/conversions`: newest first.
pub async fn list_conversions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.history_limit)
        .clamp(1, MAX_LIST_LIMIT);
    let records = state.records.list_recent(limit).await?;
    Ok(Json(records).into_response())
}

/// `GET /api/conversions/:id`
pub async fn get_conversion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    match state.records.get(&id).await? {
        Some(record) => Ok(Json(record).into_response()),
        None => Err(DocuScanError::RecordNotFound { id }.into()),
    }
}

/// `GET /api/conversions/:id/document`: the `.docx` for a completed record.
pub async fn conversion_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state
        .records
        .get(&id)
        .await?
        .ok_or_else(|| DocuScanError::RecordNotFound { id: id.clone() })?;

    let text = match (&record.status, &record.extracted_text) {
        (ConversionStatus::Completed, Some(text)) => text,
        _ => {
            return Ok(error_body(
                StatusCode::CONFLICT,
                format!("Conversion '{}' has no extracted text ({})", id, record.status),
            ))
        }
    };

    let export = export_docx(text, &record.original_filename)?;
    let disposition = format!("attachment; filename=\"{}\"", export.filename.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MEDIA_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.bytes,
    )
        .into_response())
}

/// `GET /objects/*path`: serve an uploaded object.
pub async fn serve_object(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    if validate_object_path(&path).is_err() {
        return error_body(StatusCode::NOT_FOUND, "File not found");
    }
    match state.objects.get(&path).await {
        Ok(Some(bytes)) => {
            let content_type = if path.to_ascii_lowercase().ends_with(".pdf") {
                PDF_MEDIA_TYPE
            } else {
                "application/octet-stream"
            };
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Ok(None) => error_body(StatusCode::NOT_FOUND, "File not found"),
        Err(e) => ApiError(e).into_response(),
    }
}
