//! Error types for the docuscan library.
//!
//! A single enum covers every failure the service can report. The variants
//! fall into three groups:
//!
//! * **Request errors**: the caller sent something unusable
//!   ([`DocuScanError::Validation`], [`DocuScanError::InvalidRequest`]).
//!   Nothing is written anywhere.
//!
//! * **Pipeline errors**: the conversion started but could not finish
//!   (retrieval, upstream OCR, empty extraction, persistence). The handler
//!   records these on the conversion as `failed` and returns them to the
//!   caller as `{ success: false, error }`.
//!
//! * **Operator errors**: the service itself is misconfigured
//!   ([`DocuScanError::Configuration`]). These surface at startup.

use crate::record::ConversionStatus;
use axum::http::StatusCode;
use thiserror::Error;

/// All errors returned by the docuscan library.
#[derive(Debug, Error)]
pub enum DocuScanError {
    // ── Request errors ────────────────────────────────────────────────────
    /// A required invocation field was absent or empty.
    #[error("{0}")]
    Validation(String),

    /// The request body could not be parsed.
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// The uploaded PDF could not be fetched from its retrieval URL.
    #[error("Failed to download PDF: {reason}")]
    Retrieval { url: String, reason: String },

    /// The OCR provider rejected the call.
    #[error("AI API call failed [{status}]: {body}")]
    Upstream { status: u16, body: String },

    /// The OCR call succeeded but produced no usable text.
    #[error("No text could be extracted from the PDF")]
    NoTextExtracted,

    /// The conversion endpoint answered `{ success: false }`.
    #[error("{0}")]
    ConversionFailed(String),

    /// A record store read or write failed.
    #[error("Record store error: {0}")]
    Persistence(String),

    /// No conversion record exists with this identifier.
    #[error("Conversion '{id}' not found")]
    RecordNotFound { id: String },

    /// The write would move a record backwards through its lifecycle.
    #[error("Conversion '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: ConversionStatus,
        to: ConversionStatus,
    },

    /// The object store rejected an upload or read.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The Word document could not be written.
    #[error("Document export failed: {0}")]
    Export(String),

    // ── Operator errors ───────────────────────────────────────────────────
    /// A required credential or setting is missing.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocuScanError {
    /// HTTP status used when this error is returned to a caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::RecordNotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
