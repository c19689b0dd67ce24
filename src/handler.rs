//! The conversion request handler.
//!
//! One call to [`ConversionHandler::process`] runs one conversion from start
//! to finish:
//!
//! ```text
//! validate ─▶ mark processing ─▶ fetch ─▶ encode ─▶ OCR ─▶ count pages ─▶ persist ─▶ 200
//!    │              │ (logged on failure)       │                            │ (logged on failure)
//!    ▼              ▼                           ▼                            ▼
//!   400     continues regardless     fatal error ─▶ mark failed ─▶ 500   still 200
//! ```
//!
//! The handler keeps no state between calls. Calls for different records run
//! concurrently without coordination; calls for the same record race, and the
//! record store's last write wins.

use crate::config::ServiceConfig;
use crate::error::DocuScanError;
use crate::pipeline::{encode, input, llm, pages};
use crate::record::RecordUpdate;
use crate::store::RecordStore;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Invocation body: `{ fileUrl, conversionId }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub conversion_id: Option<String>,
}

impl ProcessRequest {
    pub fn new(file_url: impl Into<String>, conversion_id: impl Into<String>) -> Self {
        Self {
            file_url: Some(file_url.into()),
            conversion_id: Some(conversion_id.into()),
        }
    }

    /// Both fields, present and non-empty.
    fn validate(self) -> Result<(String, String), DocuScanError> {
        match (
            self.file_url.filter(|s| !s.trim().is_empty()),
            self.conversion_id.filter(|s| !s.trim().is_empty()),
        ) {
            (Some(url), Some(id)) => Ok((url, id)),
            _ => Err(DocuScanError::Validation(
                "fileUrl and conversionId are required".into(),
            )),
        }
    }
}

/// Response body: `{ success, extractedText?, pageCount?, error? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessResponse {
    pub fn completed(extracted_text: String, page_count: u32) -> Self {
        Self {
            success: true,
            extracted_text: Some(extracted_text),
            page_count: Some(page_count),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            extracted_text: None,
            page_count: None,
            error: Some(error.into()),
        }
    }
}

/// HTTP status + body produced by one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    pub status: StatusCode,
    pub body: ProcessResponse,
}

impl ProcessOutcome {
    /// Request-level rejection; the status follows the error kind.
    fn rejected(err: &DocuScanError) -> Self {
        Self {
            status: err.status_code(),
            body: ProcessResponse::failed(err.to_string()),
        }
    }

    /// Pipeline failure; always a server error.
    fn failed(err: &DocuScanError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ProcessResponse::failed(err.to_string()),
        }
    }
}

/// Result of a successful OCR pass, before it is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub page_count: u32,
}

/// Runs conversions against a record store and an OCR engine.
pub struct ConversionHandler {
    records: Arc<dyn RecordStore>,
    ocr: Arc<dyn llm::OcrEngine>,
    http: reqwest::Client,
}

impl ConversionHandler {
    /// Build a handler with the OCR backend selected by `config`.
    pub fn new(config: &ServiceConfig, records: Arc<dyn RecordStore>) -> Result<Self, DocuScanError> {
        let ocr = llm::engine_from_config(config)?;
        Self::with_engine(config, records, ocr)
    }

    /// Build a handler around an already constructed OCR engine.
    pub fn with_engine(
        config: &ServiceConfig,
        records: Arc<dyn RecordStore>,
        ocr: Arc<dyn llm::OcrEngine>,
    ) -> Result<Self, DocuScanError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.download_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| DocuScanError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { records, ocr, http })
    }

    /// Run one conversion. Never fails: every error becomes a response.
    pub async fn process(&self, request: ProcessRequest) -> ProcessOutcome {
        let (file_url, conversion_id) = match request.validate() {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Rejected conversion request: {}", e);
                return ProcessOutcome::rejected(&e);
            }
        };

        let start = Instant::now();
        info!(conversion_id = %conversion_id, "Starting conversion");

        self.mark_processing(&conversion_id).await;

        match self.extract(&file_url).await {
            Ok(extraction) => {
                self.persist_success(&conversion_id, &extraction).await;
                info!(
                    conversion_id = %conversion_id,
                    pages = extraction.page_count,
                    chars = extraction.text.chars().count(),
                    "Conversion complete in {:?}",
                    start.elapsed()
                );
                ProcessOutcome {
                    status: StatusCode::OK,
                    body: ProcessResponse::completed(extraction.text, extraction.page_count),
                }
            }
            Err(e) => {
                error!(conversion_id = %conversion_id, "OCR processing error: {}", e);
                self.persist_failure(&conversion_id, &e).await;
                ProcessOutcome::failed(&e)
            }
        }
    }

    /// Fetch, encode and transcribe the PDF at `file_url`.
    pub async fn extract(&self, file_url: &str) -> Result<Extraction, DocuScanError> {
        let bytes = input::fetch_pdf(&self.http, file_url).await?;
        let b64 = encode::encode_pdf(&bytes);
        drop(bytes);

        let text = self
            .ocr
            .extract_text(&b64)
            .await?
            .filter(|t| !t.trim().is_empty())
            .ok_or(DocuScanError::NoTextExtracted)?;

        let page_count = pages::count_pages(&text);
        Ok(Extraction { text, page_count })
    }

    async fn mark_processing(&self, conversion_id: &str) {
        if let Err(e) = self
            .records
            .update(conversion_id, RecordUpdate::Processing)
            .await
        {
            warn!(
                conversion_id = %conversion_id,
                "Could not mark conversion as processing, continuing: {}", e
            );
        }
    }

    /// The extracted text is returned to the caller even when this write fails.
    async fn persist_success(&self, conversion_id: &str, extraction: &Extraction) {
        let update = RecordUpdate::Completed {
            extracted_text: extraction.text.clone(),
            page_count: extraction.page_count,
        };
        if let Err(e) = self.records.update(conversion_id, update).await {
            error!(
                conversion_id = %conversion_id,
                "Could not record completed status: {}", e
            );
        }
    }

    /// Best effort: a store failure here is logged and never replaces the
    /// original error in the response.
    async fn persist_failure(&self, conversion_id: &str, cause: &DocuScanError) {
        let update = RecordUpdate::Failed {
            error_message: cause.to_string(),
        };
        if let Err(e) = self.records.update(conversion_id, update).await {
            error!(
                conversion_id = %conversion_id,
                "Could not record failed status: {}", e
            );
        }
    }
}
