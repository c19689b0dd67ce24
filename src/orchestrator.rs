//! Client-side conversion flow.
//!
//! [`Orchestrator::submit`] drives one user upload end to end and mirrors
//! every step into a [`ConversionView`]:
//!
//! ```text
//! upload ─▶ create record ─▶ (view: processing) ─▶ invoke handler
//!    │            │                                     │
//!    └────────────┴──────── any error ──────────────────┴─▶ view: failed
//!                                                         ▼
//!                               always: is_processing = false, refresh history
//! ```
//!
//! The handler is reached through [`ConversionInvoker`], either in-process
//! ([`ConversionHandler`]) or over HTTP ([`RemoteInvoker`]).

use crate::display::{text_preview, Preview};
use crate::error::DocuScanError;
use crate::export::{export_docx, DocxExport};
use crate::handler::{ConversionHandler, ProcessRequest, ProcessResponse};
use crate::pipeline::encode::PDF_MEDIA_TYPE;
use crate::record::{ConversionRecord, ConversionStatus, NewConversion};
use crate::store::{ObjectStore, RecordStore};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Message used when the handler reports failure without saying why.
pub const DEFAULT_FAILURE: &str = "OCR processing failed";

// ── Invokers ─────────────────────────────────────────────────────────────

/// Something that runs the conversion request handler.
#[async_trait]
pub trait ConversionInvoker: Send + Sync {
    async fn invoke(&self, request: ProcessRequest) -> Result<ProcessResponse, DocuScanError>;
}

#[async_trait]
impl ConversionInvoker for ConversionHandler {
    async fn invoke(&self, request: ProcessRequest) -> Result<ProcessResponse, DocuScanError> {
        Ok(self.process(request).await.body)
    }
}

/// POSTs the request to a deployed handler endpoint.
#[derive(Debug, Clone)]
pub struct RemoteInvoker {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl RemoteInvoker {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key,
        }
    }
}

#[async_trait]
impl ConversionInvoker for RemoteInvoker {
    async fn invoke(&self, request: ProcessRequest) -> Result<ProcessResponse, DocuScanError> {
        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("apikey", key).bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| DocuScanError::ConversionFailed(format!("{DEFAULT_FAILURE}: {e}")))?;

        // Failure responses carry the same JSON shape, so read the body
        // before looking at the status.
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<ProcessResponse>(&body).map_err(|_| DocuScanError::Upstream {
            status: status.as_u16(),
            body,
        })
    }
}

// ── Uploads ──────────────────────────────────────────────────────────────

/// A file picked by the user.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Where an upload landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUpload {
    pub file_path: String,
    pub public_url: String,
}

/// `uploads/<uuid>.<ext>`, keeping the original extension (lower-cased).
pub fn upload_path(filename: &str) -> String {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "pdf".to_string());
    format!("uploads/{}.{}", uuid::Uuid::new_v4(), ext)
}

/// Store `file` under a fresh object path and return its public URL.
pub async fn upload_pdf(
    objects: &dyn ObjectStore,
    file: &UploadFile,
) -> Result<StoredUpload, DocuScanError> {
    let file_path = upload_path(&file.name);
    objects
        .upload(&file_path, file.bytes.clone(), PDF_MEDIA_TYPE)
        .await?;
    Ok(StoredUpload {
        public_url: objects.public_url(&file_path),
        file_path,
    })
}

// ── View state ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub description: String,
}

/// Everything a front end needs to render the current conversion.
#[derive(Debug, Clone, Default)]
pub struct ConversionView {
    /// `None` before the first submission and after [`ConversionView::reset`].
    pub status: Option<ConversionStatus>,
    pub filename: String,
    pub extracted_text: Option<String>,
    pub error_message: Option<String>,
    pub is_processing: bool,
    pub history: Vec<ConversionRecord>,
    pub notices: Vec<Notice>,
}

impl ConversionView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the upload prompt. History and notices are kept.
    pub fn reset(&mut self) {
        self.status = None;
        self.filename.clear();
        self.extracted_text = None;
        self.error_message = None;
    }

    fn completed_text(&self) -> Option<&str> {
        match self.status {
            Some(ConversionStatus::Completed) => self.extracted_text.as_deref(),
            _ => None,
        }
    }

    /// The Word document for the current result, if there is one.
    pub fn download(&self) -> Result<Option<DocxExport>, DocuScanError> {
        match self.completed_text() {
            Some(text) if !self.filename.is_empty() => {
                export_docx(text, &self.filename).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn preview(&self) -> Option<Preview> {
        self.completed_text().map(text_preview)
    }
}

// ── Orchestrator ─────────────────────────────────────────────────────────

pub struct Orchestrator {
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    invoker: Arc<dyn ConversionInvoker>,
    history_limit: usize,
}

impl Orchestrator {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        invoker: Arc<dyn ConversionInvoker>,
        history_limit: usize,
    ) -> Self {
        Self {
            objects,
            records,
            invoker,
            history_limit,
        }
    }

    /// Run one upload through the whole flow. Errors end up in `view`.
    pub async fn submit(&self, file: UploadFile, view: &mut ConversionView) {
        view.is_processing = true;
        view.status = Some(ConversionStatus::Pending);
        view.filename = file.name.clone();
        view.extracted_text = None;
        view.error_message = None;

        let result = self.run(&file, view).await;
        Self::reflect(&file.name, result, view);

        // Cleanup for every outcome: `run` reports all failures through `result`.
        view.is_processing = false;
        self.refresh_history(view).await;
    }

    fn reflect(filename: &str, result: Result<String, DocuScanError>, view: &mut ConversionView) {
        match result {
            Ok(text) => {
                info!(file = %filename, chars = text.chars().count(), "Conversion succeeded");
                view.status = Some(ConversionStatus::Completed);
                view.extracted_text = Some(text);
                view.notices.push(Notice {
                    kind: NoticeKind::Success,
                    title: "Conversion complete!".into(),
                    description: "Your PDF has been processed. Download the Word document below."
                        .into(),
                });
            }
            Err(e) => {
                error!(file = %filename, "Conversion failed: {}", e);
                let message = e.to_string();
                view.status = Some(ConversionStatus::Failed);
                view.error_message = Some(message.clone());
                view.notices.push(Notice {
                    kind: NoticeKind::Error,
                    title: "Conversion failed".into(),
                    description: message,
                });
            }
        }
    }

    async fn run(&self, file: &UploadFile, view: &mut ConversionView) -> Result<String, DocuScanError> {
        let upload = upload_pdf(self.objects.as_ref(), file).await?;

        let record = self
            .records
            .insert(NewConversion {
                original_filename: file.name.clone(),
                original_file_path: upload.file_path.clone(),
                file_size: Some(file.bytes.len() as u64),
            })
            .await?;

        view.status = Some(ConversionStatus::Processing);
        let response = self
            .invoker
            .invoke(ProcessRequest::new(upload.public_url, record.id))
            .await?;

        if response.success {
            Ok(response.extracted_text.unwrap_or_default())
        } else {
            Err(DocuScanError::ConversionFailed(
                response
                    .error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE.to_string()),
            ))
        }
    }

    /// Reload the recent-conversions list. A failure leaves the old list in place.
    pub async fn refresh_history(&self, view: &mut ConversionView) {
        match self.records.list_recent(self.history_limit).await {
            Ok(history) => view.history = history,
            Err(e) => warn!("Failed to load conversions: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryRecordStore, LocalObjectStore};
    use std::sync::Mutex;

    /// Answers every request with a canned response and remembers the requests.
    struct CannedInvoker {
        response: Result<ProcessResponse, String>,
        seen: Mutex<Vec<ProcessRequest>>,
    }

    impl CannedInvoker {
        fn new(response: Result<ProcessResponse, String>) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ConversionInvoker for CannedInvoker {
        async fn invoke(&self, request: ProcessRequest) -> Result<ProcessResponse, DocuScanError> {
            self.seen.lock().unwrap().push(request);
            self.response
                .clone()
                .map_err(DocuScanError::ConversionFailed)
        }
    }

    fn setup(
        invoker: Arc<CannedInvoker>,
    ) -> (tempfile::TempDir, Arc<InMemoryRecordStore>, Orchestrator) {
        let dir = tempfile::tempdir().unwrap();
        let objects = Arc::new(LocalObjectStore::new(dir.path(), "http://127.0.0.1:1"));
        let records = Arc::new(InMemoryRecordStore::new());
        let orch = Orchestrator::new(objects, records.clone(), invoker, 20);
        (dir, records, orch)
    }

    #[test]
    fn upload_path_keeps_extension() {
        let p = upload_path("Report.PDF");
        assert!(p.starts_with("uploads/"));
        assert!(p.ends_with(".pdf"));
        assert_ne!(upload_path("a.pdf"), upload_path("a.pdf"));
        assert!(upload_path("noext").ends_with(".pdf"));
    }

    #[tokio::test]
    async fn success_fills_view_and_history() {
        let invoker = CannedInvoker::new(Ok(ProcessResponse::completed("HELLO".into(), 1)));
        let (dir, _records, orch) = setup(invoker.clone());
        let mut view = ConversionView::new();

        orch.submit(UploadFile::new("doc.pdf", b"%PDF-1.4".to_vec()), &mut view)
            .await;

        assert_eq!(view.status, Some(ConversionStatus::Completed));
        assert_eq!(view.extracted_text.as_deref(), Some("HELLO"));
        assert!(!view.is_processing);
        assert_eq!(view.history.len(), 1);
        assert_eq!(view.history[0].original_filename, "doc.pdf");
        assert_eq!(view.history[0].file_size, Some(8));
        assert_eq!(view.notices.last().map(|n| n.kind), Some(NoticeKind::Success));

        let seen = invoker.seen.lock().unwrap();
        let url = seen[0].file_url.as_deref().unwrap();
        assert!(url.starts_with("http://127.0.0.1:1/objects/uploads/"));
        assert_eq!(seen[0].conversion_id.as_deref(), Some(view.history[0].id.as_str()));
        let stored = &view.history[0].original_file_path;
        assert!(dir.path().join(stored).exists());
    }

    #[tokio::test]
    async fn unsuccessful_response_uses_its_error() {
        let invoker = CannedInvoker::new(Ok(ProcessResponse::failed("AI API call failed [500]: x")));
        let (_dir, _records, orch) = setup(invoker);
        let mut view = ConversionView::new();

        orch.submit(UploadFile::new("doc.pdf", b"%PDF".to_vec()), &mut view)
            .await;

        assert_eq!(view.status, Some(ConversionStatus::Failed));
        assert_eq!(view.error_message.as_deref(), Some("AI API call failed [500]: x"));
        assert!(view.extracted_text.is_none());
        assert!(!view.is_processing);
        assert_eq!(view.history.len(), 1, "history refreshed after failure");
        let notice = view.notices.last().unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.title, "Conversion failed");
    }

    #[tokio::test]
    async fn missing_error_falls_back_to_default() {
        let invoker = CannedInvoker::new(Ok(ProcessResponse {
            success: false,
            extracted_text: None,
            page_count: None,
            error: None,
        }));
        let (_dir, _records, orch) = setup(invoker);
        let mut view = ConversionView::new();
        orch.submit(UploadFile::new("doc.pdf", b"%PDF".to_vec()), &mut view)
            .await;
        assert_eq!(view.error_message.as_deref(), Some(DEFAULT_FAILURE));
    }

    #[tokio::test]
    async fn upload_failure_skips_record_and_invoke() {
        struct BrokenObjects;

        #[async_trait]
        impl ObjectStore for BrokenObjects {
            async fn upload(&self, _: &str, _: Vec<u8>, _: &str) -> Result<(), DocuScanError> {
                Err(DocuScanError::Storage("Upload failed: bucket missing".into()))
            }
            fn public_url(&self, path: &str) -> String {
                path.to_string()
            }
            async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, DocuScanError> {
                Ok(None)
            }
        }

        let invoker = CannedInvoker::new(Ok(ProcessResponse::completed("x".into(), 1)));
        let records = Arc::new(InMemoryRecordStore::new());
        let orch = Orchestrator::new(Arc::new(BrokenObjects), records.clone(), invoker.clone(), 20);
        let mut view = ConversionView::new();

        orch.submit(UploadFile::new("doc.pdf", b"%PDF".to_vec()), &mut view)
            .await;

        assert_eq!(view.status, Some(ConversionStatus::Failed));
        assert!(view.error_message.as_deref().unwrap().contains("bucket missing"));
        assert!(!view.is_processing);
        assert!(invoker.seen.lock().unwrap().is_empty());
        assert!(records.list_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invoke_error_still_clears_processing() {
        let invoker = CannedInvoker::new(Err("connection refused".into()));
        let (_dir, records, orch) = setup(invoker);
        let mut view = ConversionView::new();

        orch.submit(UploadFile::new("doc.pdf", b"%PDF".to_vec()), &mut view)
            .await;

        assert!(!view.is_processing);
        assert_eq!(view.status, Some(ConversionStatus::Failed));
        assert_eq!(view.error_message.as_deref(), Some("connection refused"));
        // The record was inserted before the call, so history still shows it.
        assert_eq!(view.history.len(), 1);
        assert_eq!(records.list_recent(10).await.unwrap()[0].status, ConversionStatus::Pending);
    }

    #[test]
    fn download_and_preview_only_when_completed() {
        let mut view = ConversionView {
            status: Some(ConversionStatus::Failed),
            filename: "scan.pdf".into(),
            extracted_text: Some("TEXT".into()),
            ..Default::default()
        };
        assert!(view.download().unwrap().is_none());
        assert!(view.preview().is_none());

        view.status = Some(ConversionStatus::Completed);
        let export = view.download().unwrap().unwrap();
        assert_eq!(export.filename, "scan.docx");
        assert!(!export.bytes.is_empty());
        assert_eq!(view.preview().unwrap().text, "TEXT");

        view.reset();
        assert!(view.status.is_none());
        assert!(view.filename.is_empty());
        assert!(view.download().unwrap().is_none());
    }
}
