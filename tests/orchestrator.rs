//! Full client flow: orchestrator → HTTP surface → handler → mock gateway.

mod common;

use common::{spawn_mock, Completion, PDF_BYTES};
use docuscan::display::{PREVIEW_CHARS, TRUNCATION_MARKER};
use docuscan::server::{create_router, AppState};
use docuscan::{
    ConversionHandler, ConversionStatus, ConversionView, InMemoryRecordStore, LocalObjectStore,
    NoticeKind, Orchestrator, RecordStore, RemoteInvoker, UploadFile,
};
use std::sync::Arc;

struct Service {
    base_url: String,
    records: Arc<InMemoryRecordStore>,
    objects: Arc<LocalObjectStore>,
    _dir: tempfile::TempDir,
}

/// Run the docuscan router on a loopback port, OCR pointed at `mock`.
async fn spawn_service(mock: &common::Mock) -> Service {
    let dir = tempfile::tempdir().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let records = Arc::new(InMemoryRecordStore::new());
    let objects = Arc::new(LocalObjectStore::new(dir.path(), base_url.clone()));
    let handler = ConversionHandler::new(&mock.config(), records.clone()).unwrap();
    let state = AppState::new(Arc::new(handler), records.clone(), objects.clone(), 20);

    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    Service {
        base_url,
        records,
        objects,
        _dir: dir,
    }
}

fn orchestrator(service: &Service) -> Orchestrator {
    let invoker = Arc::new(RemoteInvoker::new(
        format!("{}/functions/v1/process-pdf", service.base_url),
        None,
    ));
    Orchestrator::new(service.objects.clone(), service.records.clone(), invoker, 20)
}

#[tokio::test]
async fn test_submit_over_http_completes() {
    let mock = spawn_mock(Completion::Text("REPORT\nBody text.".into())).await;
    let service = spawn_service(&mock).await;
    let mut view = ConversionView::new();

    orchestrator(&service)
        .submit(UploadFile::new("report.pdf", PDF_BYTES.to_vec()), &mut view)
        .await;

    assert_eq!(view.status, Some(ConversionStatus::Completed), "{view:?}");
    assert_eq!(view.extracted_text.as_deref(), Some("REPORT\nBody text."));
    assert!(!view.is_processing);
    assert_eq!(view.notices.last().unwrap().kind, NoticeKind::Success);

    assert_eq!(view.history.len(), 1);
    let record = &view.history[0];
    assert_eq!(record.status, ConversionStatus::Completed);
    assert_eq!(record.page_count, Some(1));
    assert_eq!(record.file_size, Some(PDF_BYTES.len() as u64));

    let export = view.download().unwrap().unwrap();
    assert_eq!(export.filename, "report.docx");
    assert_eq!(&export.bytes[..2], b"PK");
}

#[tokio::test]
async fn test_submit_reports_upstream_failure() {
    let mock = spawn_mock(Completion::Status(429, "rate limited".into())).await;
    let service = spawn_service(&mock).await;
    let mut view = ConversionView::new();

    orchestrator(&service)
        .submit(UploadFile::new("scan.pdf", PDF_BYTES.to_vec()), &mut view)
        .await;

    assert_eq!(view.status, Some(ConversionStatus::Failed));
    let message = view.error_message.clone().unwrap();
    assert!(message.contains("[429]") && message.contains("rate limited"), "{message}");
    assert!(!view.is_processing);
    assert!(view.download().unwrap().is_none());

    let notice = view.notices.last().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.description, message);

    assert_eq!(view.history.len(), 1);
    assert_eq!(view.history[0].status, ConversionStatus::Failed);
    assert_eq!(view.history[0].error_message.as_deref(), Some(message.as_str()));
}

#[tokio::test]
async fn test_long_text_preview_truncated_but_stored_in_full() {
    let long_text = "A line of body text.\n".repeat(200);
    assert!(long_text.chars().count() > PREVIEW_CHARS);

    let mock = spawn_mock(Completion::Text(long_text.clone())).await;
    let service = spawn_service(&mock).await;
    let mut view = ConversionView::new();

    orchestrator(&service)
        .submit(UploadFile::new("long.pdf", PDF_BYTES.to_vec()), &mut view)
        .await;

    let preview = view.preview().unwrap();
    assert!(preview.truncated);
    assert_eq!(preview.text.chars().count(), PREVIEW_CHARS);
    assert!(preview.to_string().ends_with(TRUNCATION_MARKER));

    let id = &view.history[0].id;
    let stored = service.records.get(id).await.unwrap().unwrap();
    assert_eq!(stored.extracted_text.as_deref(), Some(long_text.as_str()));
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let mock = spawn_mock(Completion::Text("text".into())).await;
    let service = spawn_service(&mock).await;
    let orch = orchestrator(&service);
    let mut view = ConversionView::new();

    for name in ["first.pdf", "second.pdf"] {
        orch.submit(UploadFile::new(name, PDF_BYTES.to_vec()), &mut view)
            .await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let names: Vec<_> = view
        .history
        .iter()
        .map(|r| r.original_filename.as_str())
        .collect();
    assert_eq!(names, ["second.pdf", "first.pdf"]);
    assert_eq!(view.filename, "second.pdf");
}
