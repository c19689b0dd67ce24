//! # docuscan
//!
//! Turn uploaded PDFs into editable Word documents with a multimodal OCR model.
//!
//! ## Flow
//!
//! ```text
//! client                      service
//!  │
//!  ├─ 1. Upload    PDF → object store (uploads/<uuid>.pdf)
//!  ├─ 2. Record    conversion row, status = pending
//!  ├─ 3. Invoke    POST /functions/v1/process-pdf { fileUrl, conversionId }
//!  │                 ├─ mark processing
//!  │                 ├─ fetch → base64 → chat-completion OCR
//!  │                 ├─ count pages ("--- Page Break ---" + 1)
//!  │                 └─ persist completed / failed
//!  ├─ 4. Reflect   success → text preview + .docx download
//!  └─ 5. Refresh   recent-conversions list
//! ```
//!
//! Step 3 is [`ConversionHandler::process`]; steps 1 to 5 together are
//! [`Orchestrator::submit`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docuscan::{ConversionHandler, InMemoryRecordStore, ProcessRequest, ServiceConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder().ai_api_key("sk-...").build()?;
//!     let records = Arc::new(InMemoryRecordStore::new());
//!     let handler = ConversionHandler::new(&config, records)?;
//!
//!     let outcome = handler
//!         .process(ProcessRequest::new("https://files.example/scan.pdf", "conversion-id"))
//!         .await;
//!     println!("{} {:?}", outcome.status, outcome.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docuscan` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod handler;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod record;
pub mod server;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrBackend, ServiceConfig, ServiceConfigBuilder};
pub use error::DocuScanError;
pub use export::{docx_filename, export_docx, Block, DocxDocument, DocxExport};
pub use handler::{ConversionHandler, Extraction, ProcessOutcome, ProcessRequest, ProcessResponse};
pub use orchestrator::{
    ConversionInvoker, ConversionView, Notice, NoticeKind, Orchestrator, RemoteInvoker,
    StoredUpload, UploadFile,
};
pub use pipeline::llm::{GatewayOcr, OcrEngine, ProviderOcr};
pub use record::{ConversionRecord, ConversionStatus, NewConversion, RecordUpdate};
pub use store::{
    InMemoryRecordStore, LocalObjectStore, ObjectStore, RecordStore, RestConnection,
    RestObjectStore, RestRecordStore,
};
