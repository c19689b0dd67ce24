//! PDF encoding: raw bytes → base64 data URL.
//!
//! Multimodal chat APIs accept attachments as data URLs embedded in the JSON
//! request body. The whole PDF goes in one attachment; the model handles the
//! page layout itself.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Media type declared for the attachment.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Base64-encode the PDF with the standard alphabet (with padding).
pub fn encode_pdf(bytes: &[u8]) -> String {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded PDF → {} bytes base64", b64.len());
    b64
}

/// Wrap an already-encoded payload as `data:application/pdf;base64,…`.
pub fn pdf_data_url(b64: &str) -> String {
    format!("data:{};base64,{}", PDF_MEDIA_TYPE, b64)
}
