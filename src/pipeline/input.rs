//! Input retrieval: fetch the uploaded PDF from its public URL.
//!
//! The bytes stay in memory. They are base64-encoded straight into the OCR
//! request, so there is no need for a temporary file.

use crate::display::format_file_size;
use crate::error::DocuScanError;
use reqwest::Client;
use tracing::{debug, info, warn};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Download the PDF at `url`.
///
/// Any transport failure or non-2xx status is a [`DocuScanError::Retrieval`].
/// The body is not sniffed for `%PDF` magic: the OCR provider is the judge of
/// what it can read, and a mismatch only produces a warning.
pub async fn fetch_pdf(client: &Client, url: &str) -> Result<Vec<u8>, DocuScanError> {
    if !is_url(url) {
        return Err(DocuScanError::Retrieval {
            url: url.to_string(),
            reason: "not an HTTP/HTTPS URL".into(),
        });
    }

    info!("Downloading PDF from: {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DocuScanError::Retrieval {
            url: url.to_string(),
            reason: if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            },
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DocuScanError::Retrieval {
            url: url.to_string(),
            reason: format!("HTTP {}", status),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| DocuScanError::Retrieval {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        warn!("Downloaded file does not start with %PDF magic: {}", url);
    }
    debug!("Downloaded {}", format_file_size(bytes.len() as u64));

    Ok(bytes.to_vec())
}
