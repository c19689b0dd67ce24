//! Shared HTTP plumbing for the REST record and object stores.

use crate::error::DocuScanError;
use reqwest::{Client, RequestBuilder, Response};
use std::fmt;

/// Base URL + service key for a hosted backend.
///
/// Every request carries the key twice, as `apikey` and as a bearer token,
/// which is what PostgREST gateways and storage APIs both expect.
#[derive(Clone)]
pub struct RestConnection {
    client: Client,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for RestConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestConnection")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl RestConnection {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, DocuScanError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let api_key = api_key.into();
        if base_url.is_empty() || api_key.trim().is_empty() {
            return Err(DocuScanError::Configuration(
                "REST backend requires a base URL and a service key".into(),
            ));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// Turn a non-2xx response into a readable message.
pub(crate) async fn error_text(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}
