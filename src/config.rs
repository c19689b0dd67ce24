//! Service configuration.
//!
//! Every external-service setting (gateway URL, API key, model, limits) lives
//! in one [`ServiceConfig`], built through [`ServiceConfigBuilder`] and
//! validated once at startup. Handlers receive the finished struct; nothing
//! reads the process environment while a request is in flight.

use crate::error::DocuScanError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default OpenAI-compatible gateway base URL.
pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev";

/// Default vision-capable model used for OCR.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Configuration shared by the conversion handler, stores and HTTP surface.
///
/// # Example
/// ```rust
/// use docuscan::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .ai_api_key("sk-test")
///     .max_tokens(8000)
///     .build()
///     .unwrap();
/// assert_eq!(config.history_limit, 20);
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Base URL of the chat-completion gateway; `/v1/chat/completions` is appended.
    pub ai_gateway_url: String,

    /// Bearer token for the gateway. Required for [`OcrBackend::Gateway`].
    pub ai_api_key: Option<String>,

    /// Model identifier sent with every OCR request. Default: `google/gemini-2.5-flash`.
    pub model: String,

    /// Generation-length ceiling for the OCR completion. Default: 16000.
    ///
    /// The whole document is transcribed in a single completion, so this must
    /// cover every page at once.
    pub max_tokens: usize,

    /// Which OCR client to use. Default: [`OcrBackend::Gateway`].
    pub ocr_backend: OcrBackend,

    /// Number of records returned by the history listing. Default: 20.
    pub history_limit: usize,

    /// Timeout for fetching the uploaded PDF. Default: none (transport default).
    pub download_timeout_secs: Option<u64>,

    /// Timeout for the OCR call. Default: none (transport default).
    pub api_timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ai_gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            ai_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 16_000,
            ocr_backend: OcrBackend::default(),
            history_limit: 20,
            download_timeout_secs: None,
            api_timeout_secs: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("ai_gateway_url", &self.ai_gateway_url)
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("ocr_backend", &self.ocr_backend)
            .field("history_limit", &self.history_limit)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full URL of the chat-completion endpoint.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.ai_gateway_url.trim_end_matches('/')
        )
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn ai_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.config.ai_gateway_url = url.into();
        self
    }

    pub fn ai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.ai_api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.config.ocr_backend = backend;
        self
    }

    pub fn history_limit(mut self, n: usize) -> Self {
        self.config.history_limit = n.clamp(1, 1000);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = Some(secs);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    /// Build the configuration, failing fast on missing credentials.
    pub fn build(self) -> Result<ServiceConfig, DocuScanError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(DocuScanError::Configuration(
                "an OCR model must be configured".into(),
            ));
        }
        if let OcrBackend::Gateway = c.ocr_backend {
            if c.ai_api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
                return Err(DocuScanError::Configuration(
                    "AI gateway API key is not configured".into(),
                ));
            }
            if !(c.ai_gateway_url.starts_with("http://") || c.ai_gateway_url.starts_with("https://"))
            {
                return Err(DocuScanError::Configuration(format!(
                    "AI gateway URL must be http(s), got '{}'",
                    c.ai_gateway_url
                )));
            }
        }
        if let OcrBackend::Provider { name } = &c.ocr_backend {
            if name.trim().is_empty() {
                return Err(DocuScanError::Configuration(
                    "provider backend requires a provider name".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which client performs the OCR completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OcrBackend {
    /// OpenAI-compatible `/v1/chat/completions` over plain HTTP. (default)
    #[default]
    Gateway,
    /// A named `edgequake-llm` provider (`openai`, `gemini`, …). The provider
    /// reads its own API key from the environment.
    Provider { name: String },
}
