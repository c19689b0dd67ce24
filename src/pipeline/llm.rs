//! OCR call: send the encoded PDF to a vision model and read back the text.
//!
//! Two clients implement [`OcrEngine`]:
//!
//! * [`GatewayOcr`]: a plain OpenAI-compatible `/v1/chat/completions` POST.
//!   Non-2xx responses keep their status code and body so the caller sees
//!   exactly what the provider said.
//! * [`ProviderOcr`]: the same prompt and attachment through an
//!   `edgequake-llm` provider, for deployments that already configure one.
//!
//! Neither retries. A failed conversion is resubmitted by the user as a new
//! record.

use crate::config::{OcrBackend, ServiceConfig};
use crate::error::DocuScanError;
use crate::pipeline::encode::{pdf_data_url, PDF_MEDIA_TYPE};
use crate::prompts::OCR_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// A client able to transcribe a base64-encoded PDF.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Return the raw completion text, or `None` when the provider answered
    /// without any content.
    async fn extract_text(&self, pdf_base64: &str) -> Result<Option<String>, DocuScanError>;
}

/// Build the OCR client selected by `config.ocr_backend`.
pub fn engine_from_config(config: &ServiceConfig) -> Result<Arc<dyn OcrEngine>, DocuScanError> {
    match &config.ocr_backend {
        OcrBackend::Gateway => Ok(Arc::new(GatewayOcr::new(config)?)),
        OcrBackend::Provider { name } => Ok(Arc::new(ProviderOcr::from_name(
            name,
            &config.model,
            config.max_tokens,
        )?)),
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<RequestMessage<'a>>,
    pub max_tokens: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct RequestMessage<'a> {
    pub role: &'static str,
    pub content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// `choices[0].message.content`, if present.
    pub fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
    }
}

/// Build the one-message request: instruction text + PDF attachment.
pub(crate) fn build_request<'a>(
    model: &'a str,
    max_tokens: usize,
    pdf_base64: &str,
) -> ChatCompletionRequest<'a> {
    ChatCompletionRequest {
        model,
        messages: vec![RequestMessage {
            role: "user",
            content: vec![
                ContentPart::Text { text: OCR_PROMPT },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: pdf_data_url(pdf_base64),
                    },
                },
            ],
        }],
        max_tokens,
    }
}

// ── Gateway client ───────────────────────────────────────────────────────

/// OpenAI-compatible chat-completion client.
pub struct GatewayOcr {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: usize,
}

impl GatewayOcr {
    pub fn new(config: &ServiceConfig) -> Result<Self, DocuScanError> {
        let api_key = config
            .ai_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                DocuScanError::Configuration("AI gateway API key is not configured".into())
            })?;

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| DocuScanError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.completions_url(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl OcrEngine for GatewayOcr {
    async fn extract_text(&self, pdf_base64: &str) -> Result<Option<String>, DocuScanError> {
        let start = Instant::now();
        let request = build_request(&self.model, self.max_tokens, pdf_base64);
        info!("Calling OCR model {} at {}", self.model, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DocuScanError::Upstream {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocuScanError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse =
            response.json().await.map_err(|e| DocuScanError::Upstream {
                status: status.as_u16(),
                body: format!("unreadable completion: {e}"),
            })?;

        debug!("OCR call finished in {:?}", start.elapsed());
        Ok(completion.first_content())
    }
}

// ── edgequake-llm provider ───────────────────────────────────────────────

/// OCR through any vision-capable `edgequake-llm` provider.
pub struct ProviderOcr {
    provider: Arc<dyn LLMProvider>,
    max_tokens: usize,
}

impl ProviderOcr {
    pub fn new(provider: Arc<dyn LLMProvider>, max_tokens: usize) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }

    /// Instantiate a named provider; its API key comes from the environment.
    pub fn from_name(name: &str, model: &str, max_tokens: usize) -> Result<Self, DocuScanError> {
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            DocuScanError::Configuration(format!("LLM provider '{name}' is not configured: {e}"))
        })?;
        Ok(Self::new(provider, max_tokens))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(0.0),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl OcrEngine for ProviderOcr {
    async fn extract_text(&self, pdf_base64: &str) -> Result<Option<String>, DocuScanError> {
        let attachment = ImageData::new(pdf_base64.to_string(), PDF_MEDIA_TYPE);
        let messages = vec![ChatMessage::user_with_images(OCR_PROMPT, vec![attachment])];

        let response = self
            .provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| DocuScanError::Upstream {
                status: 0,
                body: e.to_string(),
            })?;

        debug!(
            "OCR provider: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(Some(response.content).filter(|c| !c.is_empty()))
    }
}
