//! Hosted OCR stage: OCR.space behind a trait seam.
//!
//! The hosted service is cheap and fast for small scans but caps payload
//! size, so the orchestrator skips it (with a warning) for anything over
//! the ceiling rather than letting the upstream reject it.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use super::DocumentPayload;

/// Upstream rejects larger payloads on the free tier.
pub const HOSTED_OCR_MAX_BYTES: usize = 1024 * 1024;

const OCR_SPACE_URL: &str = "https://api.ocr.space/parse/image";

#[derive(Debug, thiserror::Error)]
pub enum HostedOcrError {
    #[error("hosted OCR credentials not configured")]
    MissingApiKey,
    #[error("payload of {0} bytes exceeds hosted OCR ceiling")]
    TooLarge(usize),
    #[error("hosted OCR transport error: {0}")]
    Transport(String),
    #[error("hosted OCR rejected the document: {0}")]
    Rejected(String),
    #[error("hosted OCR returned no text")]
    Empty,
}

/// Seam for the hosted OCR service so the orchestrator can be tested
/// without network access.
#[async_trait]
pub trait HostedOcrClient: Send + Sync {
    async fn recognize(&self, payload: &DocumentPayload) -> Result<String, HostedOcrError>;
}

// ──────────────────────────────────────────────
// OCR.space implementation
// ──────────────────────────────────────────────

pub struct OcrSpaceClient {
    http: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    parsed_results: Option<Vec<OcrSpaceResult>>,
    is_errored_on_processing: Option<bool>,
    error_message: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResult {
    parsed_text: Option<String>,
}

impl OcrSpaceClient {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }
}

#[async_trait]
impl HostedOcrClient for OcrSpaceClient {
    async fn recognize(&self, payload: &DocumentPayload) -> Result<String, HostedOcrError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(HostedOcrError::MissingApiKey)?;
        if payload.bytes.len() > HOSTED_OCR_MAX_BYTES {
            return Err(HostedOcrError::TooLarge(payload.bytes.len()));
        }

        let encoded = base64::engine::general_purpose::STANDARD.encode(&payload.bytes);
        let data_uri = format!("data:{};base64,{encoded}", payload.mime_type);

        let response = self
            .http
            .post(OCR_SPACE_URL)
            .header("apikey", api_key)
            .form(&[
                ("base64Image", data_uri.as_str()),
                ("scale", "true"),
                ("OCREngine", "2"),
            ])
            .send()
            .await
            .map_err(|e| HostedOcrError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostedOcrError::Transport(format!("HTTP {status}")));
        }

        let body: OcrSpaceResponse = response
            .json()
            .await
            .map_err(|e| HostedOcrError::Transport(format!("malformed response: {e}")))?;

        if body.is_errored_on_processing == Some(true) {
            let message = body
                .error_message
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unspecified".into());
            return Err(HostedOcrError::Rejected(message));
        }

        let text = body
            .parsed_results
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| r.parsed_text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(HostedOcrError::Empty);
        }
        Ok(text)
    }
}

// ──────────────────────────────────────────────
// MockHostedOcr (testing)
// ──────────────────────────────────────────────

/// Canned hosted OCR for orchestrator tests.
#[derive(Default)]
pub struct MockHostedOcr {
    response: Option<Result<String, String>>,
}

impl MockHostedOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.response = Some(Ok(text.to_string()));
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.response = Some(Err(error.to_string()));
        self
    }
}

#[async_trait]
impl HostedOcrClient for MockHostedOcr {
    async fn recognize(&self, payload: &DocumentPayload) -> Result<String, HostedOcrError> {
        if payload.bytes.len() > HOSTED_OCR_MAX_BYTES {
            return Err(HostedOcrError::TooLarge(payload.bytes.len()));
        }
        match &self.response {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(error)) => Err(HostedOcrError::Rejected(error.clone())),
            None => Err(HostedOcrError::MissingApiKey),
        }
    }
}
