//! Shared provider types: identities, call options, and the immutable
//! per-call result record.
//!
//! `InferenceClient` is the seam between the pipeline and the network.
//! The production implementation is `ProviderGateway`; tests inject
//! `MockInferenceClient` with canned responses and artificial latency.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default per-call timeout. Endpoints may extend this for users with
/// the `priority_inference` entitlement.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

// ──────────────────────────────────────────────
// Provider identity
// ──────────────────────────────────────────────

/// A known external inference provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "mistral")]
    Mistral,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Mistral => "mistral",
        }
    }

    /// Which wire shape the provider speaks.
    pub fn shape(&self) -> ApiShape {
        match self {
            Self::OpenAi | Self::Mistral => ApiShape::ChatCompletion,
            Self::Gemini => ApiShape::Generation,
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two request/response shapes the gateway normalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiShape {
    /// OpenAI-compatible `/chat/completions` with a messages array.
    ChatCompletion,
    /// Gemini-style `:generateContent` with content parts.
    Generation,
}

/// Resolved configuration for one provider: model, endpoint, credentials.
///
/// A missing `api_key` is carried as `None` and surfaces as a non-fatal
/// per-call failure, never a construction error.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: ProviderId,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
}

// ──────────────────────────────────────────────
// Requests and options
// ──────────────────────────────────────────────

/// A plain text inference request (system prompt + user prompt).
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system: Option<String>,
    pub prompt: String,
}

/// A vision inference request: image-aware prompt plus a base64 payload.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub image_base64: String,
    pub mime_type: String,
}

/// Per-call tuning knobs.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CALL_TIMEOUT,
            temperature: 0.2,
            max_tokens: 1536,
        }
    }
}

impl CallOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ──────────────────────────────────────────────
// Call result
// ──────────────────────────────────────────────

/// Opaque token accounting reported by a provider, when available.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
}

/// Outcome of one provider invocation. Built once per call, never mutated.
///
/// Failures are encoded here (`ok = false` + `error`) rather than as an
/// `Err` so one provider's failure can never abort sibling calls.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderCallResult {
    pub provider: ProviderId,
    pub ok: bool,
    pub elapsed_ms: u64,
    pub raw_text: Option<String>,
    pub parsed: Option<serde_json::Value>,
    pub usage: Option<Usage>,
    pub error: Option<String>,
}

impl ProviderCallResult {
    pub fn success(
        provider: ProviderId,
        elapsed_ms: u64,
        raw_text: String,
        usage: Option<Usage>,
    ) -> Self {
        Self {
            provider,
            ok: true,
            elapsed_ms,
            raw_text: Some(raw_text),
            parsed: None,
            usage,
            error: None,
        }
    }

    pub fn failure(provider: ProviderId, elapsed_ms: u64, error: impl Into<String>) -> Self {
        Self {
            provider,
            ok: false,
            elapsed_ms,
            raw_text: None,
            parsed: None,
            usage: None,
            error: Some(error.into()),
        }
    }
}

// ──────────────────────────────────────────────
// Client seam
// ──────────────────────────────────────────────

/// Uniform client over heterogeneous inference APIs.
///
/// Both methods always return a `ProviderCallResult` — timeouts, transport
/// errors, and missing credentials all land in the result as `ok = false`.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(
        &self,
        config: &ProviderConfig,
        request: &TextRequest,
        options: &CallOptions,
    ) -> ProviderCallResult;

    async fn complete_vision(
        &self,
        config: &ProviderConfig,
        request: &VisionRequest,
        options: &CallOptions,
    ) -> ProviderCallResult;
}

// ──────────────────────────────────────────────
// MockInferenceClient (testing)
// ──────────────────────────────────────────────

/// Mock inference client: canned per-provider responses with optional
/// artificial latency, for coordinator and pipeline tests.
#[derive(Default)]
pub struct MockInferenceClient {
    responses: HashMap<ProviderId, Result<String, String>>,
    delays: HashMap<ProviderId, Duration>,
}

impl MockInferenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, provider: ProviderId, text: &str) -> Self {
        self.responses.insert(provider, Ok(text.to_string()));
        self
    }

    pub fn with_failure(mut self, provider: ProviderId, error: &str) -> Self {
        self.responses.insert(provider, Err(error.to_string()));
        self
    }

    pub fn with_delay(mut self, provider: ProviderId, delay: Duration) -> Self {
        self.delays.insert(provider, delay);
        self
    }

    async fn respond(&self, provider: ProviderId) -> ProviderCallResult {
        let start = std::time::Instant::now();
        if let Some(delay) = self.delays.get(&provider) {
            tokio::time::sleep(*delay).await;
        }
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match self.responses.get(&provider) {
            Some(Ok(text)) => {
                ProviderCallResult::success(provider, elapsed_ms, text.clone(), None)
            }
            Some(Err(error)) => ProviderCallResult::failure(provider, elapsed_ms, error.clone()),
            None => ProviderCallResult::failure(provider, elapsed_ms, "no canned response"),
        }
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn complete(
        &self,
        config: &ProviderConfig,
        _request: &TextRequest,
        _options: &CallOptions,
    ) -> ProviderCallResult {
        self.respond(config.id).await
    }

    async fn complete_vision(
        &self,
        config: &ProviderConfig,
        _request: &VisionRequest,
        _options: &CallOptions,
    ) -> ProviderCallResult {
        self.respond(config.id).await
    }
}
