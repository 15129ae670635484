//! Uniform HTTP gateway over heterogeneous inference APIs.
//!
//! Two wire shapes are normalized into the same `ProviderCallResult`:
//! - **ChatCompletion** (OpenAI-compatible): `POST {base}/chat/completions`
//!   with a messages array, bearer auth.
//! - **Generation** (Gemini-style): `POST {base}/models/{model}:generateContent`
//!   with content parts, key in the query string.
//!
//! A call that exceeds its timeout, lacks credentials, or fails transport
//! produces `ok = false` with an explanatory error — never a panic and
//! never an `Err` that could abort sibling calls.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::types::{
    ApiShape, CallOptions, InferenceClient, ProviderCallResult, ProviderConfig, TextRequest,
    Usage, VisionRequest,
};

/// Production gateway backed by a shared `reqwest` client.
pub struct ProviderGateway {
    http: reqwest::Client,
}

impl ProviderGateway {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { http }
    }

    async fn dispatch(
        &self,
        config: &ProviderConfig,
        body: serde_json::Value,
        options: &CallOptions,
    ) -> ProviderCallResult {
        let start = std::time::Instant::now();
        let provider = config.id;

        let Some(api_key) = config.api_key.as_deref() else {
            return ProviderCallResult::failure(
                provider,
                0,
                format!("no API key configured for {provider}"),
            );
        };

        let request = match config.id.shape() {
            ApiShape::ChatCompletion => self
                .http
                .post(format!("{}/chat/completions", config.base_url))
                .bearer_auth(api_key)
                .json(&body),
            ApiShape::Generation => self
                .http
                .post(format!(
                    "{}/models/{}:generateContent",
                    config.base_url, config.model
                ))
                .query(&[("key", api_key)])
                .json(&body),
        };

        let response = match request.timeout(options.timeout).send().await {
            Ok(resp) => resp,
            Err(e) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                let error = if e.is_timeout() {
                    format!("timed out after {}ms", options.timeout.as_millis())
                } else if e.is_connect() {
                    format!("connection failed: {}", config.base_url)
                } else {
                    format!("transport error: {e}")
                };
                return ProviderCallResult::failure(provider, elapsed_ms, error);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return ProviderCallResult::failure(
                provider,
                elapsed_ms,
                format!("HTTP {status}: {snippet}"),
            );
        }

        let payload: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                return ProviderCallResult::failure(
                    provider,
                    elapsed_ms,
                    format!("invalid response body: {e}"),
                );
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match extract_text(config.id.shape(), &payload) {
            Some(text) => {
                let usage = extract_usage(config.id.shape(), &payload);
                tracing::debug!(
                    provider = %provider,
                    elapsed_ms,
                    text_len = text.len(),
                    "provider call complete"
                );
                ProviderCallResult::success(provider, elapsed_ms, text, usage)
            }
            None => ProviderCallResult::failure(
                provider,
                elapsed_ms,
                "response contained no completion text",
            ),
        }
    }
}

impl Default for ProviderGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceClient for ProviderGateway {
    async fn complete(
        &self,
        config: &ProviderConfig,
        request: &TextRequest,
        options: &CallOptions,
    ) -> ProviderCallResult {
        let body = match config.id.shape() {
            ApiShape::ChatCompletion => chat_body(config, request, options),
            ApiShape::Generation => generation_body(request, options),
        };
        self.dispatch(config, body, options).await
    }

    async fn complete_vision(
        &self,
        config: &ProviderConfig,
        request: &VisionRequest,
        options: &CallOptions,
    ) -> ProviderCallResult {
        let body = match config.id.shape() {
            ApiShape::ChatCompletion => chat_vision_body(config, request, options),
            ApiShape::Generation => generation_vision_body(request, options),
        };
        self.dispatch(config, body, options).await
    }
}

// ──────────────────────────────────────────────
// Request bodies
// ──────────────────────────────────────────────

fn chat_body(
    config: &ProviderConfig,
    request: &TextRequest,
    options: &CallOptions,
) -> serde_json::Value {
    let mut messages = Vec::new();
    if let Some(system) = &request.system {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.push(json!({"role": "user", "content": request.prompt}));
    json!({
        "model": config.model,
        "messages": messages,
        "temperature": options.temperature,
        "max_tokens": options.max_tokens,
    })
}

fn chat_vision_body(
    config: &ProviderConfig,
    request: &VisionRequest,
    options: &CallOptions,
) -> serde_json::Value {
    let data_uri = format!("data:{};base64,{}", request.mime_type, request.image_base64);
    json!({
        "model": config.model,
        "messages": [{
            "role": "user",
            "content": [
                {"type": "text", "text": request.prompt},
                {"type": "image_url", "image_url": {"url": data_uri}},
            ],
        }],
        "temperature": options.temperature,
        "max_tokens": options.max_tokens,
    })
}

fn generation_body(request: &TextRequest, options: &CallOptions) -> serde_json::Value {
    let mut body = json!({
        "contents": [{"parts": [{"text": request.prompt}]}],
        "generationConfig": {
            "temperature": options.temperature,
            "maxOutputTokens": options.max_tokens,
        },
    });
    if let Some(system) = &request.system {
        body["system_instruction"] = json!({"parts": [{"text": system}]});
    }
    body
}

fn generation_vision_body(request: &VisionRequest, options: &CallOptions) -> serde_json::Value {
    json!({
        "contents": [{
            "parts": [
                {"text": request.prompt},
                {"inline_data": {"mime_type": request.mime_type, "data": request.image_base64}},
            ],
        }],
        "generationConfig": {
            "temperature": options.temperature,
            "maxOutputTokens": options.max_tokens,
        },
    })
}

// ──────────────────────────────────────────────
// Response normalization
// ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

fn extract_text(shape: ApiShape, payload: &serde_json::Value) -> Option<String> {
    let text = match shape {
        ApiShape::ChatCompletion => payload
            .pointer("/choices/0/message/content")?
            .as_str()?
            .to_string(),
        ApiShape::Generation => payload
            .pointer("/candidates/0/content/parts/0/text")?
            .as_str()?
            .to_string(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn extract_usage(shape: ApiShape, payload: &serde_json::Value) -> Option<Usage> {
    match shape {
        ApiShape::ChatCompletion => {
            let usage: ChatUsage = serde_json::from_value(payload.get("usage")?.clone()).ok()?;
            Some(Usage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            })
        }
        ApiShape::Generation => {
            let meta = payload.get("usageMetadata")?;
            Some(Usage {
                prompt_tokens: meta.get("promptTokenCount").and_then(|v| v.as_u64()),
                completion_tokens: meta.get("candidatesTokenCount").and_then(|v| v.as_u64()),
            })
        }
    }
}
