//! The text acquisition chain.
//!
//! Stages run in strict priority order and each failure is demoted to a
//! warning, never an abort: native extraction, then hosted OCR, then
//! parallel vision OCR over the first two vision providers, then a
//! last-resort single call to the remaining provider. Only when every
//! stage has failed does the caller see an error, and it carries the
//! full warning trail.

use std::sync::Arc;

use base64::Engine;
use tracing::Instrument;

use super::hosted::{HostedOcrClient, HOSTED_OCR_MAX_BYTES};
use super::native::{extract_native, passes_density};
use super::quality::quality_metrics;
use super::{DocumentPayload, OcrError, OcrMethod, OcrOutcome};
use crate::extract::prompt::VISION_OCR_PROMPT;
use crate::providers::{
    run_parallel_vision, CallOptions, InferenceClient, ProviderConfig, VisionRequest,
};

/// Minimum trimmed length for hosted OCR output to be trusted.
const HOSTED_MIN_CHARS: usize = 20;

pub struct TextAcquisition {
    inference: Arc<dyn InferenceClient>,
    hosted: Arc<dyn HostedOcrClient>,
    /// First two run in parallel; a third, when present, is the last
    /// resort after the parallel stage fails.
    vision_providers: Vec<ProviderConfig>,
}

impl TextAcquisition {
    pub fn new(
        inference: Arc<dyn InferenceClient>,
        hosted: Arc<dyn HostedOcrClient>,
        vision_providers: Vec<ProviderConfig>,
    ) -> Self {
        Self {
            inference,
            hosted,
            vision_providers,
        }
    }

    pub async fn acquire(
        &self,
        payload: &DocumentPayload,
        options: &CallOptions,
    ) -> Result<OcrOutcome, OcrError> {
        let span = tracing::info_span!(
            "acquire_text",
            file = %payload.file_name,
            mime = %payload.mime_type,
            bytes = payload.bytes.len()
        );
        self.acquire_inner(payload, options).instrument(span).await
    }

    async fn acquire_inner(
        &self,
        payload: &DocumentPayload,
        options: &CallOptions,
    ) -> Result<OcrOutcome, OcrError> {
        if payload.bytes.is_empty() {
            return Err(OcrError::InvalidPayload("empty document".into()));
        }

        let mut warnings: Vec<String> = Vec::new();

        // Stage 1: native text layer
        match extract_native(payload) {
            Some((text, method)) if passes_density(&text) => {
                tracing::info!(method = method.as_str(), "native extraction accepted");
                return Ok(finish(text, method, warnings));
            }
            Some((_, method)) => {
                warnings.push(format!(
                    "{} produced text below density threshold",
                    method.as_str()
                ));
            }
            None => {
                warnings.push("no native text layer".into());
            }
        }

        // Stage 2: hosted OCR, skipped above the size ceiling
        if payload.bytes.len() > HOSTED_OCR_MAX_BYTES {
            warnings.push(format!(
                "hosted OCR skipped: {} bytes exceeds ceiling",
                payload.bytes.len()
            ));
        } else {
            match self.hosted.recognize(payload).await {
                Ok(text) if text.trim().len() >= HOSTED_MIN_CHARS => {
                    tracing::info!(chars = text.len(), "hosted OCR accepted");
                    return Ok(finish(text, OcrMethod::HostedOcr, warnings));
                }
                Ok(_) => warnings.push("hosted OCR output too sparse".into()),
                Err(e) => warnings.push(format!("hosted OCR failed: {e}")),
            }
        }

        // Stage 3: parallel vision OCR
        let request = VisionRequest {
            prompt: VISION_OCR_PROMPT.to_string(),
            image_base64: base64::engine::general_purpose::STANDARD.encode(&payload.bytes),
            mime_type: payload.mime_type.clone(),
        };

        let parallel: Vec<ProviderConfig> =
            self.vision_providers.iter().take(2).cloned().collect();
        if !parallel.is_empty() {
            let results =
                run_parallel_vision(self.inference.as_ref(), &request, &parallel, options).await;
            if let Some(text) = best_vision_text(&results, &mut warnings) {
                tracing::info!("parallel vision OCR accepted");
                return Ok(finish(text, OcrMethod::VisionParallel, warnings));
            }
        } else {
            warnings.push("no vision providers configured".into());
        }

        // Stage 4: last-resort single vision call
        if let Some(fallback) = self.vision_providers.get(2) {
            let results = run_parallel_vision(
                self.inference.as_ref(),
                &request,
                std::slice::from_ref(fallback),
                options,
            )
            .await;
            if let Some(text) = best_vision_text(&results, &mut warnings) {
                tracing::info!(provider = %fallback.id, "fallback vision OCR accepted");
                return Ok(finish(text, OcrMethod::VisionFallback, warnings));
            }
        }

        tracing::warn!(warnings = warnings.len(), "text acquisition exhausted");
        Err(OcrError::Exhausted { warnings })
    }
}

/// Best non-empty vision result by quality score; ties keep the earlier
/// provider. Failures are appended to `warnings`.
fn best_vision_text(
    results: &[crate::providers::ProviderCallResult],
    warnings: &mut Vec<String>,
) -> Option<String> {
    let mut best: Option<(f32, &str)> = None;
    for result in results {
        if !result.ok {
            warnings.push(format!(
                "vision OCR via {} failed: {}",
                result.provider,
                result.error.as_deref().unwrap_or("unknown")
            ));
            continue;
        }
        let text = result.raw_text.as_deref().unwrap_or_default();
        if text.trim().is_empty() {
            warnings.push(format!("vision OCR via {} returned no text", result.provider));
            continue;
        }
        let score = quality_metrics(text).score;
        match best {
            Some((current, _)) if score <= current => {}
            _ => best = Some((score, text)),
        }
    }
    best.map(|(_, text)| text.to_string())
}

fn finish(text: String, method: OcrMethod, warnings: Vec<String>) -> OcrOutcome {
    let quality = quality_metrics(&text);
    OcrOutcome {
        text,
        method,
        warnings,
        quality,
    }
}
