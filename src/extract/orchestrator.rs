//! The canonical extractor: parallel LLM candidates, a tertiary
//! single-call fallback, and finally the heuristic rule engine.
//!
//! `extract` never fails. The caller always receives a best-effort
//! payload with confidence and missing fields, or a clean out-of-scope
//! record.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use super::canonical::{CanonicalPayload, ReservationType, Scope};
use super::normalize::{normalize_payload, parse_provider_json};
use super::prompt::{build_extraction_prompt, EXTRACTION_SYSTEM_PROMPT};
use super::rules::infer_from_text;
use super::score::{pick_winner, Candidate};
use crate::providers::{
    run_parallel, CallOptions, InferenceClient, ProviderCallResult, ProviderConfig, ProviderId,
    TextRequest,
};

/// Which strategy produced the winning payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// One of the two primary parallel candidates won.
    Llm,
    /// The tertiary single-call fallback won.
    LlmFallback,
    /// Every LLM candidate failed; the rule engine answered.
    Heuristic,
}

/// Per-provider call telemetry surfaced to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMeta {
    pub provider: ProviderId,
    pub ok: bool,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

impl From<&ProviderCallResult> for ProviderMeta {
    fn from(result: &ProviderCallResult) -> Self {
        Self {
            provider: result.provider,
            ok: result.ok,
            elapsed_ms: result.elapsed_ms,
            error: result.error.clone(),
        }
    }
}

/// Result of one extraction attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    pub canonical: CanonicalPayload,
    /// Mirrors `canonical.metadata.type` at the top level of the response.
    #[serde(rename = "type")]
    pub reservation_type: Option<ReservationType>,
    /// Mirrors `canonical.metadata.confidence`.
    pub confidence: u8,
    pub scope: Scope,
    pub missing_fields: Vec<&'static str>,
    pub strategy: ExtractionStrategy,
    /// Which provider's candidate won; `None` on the heuristic path.
    pub provider: Option<ProviderId>,
    pub provider_meta: Vec<ProviderMeta>,
}

/// Turns raw text (+ optional filename hint) into a canonical payload.
pub struct CanonicalExtractor {
    client: Arc<dyn InferenceClient>,
    /// Exactly the first two are used for the parallel stage; their order
    /// is the documented tie-break preference.
    primaries: Vec<ProviderConfig>,
    tertiary: Option<ProviderConfig>,
}

impl CanonicalExtractor {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        primaries: Vec<ProviderConfig>,
        tertiary: Option<ProviderConfig>,
    ) -> Self {
        Self {
            client,
            primaries,
            tertiary,
        }
    }

    pub async fn extract(
        &self,
        raw_text: &str,
        file_name_hint: Option<&str>,
        options: &CallOptions,
    ) -> ExtractionOutcome {
        let span = tracing::info_span!("extract_reservation", text_len = raw_text.len());
        self.extract_inner(raw_text, file_name_hint, options)
            .instrument(span)
            .await
    }

    async fn extract_inner(
        &self,
        raw_text: &str,
        file_name_hint: Option<&str>,
        options: &CallOptions,
    ) -> ExtractionOutcome {
        let request = TextRequest {
            system: Some(EXTRACTION_SYSTEM_PROMPT.to_string()),
            prompt: build_extraction_prompt(raw_text, file_name_hint),
        };

        let primaries: Vec<ProviderConfig> = self.primaries.iter().take(2).cloned().collect();
        let results = run_parallel(
            self.client.as_ref(),
            &request,
            &primaries,
            options,
            &|raw| parse_provider_json(raw),
        )
        .await;

        let mut provider_meta: Vec<ProviderMeta> = results.iter().map(Into::into).collect();
        let candidates = candidates_from(&results);

        if let Some(winner) = pick_winner(candidates) {
            tracing::info!(
                provider = %winner.provider,
                score = winner.score,
                confidence = winner.canonical.metadata.confidence,
                "extraction winner from parallel stage"
            );
            return outcome(winner, ExtractionStrategy::Llm, provider_meta);
        }

        // No usable parallel candidate: one last single-call attempt.
        if let Some(tertiary) = &self.tertiary {
            let results = run_parallel(
                self.client.as_ref(),
                &request,
                std::slice::from_ref(tertiary),
                options,
                &|raw| parse_provider_json(raw),
            )
            .await;
            provider_meta.extend(results.iter().map(ProviderMeta::from));
            if let Some(winner) = pick_winner(candidates_from(&results)) {
                tracing::info!(provider = %winner.provider, "extraction rescued by tertiary provider");
                return outcome(winner, ExtractionStrategy::LlmFallback, provider_meta);
            }
        }

        tracing::warn!("all LLM candidates failed, falling back to heuristic rules");
        let (canonical, scope) = infer_from_text(raw_text, file_name_hint);
        let missing = super::score::missing_fields(&canonical, scope);
        ExtractionOutcome {
            reservation_type: canonical.metadata.reservation_type,
            confidence: canonical.metadata.confidence,
            canonical,
            scope,
            missing_fields: missing,
            strategy: ExtractionStrategy::Heuristic,
            provider: None,
            provider_meta,
        }
    }
}

fn candidates_from(results: &[ProviderCallResult]) -> Vec<Candidate> {
    results
        .iter()
        .filter(|r| r.ok)
        .filter_map(|r| {
            r.parsed
                .as_ref()
                .map(|parsed| Candidate::new(normalize_payload(parsed), r.provider))
        })
        .collect()
}

fn outcome(
    winner: Candidate,
    strategy: ExtractionStrategy,
    provider_meta: Vec<ProviderMeta>,
) -> ExtractionOutcome {
    ExtractionOutcome {
        reservation_type: winner.canonical.metadata.reservation_type,
        confidence: winner.canonical.metadata.confidence,
        scope: winner.scope,
        missing_fields: winner.missing_fields,
        canonical: winner.canonical,
        strategy,
        provider: Some(winner.provider),
        provider_meta,
    }
}
