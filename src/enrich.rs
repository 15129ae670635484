//! Enrichment calls — travel tips and restaurant suggestions.
//!
//! Unlike extraction, enrichment is sequential: it is a nice-to-have, so
//! providers are tried one at a time in preference order and the first
//! usable answer wins. Burning parallel quota on it would be wasteful.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use crate::extract::canonical::AiEnrichment;
use crate::extract::normalize::parse_provider_json;
use crate::extract::orchestrator::ProviderMeta;
use crate::extract::prompt::{
    build_restaurants_prompt, build_tips_prompt, ENRICHMENT_SYSTEM_PROMPT,
};
use crate::providers::{CallOptions, InferenceClient, ProviderConfig, ProviderId, TextRequest};

#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    #[error("no provider produced a usable enrichment ({attempts} attempted)")]
    AllFailed { attempts: usize },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentOutcome {
    pub enrichment: AiEnrichment,
    pub provider: ProviderId,
    pub provider_meta: Vec<ProviderMeta>,
}

pub struct Enricher {
    client: Arc<dyn InferenceClient>,
    providers: Vec<ProviderConfig>,
}

impl Enricher {
    pub fn new(client: Arc<dyn InferenceClient>, providers: Vec<ProviderConfig>) -> Self {
        Self { client, providers }
    }

    /// Tips, arrival directions, and attractions for a destination.
    pub async fn generate_tips(
        &self,
        location: &str,
        options: &CallOptions,
    ) -> Result<EnrichmentOutcome, EnrichError> {
        self.first_usable(&build_tips_prompt(location), options)
            .instrument(tracing::info_span!("generate_tips", %location))
            .await
    }

    /// Restaurant suggestions for a city.
    pub async fn suggest_restaurants(
        &self,
        city: &str,
        options: &CallOptions,
    ) -> Result<EnrichmentOutcome, EnrichError> {
        self.first_usable(&build_restaurants_prompt(city), options)
            .instrument(tracing::info_span!("suggest_restaurants", %city))
            .await
    }

    async fn first_usable(
        &self,
        prompt: &str,
        options: &CallOptions,
    ) -> Result<EnrichmentOutcome, EnrichError> {
        let request = TextRequest {
            system: Some(ENRICHMENT_SYSTEM_PROMPT.to_string()),
            prompt: prompt.to_string(),
        };

        let mut provider_meta = Vec::new();
        for config in &self.providers {
            let result = match tokio::time::timeout(
                options.timeout,
                self.client.complete(config, &request, options),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => crate::providers::ProviderCallResult::failure(
                    config.id,
                    options.timeout.as_millis() as u64,
                    format!("abandoned after {}ms", options.timeout.as_millis()),
                ),
            };
            let ok = result.ok;
            let raw = result.raw_text.clone();
            provider_meta.push(ProviderMeta::from(&result));

            if !ok {
                tracing::debug!(provider = %config.id, "enrichment provider failed, trying next");
                continue;
            }
            if let Some(enrichment) = raw
                .as_deref()
                .and_then(parse_provider_json)
                .map(|parsed| enrichment_from(&parsed))
            {
                if !is_empty(&enrichment) {
                    return Ok(EnrichmentOutcome {
                        enrichment,
                        provider: config.id,
                        provider_meta,
                    });
                }
            }
            tracing::debug!(provider = %config.id, "enrichment output unusable, trying next");
        }

        Err(EnrichError::AllFailed {
            attempts: provider_meta.len(),
        })
    }
}

fn enrichment_from(parsed: &serde_json::Value) -> AiEnrichment {
    let field = |name: &str| {
        parsed
            .get(name)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    AiEnrichment {
        travel_tip: field("travelTip"),
        how_to_arrive: field("howToArrive"),
        nearby_attractions: field("nearbyAttractions"),
        nearby_restaurants: field("nearbyRestaurants"),
    }
}

fn is_empty(enrichment: &AiEnrichment) -> bool {
    enrichment.travel_tip.is_none()
        && enrichment.how_to_arrive.is_none()
        && enrichment.nearby_attractions.is_none()
        && enrichment.nearby_restaurants.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockInferenceClient;

    fn config(id: ProviderId) -> ProviderConfig {
        ProviderConfig {
            id,
            model: "m".into(),
            base_url: "http://localhost".into(),
            api_key: Some("k".into()),
        }
    }

    fn enricher(mock: MockInferenceClient) -> Enricher {
        Enricher::new(
            Arc::new(mock),
            vec![config(ProviderId::OpenAi), config(ProviderId::Gemini)],
        )
    }

    const TIPS_JSON: &str = r#"{"travelTip":"Carry coins for the tram","howToArrive":"Metro from the airport, 25 minutes","nearbyAttractions":"Alfama, Belém Tower"}"#;

    #[tokio::test]
    async fn first_provider_answer_wins() {
        let mock = MockInferenceClient::new()
            .with_response(ProviderId::OpenAi, TIPS_JSON)
            .with_response(ProviderId::Gemini, r#"{"travelTip":"other"}"#);
        let outcome = enricher(mock)
            .generate_tips("Lisbon", &CallOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.provider, ProviderId::OpenAi);
        assert_eq!(
            outcome.enrichment.travel_tip.as_deref(),
            Some("Carry coins for the tram")
        );
        // Second provider was never called
        assert_eq!(outcome.provider_meta.len(), 1);
    }

    #[tokio::test]
    async fn failure_falls_through_to_next_provider() {
        let mock = MockInferenceClient::new()
            .with_failure(ProviderId::OpenAi, "HTTP 429")
            .with_response(ProviderId::Gemini, TIPS_JSON);
        let outcome = enricher(mock)
            .generate_tips("Lisbon", &CallOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome.provider, ProviderId::Gemini);
        assert_eq!(outcome.provider_meta.len(), 2);
        assert!(!outcome.provider_meta[0].ok);
    }

    #[tokio::test]
    async fn unparseable_output_counts_as_failure() {
        let mock = MockInferenceClient::new()
            .with_response(ProviderId::OpenAi, "sorry, cannot help")
            .with_response(ProviderId::Gemini, TIPS_JSON);
        let outcome = enricher(mock)
            .generate_tips("Lisbon", &CallOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.provider, ProviderId::Gemini);
    }

    #[tokio::test]
    async fn all_failures_surface_typed_error() {
        let mock = MockInferenceClient::new()
            .with_failure(ProviderId::OpenAi, "down")
            .with_failure(ProviderId::Gemini, "down");
        let err = enricher(mock)
            .generate_tips("Lisbon", &CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EnrichError::AllFailed { attempts: 2 }));
    }

    #[tokio::test]
    async fn restaurants_map_to_their_field() {
        let json = r#"{"nearbyRestaurants":"Oteque; Lasai; Oro"}"#;
        let mock = MockInferenceClient::new().with_response(ProviderId::OpenAi, json);
        let outcome = enricher(mock)
            .suggest_restaurants("Rio de Janeiro", &CallOptions::default())
            .await
            .unwrap();
        assert_eq!(
            outcome.enrichment.nearby_restaurants.as_deref(),
            Some("Oteque; Lasai; Oro")
        );
        assert!(outcome.enrichment.travel_tip.is_none());
    }

    #[tokio::test]
    async fn enrichment_runs_on_a_spawned_task() {
        let mock = MockInferenceClient::new().with_response(ProviderId::OpenAi, TIPS_JSON);
        let enricher = enricher(mock);
        // tokio::spawn demands a Send future, like the HTTP handlers do
        let outcome = tokio::spawn(async move {
            enricher
                .generate_tips("Lisbon", &CallOptions::default())
                .await
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(outcome.provider, ProviderId::OpenAi);
    }

    #[tokio::test]
    async fn empty_json_object_is_not_usable() {
        let mock = MockInferenceClient::new()
            .with_response(ProviderId::OpenAi, "{}")
            .with_response(ProviderId::Gemini, TIPS_JSON);
        let outcome = enricher(mock)
            .generate_tips("Lisbon", &CallOptions::default())
            .await
            .unwrap();
        assert_eq!(outcome.provider, ProviderId::Gemini);
    }
}
