use std::env;
use std::sync::Arc;
use std::time::Duration;

use tripstack::api::{generate_token, start_server, ApiContext, StaticTokenVerifier};
use tripstack::config::{self, Settings};
use tripstack::enrich::Enricher;
use tripstack::extract::CanonicalExtractor;
use tripstack::limits::{FeatureGate, Plan, RateLimiter, StaticEntitlements};
use tripstack::ocr::hosted::OcrSpaceClient;
use tripstack::ocr::TextAcquisition;
use tripstack::providers::{InferenceClient, ProviderGateway};
use tripstack::queue::{ImportQueue, InMemoryDocumentStore};

const RATE_WINDOW: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    tripstack::init_tracing();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = Settings::from_env();
    let client: Arc<dyn InferenceClient> = Arc::new(ProviderGateway::new());
    let hosted = Arc::new(OcrSpaceClient::new(
        reqwest::Client::new(),
        settings.ocrspace_key.clone(),
    ));

    let acquisition = TextAcquisition::new(
        client.clone(),
        hosted.clone(),
        settings.vision_providers(),
    );
    let extractor = CanonicalExtractor::new(
        client.clone(),
        settings.extraction_providers(),
        Some(settings.tertiary_provider()),
    );
    let queue = ImportQueue::new(
        Arc::new(InMemoryDocumentStore::new()),
        TextAcquisition::new(client.clone(), hosted.clone(), settings.vision_providers()),
        CanonicalExtractor::new(
            client.clone(),
            settings.extraction_providers(),
            Some(settings.tertiary_provider()),
        ),
    );

    let ctx = ApiContext {
        extractor: Arc::new(extractor),
        acquisition: Arc::new(acquisition),
        enricher: Arc::new(Enricher::new(
            client.clone(),
            settings.enrichment_providers(),
        )),
        queue: Arc::new(queue),
        gate: Arc::new(FeatureGate::new(Arc::new(StaticEntitlements::new(
            default_plan(),
        )))),
        limiter: Arc::new(RateLimiter::new(RATE_WINDOW)),
        verifier: Arc::new(verifier_from_env()),
    };

    let mut server = match start_server(ctx, settings.bind_addr()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("startup failed: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
    server.shutdown();
}

/// `API_SESSION_TOKENS` holds `token=user` pairs separated by commas.
/// With no usable pairs configured, a single ephemeral token is minted
/// and logged so a fresh checkout can still reach the API.
fn verifier_from_env() -> StaticTokenVerifier {
    let mut verifier = StaticTokenVerifier::new();
    let mut configured = 0usize;
    if let Ok(raw) = env::var("API_SESSION_TOKENS") {
        for pair in raw.split(',') {
            if let Some((token, user)) = pair.split_once('=') {
                let (token, user) = (token.trim(), user.trim());
                if !token.is_empty() && !user.is_empty() {
                    verifier = verifier.with_token(token, user);
                    configured += 1;
                }
            }
        }
    }
    if configured == 0 {
        let token = generate_token();
        tracing::warn!(%token, "API_SESSION_TOKENS not set, minted an ephemeral dev token");
        verifier = verifier.with_token(&token, "dev");
    }
    verifier
}

fn default_plan() -> Plan {
    match env::var("DEFAULT_PLAN").as_deref() {
        Ok("pro") => Plan::Pro,
        Ok("plus") => Plan::Plus,
        _ => Plan::Free,
    }
}
