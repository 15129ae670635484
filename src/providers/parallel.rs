//! Parallel inference coordinator.
//!
//! Fires the same request at N providers concurrently and collects every
//! outcome. Each call is wrapped in its own `tokio::time::timeout`, so a
//! provider that never resolves is abandoned with a synthetic failure and
//! cannot block or cancel its siblings. No call influences another; total
//! latency is bounded by the slowest call, not the sum.

use futures::future::join_all;

use super::types::{
    CallOptions, InferenceClient, ProviderCallResult, ProviderConfig, TextRequest, VisionRequest,
};

/// Converts a provider's raw text into a typed value. A `None` marks the
/// result `ok = false` even when the HTTP call itself succeeded.
pub type ResponseParser = dyn Fn(&str) -> Option<serde_json::Value> + Send + Sync;

/// Run the same text request against every provider concurrently.
///
/// Results come back in the same order as `providers` — callers use that
/// order as the documented tie-break preference, never as a priority.
pub async fn run_parallel(
    client: &dyn InferenceClient,
    request: &TextRequest,
    providers: &[ProviderConfig],
    options: &CallOptions,
    parser: &ResponseParser,
) -> Vec<ProviderCallResult> {
    let calls = providers.iter().map(|config| {
        let provider = config.id;
        async move {
            match tokio::time::timeout(options.timeout, client.complete(config, request, options))
                .await
            {
                Ok(result) => result,
                Err(_) => ProviderCallResult::failure(
                    provider,
                    options.timeout.as_millis() as u64,
                    format!("abandoned after {}ms", options.timeout.as_millis()),
                ),
            }
        }
    });

    let results = join_all(calls).await;
    results
        .into_iter()
        .map(|result| apply_parser(result, parser))
        .collect()
}

/// Vision variant: same concurrency contract, no parser (the raw text is
/// the artifact).
pub async fn run_parallel_vision(
    client: &dyn InferenceClient,
    request: &VisionRequest,
    providers: &[ProviderConfig],
    options: &CallOptions,
) -> Vec<ProviderCallResult> {
    let calls = providers.iter().map(|config| {
        let provider = config.id;
        async move {
            match tokio::time::timeout(
                options.timeout,
                client.complete_vision(config, request, options),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => ProviderCallResult::failure(
                    provider,
                    options.timeout.as_millis() as u64,
                    format!("abandoned after {}ms", options.timeout.as_millis()),
                ),
            }
        }
    });

    join_all(calls).await
}

fn apply_parser(mut result: ProviderCallResult, parser: &ResponseParser) -> ProviderCallResult {
    if !result.ok {
        return result;
    }
    let raw = result.raw_text.as_deref().unwrap_or_default();
    match parser(raw) {
        Some(parsed) => {
            result.parsed = Some(parsed);
            result
        }
        None => {
            tracing::warn!(provider = %result.provider, "provider output failed to parse");
            ProviderCallResult {
                ok: false,
                parsed: None,
                error: Some("output failed to parse".into()),
                ..result
            }
        }
    }
}
