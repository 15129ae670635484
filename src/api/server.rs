//! HTTP server lifecycle.
//!
//! Pattern: bind → spawn background task → return handle with shutdown
//! channel. The handle owns the only way to stop the server; dropping it
//! without calling `shutdown` leaves the task running until the runtime
//! dies.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Shut down the server gracefully. Safe to call twice.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }
}

/// Bind the API server and spawn it in a background task.
pub async fn start_server(ctx: ApiContext, addr: SocketAddr) -> Result<ApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("failed to bind API server on {addr}: {e}"))?;
    let addr = listener
        .local_addr()
        .map_err(|e| format!("failed to read server address: {e}"))?;

    let app = api_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }
        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::api::types::StaticTokenVerifier;
    use crate::enrich::Enricher;
    use crate::extract::CanonicalExtractor;
    use crate::limits::{FeatureGate, Plan, RateLimiter, StaticEntitlements};
    use crate::ocr::hosted::MockHostedOcr;
    use crate::ocr::TextAcquisition;
    use crate::providers::{InferenceClient, MockInferenceClient};
    use crate::queue::{ImportQueue, InMemoryDocumentStore};

    fn test_ctx() -> ApiContext {
        let client: Arc<dyn InferenceClient> = Arc::new(MockInferenceClient::new());
        let queue = ImportQueue::new(
            Arc::new(InMemoryDocumentStore::new()),
            TextAcquisition::new(client.clone(), Arc::new(MockHostedOcr::new()), vec![]),
            CanonicalExtractor::new(client.clone(), vec![], None),
        );
        ApiContext {
            extractor: Arc::new(CanonicalExtractor::new(client.clone(), vec![], None)),
            acquisition: Arc::new(TextAcquisition::new(
                client.clone(),
                Arc::new(MockHostedOcr::new()),
                vec![],
            )),
            enricher: Arc::new(Enricher::new(client, vec![])),
            queue: Arc::new(queue),
            gate: Arc::new(FeatureGate::new(Arc::new(StaticEntitlements::new(
                Plan::Free,
            )))),
            limiter: Arc::new(RateLimiter::new(Duration::from_secs(60))),
            verifier: Arc::new(StaticTokenVerifier::new().with_token("tok", "user-1")),
        }
    }

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let mut server = start_server(test_ctx(), localhost())
            .await
            .expect("server should start");
        assert!(server.addr.port() > 0);

        // Without a token the middleware rejects the call
        let url = format!("http://{}/api/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        server.shutdown();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn authenticated_health_over_http() {
        let mut server = start_server(test_ctx(), localhost())
            .await
            .expect("server should start");

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/api/health", server.addr))
            .header("Authorization", "Bearer tok")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert!(resp.headers().contains_key("X-Request-Id"));

        server.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start_server(test_ctx(), localhost())
            .await
            .expect("server should start");
        server.shutdown();
        server.shutdown();
    }
}
