//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Request id → 2. Auth → 3. Rate limiter
//!
//! Middleware uses `Extension<ApiContext>` (injected as the outermost
//! layer). Endpoint handlers use `State<ApiContext>` via `with_state`.

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the API router. Every endpoint requires bearer authentication.
pub fn api_router(ctx: ApiContext) -> Router {
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Request id → Auth → Rate limit → Handler
    //
    // Rate limiting sits inside auth because the window quota depends on
    // the caller's entitlements.
    let protected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/extract-reservation",
            post(endpoints::extract::extract_reservation),
        )
        .route("/ocr-document", post(endpoints::ocr::ocr_document))
        .route("/generate-tips", post(endpoints::enrich::generate_tips))
        .route(
            "/suggest-restaurants",
            post(endpoints::enrich::suggest_restaurants),
        )
        .route("/features", post(endpoints::features::features))
        .route(
            "/import-document",
            post(endpoints::imports::import_document),
        )
        .route("/imports", get(endpoints::imports::list_imports))
        .route(
            "/imports/:id/reprocess",
            post(endpoints::imports::reprocess_import),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::request_id::assign))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx));

    Router::new().nest("/api", protected)
}
