//! Enrichment endpoints: travel tips and restaurant suggestions.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser, RequestId};
use crate::enrich::EnrichmentOutcome;
use crate::limits::Feature;
use crate::providers::{CallOptions, DEFAULT_CALL_TIMEOUT};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipsRequest {
    pub location: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantsRequest {
    pub city: String,
}

/// `POST /api/generate-tips`
pub async fn generate_tips(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(body): Json<TipsRequest>,
) -> Result<Json<EnrichmentOutcome>, ApiError> {
    let options = check(&ctx, &user, &request_id, &body.location)?;
    ctx.enricher
        .generate_tips(&body.location, &options)
        .await
        .map(Json)
        .map_err(|e| ApiError::upstream(e.to_string()).with_request_id(request_id))
}

/// `POST /api/suggest-restaurants`
pub async fn suggest_restaurants(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(body): Json<RestaurantsRequest>,
) -> Result<Json<EnrichmentOutcome>, ApiError> {
    let options = check(&ctx, &user, &request_id, &body.city)?;
    ctx.enricher
        .suggest_restaurants(&body.city, &options)
        .await
        .map(Json)
        .map_err(|e| ApiError::upstream(e.to_string()).with_request_id(request_id))
}

fn check(
    ctx: &ApiContext,
    user: &AuthedUser,
    request_id: &str,
    place: &str,
) -> Result<CallOptions, ApiError> {
    if !ctx.gate.is_enabled(&user.user_id, Feature::AiEnrichment) {
        return Err(ApiError::forbidden("ai_enrichment").with_request_id(request_id));
    }
    if place.trim().is_empty() {
        return Err(ApiError::bad_request("location must not be empty").with_request_id(request_id));
    }
    Ok(CallOptions::default()
        .with_timeout(ctx.gate.call_timeout(&user.user_id, DEFAULT_CALL_TIMEOUT)))
}
