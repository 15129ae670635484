//! Reservation extraction endpoint.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser, RequestId};
use crate::extract::orchestrator::ExtractionOutcome;
use crate::limits::Feature;
use crate::providers::{CallOptions, DEFAULT_CALL_TIMEOUT};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub text: String,
    pub file_name: Option<String>,
}

/// `POST /api/extract-reservation`
pub async fn extract_reservation(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(body): Json<ExtractRequest>,
) -> Result<Json<ExtractionOutcome>, ApiError> {
    if !ctx.gate.is_enabled(&user.user_id, Feature::AiExtraction) {
        return Err(ApiError::forbidden("ai_extraction").with_request_id(request_id));
    }
    if body.text.trim().is_empty() {
        return Err(ApiError::bad_request("text must not be empty").with_request_id(request_id));
    }

    let options = CallOptions::default()
        .with_timeout(ctx.gate.call_timeout(&user.user_id, DEFAULT_CALL_TIMEOUT));
    let outcome = ctx
        .extractor
        .extract(&body.text, body.file_name.as_deref(), &options)
        .await;
    Ok(Json(outcome))
}
