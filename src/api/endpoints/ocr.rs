//! Document text acquisition endpoint.

use axum::extract::State;
use axum::{Extension, Json};
use base64::Engine;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser, RequestId};
use crate::limits::Feature;
use crate::ocr::{DocumentPayload, OcrError, OcrOutcome};
use crate::providers::{CallOptions, DEFAULT_CALL_TIMEOUT};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrRequest {
    pub file_base64: String,
    pub file_name: String,
    pub mime_type: String,
}

impl OcrRequest {
    pub fn decode(&self) -> Result<DocumentPayload, base64::DecodeError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(&self.file_base64)?;
        Ok(DocumentPayload {
            bytes,
            file_name: self.file_name.clone(),
            mime_type: self.mime_type.clone(),
        })
    }
}

/// `POST /api/ocr-document`
pub async fn ocr_document(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(body): Json<OcrRequest>,
) -> Result<Json<OcrOutcome>, ApiError> {
    if !ctx.gate.is_enabled(&user.user_id, Feature::VisionOcr) {
        return Err(ApiError::forbidden("vision_ocr").with_request_id(request_id));
    }

    let payload = body
        .decode()
        .map_err(|e| ApiError::bad_request(format!("invalid base64: {e}")).with_request_id(request_id.clone()))?;

    let options = CallOptions::default()
        .with_timeout(ctx.gate.call_timeout(&user.user_id, DEFAULT_CALL_TIMEOUT));
    match ctx.acquisition.acquire(&payload, &options).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(OcrError::InvalidPayload(reason)) => {
            Err(ApiError::bad_request(reason).with_request_id(request_id))
        }
        Err(OcrError::Exhausted { warnings }) => Err(ApiError::upstream(
            "all text acquisition stages failed",
        )
        .with_request_id(request_id)
        .with_details(serde_json::json!({ "warnings": warnings }))),
    }
}
