//! Import queue endpoints: full-pipeline document processing.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use crate::api::endpoints::ocr::OcrRequest;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser, RequestId};
use crate::limits::Feature;
use crate::providers::{CallOptions, DEFAULT_CALL_TIMEOUT};
use crate::queue::{ImportError, ImportRecord};

/// `POST /api/import-document`
pub async fn import_document(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Json(body): Json<OcrRequest>,
) -> Result<Json<ImportRecord>, ApiError> {
    if !ctx.gate.is_enabled(&user.user_id, Feature::AiExtraction) {
        return Err(ApiError::forbidden("ai_extraction").with_request_id(request_id));
    }
    let payload = body.decode().map_err(|e| {
        ApiError::bad_request(format!("invalid base64: {e}")).with_request_id(request_id.clone())
    })?;

    let options = CallOptions::default()
        .with_timeout(ctx.gate.call_timeout(&user.user_id, DEFAULT_CALL_TIMEOUT));
    ctx.queue
        .process(payload, &options)
        .await
        .map(Json)
        .map_err(|e| map_import_error(e, request_id))
}

/// `GET /api/imports`
pub async fn list_imports(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
) -> Json<Vec<ImportRecord>> {
    Json(ctx.queue.list())
}

/// `POST /api/imports/:id/reprocess`
pub async fn reprocess_import(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ImportRecord>, ApiError> {
    if !ctx.gate.is_enabled(&user.user_id, Feature::AiExtraction) {
        return Err(ApiError::forbidden("ai_extraction").with_request_id(request_id));
    }
    let options = CallOptions::default()
        .with_timeout(ctx.gate.call_timeout(&user.user_id, DEFAULT_CALL_TIMEOUT));
    ctx.queue
        .reprocess(id, &options)
        .await
        .map(Json)
        .map_err(|e| map_import_error(e, request_id))
}

fn map_import_error(err: ImportError, request_id: String) -> ApiError {
    match err {
        ImportError::NotFound(id) => ApiError::not_found(format!("import {id} not found")),
        ImportError::NoText(_) | ImportError::InvalidDocument(_) => {
            ApiError::bad_request(err.to_string())
        }
    }
    .with_request_id(request_id)
}
