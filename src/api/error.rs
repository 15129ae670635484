//! API error types with structured JSON responses.
//!
//! Every failure leaves the server as the same envelope:
//! `{"error": {"code", "message", "requestId", "details"?}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiKind {
    #[error("Authentication required")]
    Unauthorized,
    #[error("Plan does not include {0}")]
    Forbidden(String),
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64, reset_at: String },
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Upstream failure: {0}")]
    Upstream(String),
    #[error("Server misconfigured: {0}")]
    Misconfigured(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// An `ApiKind` plus the per-request context stamped on the envelope.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiKind,
    request_id: Option<String>,
    details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiKind::Unauthorized.into()
    }

    pub fn forbidden(feature: impl Into<String>) -> Self {
        ApiKind::Forbidden(feature.into()).into()
    }

    pub fn rate_limited(retry_after: u64, reset_at: String) -> Self {
        ApiKind::RateLimited {
            retry_after,
            reset_at,
        }
        .into()
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        ApiKind::BadRequest(detail.into()).into()
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        ApiKind::NotFound(detail.into()).into()
    }

    pub fn upstream(detail: impl Into<String>) -> Self {
        ApiKind::Upstream(detail.into()).into()
    }

    pub fn misconfigured(detail: impl Into<String>) -> Self {
        ApiKind::Misconfigured(detail.into()).into()
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        ApiKind::Internal(detail.into()).into()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<ApiKind> for ApiError {
    fn from(kind: ApiKind) -> Self {
        Self {
            kind,
            request_id: None,
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self.kind {
            ApiKind::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            ApiKind::Forbidden(feature) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                format!("Plan does not include {feature}"),
            ),
            ApiKind::RateLimited {
                retry_after,
                reset_at,
            } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Rate limit exceeded. Resets at {reset_at}, retry after {retry_after}s"),
            ),
            ApiKind::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiKind::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiKind::Upstream(detail) => {
                tracing::warn!(%detail, "upstream failure surfaced to client");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", detail.clone())
            }
            ApiKind::Misconfigured(detail) => {
                tracing::error!(%detail, "server misconfiguration");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MISCONFIGURED",
                    detail.clone(),
                )
            }
            ApiKind::Internal(detail) => {
                tracing::error!(%detail, "API internal error");
                // Internal details never leave the server
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                request_id: self.request_id.clone(),
                details: self.details.clone(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if let ApiKind::RateLimited { retry_after, .. } = &self.kind {
            if let Ok(val) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("Retry-After", val);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_returns_401() {
        let response = ApiError::unauthorized().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn forbidden_names_the_feature() {
        let response = ApiError::forbidden("vision_ocr").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "FORBIDDEN");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("vision_ocr"));
    }

    #[tokio::test]
    async fn rate_limited_returns_429_with_retry_after() {
        let response =
            ApiError::rate_limited(60, "2026-08-28T12:00:00Z".into()).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "60");
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "RATE_LIMITED");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("2026-08-28T12:00:00Z"));
    }

    #[tokio::test]
    async fn request_id_appears_in_the_envelope() {
        let response = ApiError::bad_request("missing field")
            .with_request_id("req-123")
            .into_response();
        let json = body_json(response).await;
        assert_eq!(json["error"]["requestId"], "req-123");
    }

    #[tokio::test]
    async fn details_carry_structured_context() {
        let response = ApiError::upstream("all OCR stages failed")
            .with_details(serde_json::json!({"warnings": ["no native text layer"]}))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "UPSTREAM_ERROR");
        assert!(json["error"]["details"]["warnings"].is_array());
    }

    #[tokio::test]
    async fn internal_hides_details_from_client() {
        let response = ApiError::internal("lock poisoned").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[tokio::test]
    async fn misconfigured_is_distinct_from_internal() {
        let response = ApiError::misconfigured("no providers configured").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "MISCONFIGURED");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("no providers"));
    }
}
