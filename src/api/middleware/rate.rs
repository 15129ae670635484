//! Per-user rate limiting middleware.
//!
//! The window quota comes from the feature gate, so `high_volume` users
//! get their multiplied allowance here without the handler knowing.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser, RequestId};
use crate::limits::RateLimiter;

pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or_else(|| ApiError::internal("missing API context"))?;
    // Auth runs before rate limiting, the user is always present here
    let user = req
        .extensions()
        .get::<AuthedUser>()
        .cloned()
        .ok_or_else(|| ApiError::internal("rate limit before auth"))?;

    // Windows are tracked per (user, operation) so one hot endpoint
    // cannot starve the others.
    let key = format!("{}:{}", user.user_id, req.uri().path());
    let quota = ctx.gate.request_quota(&user.user_id);
    let decision = ctx.limiter.consume(&key, quota);
    if !decision.allowed {
        let retry_after = RateLimiter::retry_after_secs(&decision);
        return Err(ApiError::rate_limited(
            retry_after,
            decision.reset_at.to_rfc3339(),
        )
        .with_request_id(request_id)
        .with_details(serde_json::json!({
            "resetAt": decision.reset_at.to_rfc3339(),
        })));
    }

    Ok(next.run(req).await)
}
