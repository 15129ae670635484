//! Request id assignment.
//!
//! Every request gets a fresh uuid before anything else runs. The id is
//! available to handlers via extensions and echoed back in the
//! `X-Request-Id` response header, so a client-reported failure can be
//! matched against server logs.

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::api::types::RequestId;

pub async fn assign(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        response.headers_mut().insert("X-Request-Id", val);
    }
    response
}
