//! HTTP API layer.
//!
//! Exposes the extraction pipeline as JSON endpoints under `/api/`,
//! protected by a middleware stack: Request id → Auth → Rate limit →
//! Handler. The router is composable; `api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{start_server, ApiServer};
pub use types::{generate_token, ApiContext, AuthedUser, SessionVerifier, StaticTokenVerifier};
