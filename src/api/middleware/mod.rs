//! Middleware stack for the API router.
//!
//! Applied outermost to innermost: request id → auth → rate limit.
//! Rate limiting runs after auth because the quota depends on who is
//! calling.

pub mod auth;
pub mod rate;
pub mod request_id;
