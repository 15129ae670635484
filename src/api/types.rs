//! Shared types for the API layer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::enrich::Enricher;
use crate::extract::CanonicalExtractor;
use crate::limits::{FeatureGate, RateLimiter};
use crate::ocr::TextAcquisition;
use crate::queue::ImportQueue;

// ══════════════════════════════════════════════════════════
// API context — shared state for the router
// ══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub extractor: Arc<CanonicalExtractor>,
    pub acquisition: Arc<TextAcquisition>,
    pub enricher: Arc<Enricher>,
    pub queue: Arc<ImportQueue>,
    pub gate: Arc<FeatureGate>,
    pub limiter: Arc<RateLimiter>,
    pub verifier: Arc<dyn SessionVerifier>,
}

// ══════════════════════════════════════════════════════════
// Authentication
// ══════════════════════════════════════════════════════════

/// Authenticated caller, injected into request extensions by the auth
/// middleware.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub user_id: String,
}

/// Request id assigned by the outermost middleware; echoed in the
/// response header and the error envelope.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Seam for session validation so the router can be tested without a
/// real identity backend.
pub trait SessionVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Option<AuthedUser>;
}

/// Fixed token table. Tokens are stored hashed; the plaintext only
/// exists on the client.
#[derive(Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<[u8; 32], String>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, user_id: &str) -> Self {
        self.tokens.insert(hash_token(token), user_id.to_string());
        self
    }
}

impl SessionVerifier for StaticTokenVerifier {
    fn verify(&self, token: &str) -> Option<AuthedUser> {
        self.tokens
            .get(&hash_token(token))
            .map(|user_id| AuthedUser {
                user_id: user_id.clone(),
            })
    }
}

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
