//! Environment-backed configuration.
//!
//! Every provider credential is optional at startup; a missing key
//! degrades that provider to a per-call failure instead of refusing to
//! boot, so the fallback chain stays exercisable with partial config.

use std::env;
use std::net::SocketAddr;

use crate::providers::{ProviderConfig, ProviderId};

/// Application-level constants
pub const APP_NAME: &str = "Tripstack";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_PORT: u16 = 8787;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";

const OPENAI_MODEL: &str = "gpt-4o-mini";
const GEMINI_MODEL: &str = "gemini-2.0-flash";
const MISTRAL_MODEL: &str = "mistral-small-latest";

/// Default log filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info,tripstack=debug"
}

/// Resolved process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub openai_key: Option<String>,
    pub gemini_key: Option<String>,
    pub mistral_key: Option<String>,
    pub ocrspace_key: Option<String>,
    pub openai_base_url: String,
    pub gemini_base_url: String,
    pub mistral_base_url: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            openai_key: non_empty(env::var("OPENAI_API_KEY").ok()),
            gemini_key: non_empty(env::var("GEMINI_API_KEY").ok()),
            mistral_key: non_empty(env::var("MISTRAL_API_KEY").ok()),
            ocrspace_key: non_empty(env::var("OCRSPACE_API_KEY").ok()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| OPENAI_BASE_URL.to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| GEMINI_BASE_URL.to_string()),
            mistral_base_url: env::var("MISTRAL_BASE_URL")
                .unwrap_or_else(|_| MISTRAL_BASE_URL.to_string()),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    fn openai(&self) -> ProviderConfig {
        ProviderConfig {
            id: ProviderId::OpenAi,
            model: OPENAI_MODEL.to_string(),
            base_url: self.openai_base_url.clone(),
            api_key: self.openai_key.clone(),
        }
    }

    fn gemini(&self) -> ProviderConfig {
        ProviderConfig {
            id: ProviderId::Gemini,
            model: GEMINI_MODEL.to_string(),
            base_url: self.gemini_base_url.clone(),
            api_key: self.gemini_key.clone(),
        }
    }

    fn mistral(&self) -> ProviderConfig {
        ProviderConfig {
            id: ProviderId::Mistral,
            model: MISTRAL_MODEL.to_string(),
            base_url: self.mistral_base_url.clone(),
            api_key: self.mistral_key.clone(),
        }
    }

    /// Primary pair for parallel extraction, in tie-break preference order.
    pub fn extraction_providers(&self) -> Vec<ProviderConfig> {
        vec![self.openai(), self.gemini()]
    }

    /// Last-resort single-call extraction provider.
    pub fn tertiary_provider(&self) -> ProviderConfig {
        self.mistral()
    }

    /// Vision OCR chain: first two run in parallel, third is the fallback.
    pub fn vision_providers(&self) -> Vec<ProviderConfig> {
        vec![self.openai(), self.gemini(), self.mistral()]
    }

    pub fn enrichment_providers(&self) -> Vec<ProviderConfig> {
        vec![self.openai(), self.gemini()]
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_settings() -> Settings {
        Settings {
            port: DEFAULT_PORT,
            openai_key: Some("ok".into()),
            gemini_key: None,
            mistral_key: Some("mk".into()),
            ocrspace_key: None,
            openai_base_url: OPENAI_BASE_URL.into(),
            gemini_base_url: GEMINI_BASE_URL.into(),
            mistral_base_url: MISTRAL_BASE_URL.into(),
        }
    }

    #[test]
    fn extraction_providers_ordered_openai_first() {
        let providers = bare_settings().extraction_providers();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].id, ProviderId::OpenAi);
        assert_eq!(providers[1].id, ProviderId::Gemini);
    }

    #[test]
    fn missing_key_is_carried_not_rejected() {
        let providers = bare_settings().extraction_providers();
        assert!(providers[0].api_key.is_some());
        assert!(providers[1].api_key.is_none());
    }

    #[test]
    fn vision_chain_has_three_providers() {
        let providers = bare_settings().vision_providers();
        assert_eq!(providers.len(), 3);
        assert_eq!(providers[2].id, ProviderId::Mistral);
    }

    #[test]
    fn non_empty_filters_blank_values() {
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(Some("key".into())), Some("key".to_string()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn bind_addr_uses_port() {
        let settings = bare_settings();
        assert_eq!(settings.bind_addr().port(), DEFAULT_PORT);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
