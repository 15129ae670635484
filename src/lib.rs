pub mod api;
pub mod config;
pub mod enrich;
pub mod extract;
pub mod limits;
pub mod ocr;
pub mod providers;
pub mod queue;

use tracing_subscriber::EnvFilter;

/// Initialize tracing from RUST_LOG, falling back to the built-in filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}
