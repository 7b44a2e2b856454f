//! Tracing subscriber setup
//!
//! The search layer only emits `tracing` events; hosts that do not install
//! their own subscriber can call [`init_tracing`] once at startup.

use crate::config::ObservabilityConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global subscriber honouring `RUST_LOG`, falling back to the configured level.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("catalog_search={}", config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    match result {
        Ok(()) => {
            tracing::info!(
                level = %config.log_level,
                json = config.json_logs,
                "Tracing initialized"
            );
            true
        }
        Err(_) => false,
    }
}
