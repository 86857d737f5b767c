//! Logger setup for hosts that do not install their own `log` backend.

use anyhow::{anyhow, Result};

use crate::settings::StoreSettings;

/// Builds an `env_logger` builder from `spec`. Directives in `env_override`
/// are applied after `spec`, so they win for the same target.
pub fn builder(spec: &str, env_override: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(spec);
    if let Some(env_spec) = env_override {
        builder.parse_filters(env_spec);
    }
    builder
}

/// Installs the logger as the global `log` backend, filtered by `spec`
/// with `RUST_LOG` as an override.
///
/// Fails if a logger is already installed.
pub fn init(spec: &str) -> Result<()> {
    let env_spec = std::env::var("RUST_LOG").ok();
    builder(spec, env_spec.as_deref())
        .try_init()
        .map_err(|e| anyhow!("Failed to install logger: {}", e))
}

/// Installs the logger using the filter from the store settings.
pub fn init_from(settings: &StoreSettings) -> Result<()> {
    init(&settings.log_filter)
}
