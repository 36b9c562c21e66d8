//! Gateway configuration loading.
//!
//! Priority: `PHARMACHAT_GATEWAY_URL` environment variable, then
//! `~/.config/pharmachat/config.toml`, then built-in defaults. A missing
//! file is never an error.

use std::path::Path;

use pharmachat_core::config::GatewayConfig;
use pharmachat_core::error::Result;

/// Loads gateway configuration from the default config file location.
pub fn load_gateway_config() -> Result<GatewayConfig> {
    let path = match crate::paths::PharmaPaths::config_file() {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("could not resolve config path ({e}); using defaults");
            return Ok(apply_env_overrides(GatewayConfig::default()));
        }
    };
    load_gateway_config_from(&path)
}

/// Loads gateway configuration from an explicit path, falling back to
/// defaults when the file does not exist.
pub fn load_gateway_config_from(path: &Path) -> Result<GatewayConfig> {
    let config = match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str(&raw)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => GatewayConfig::default(),
        Err(e) => {
            return Err(pharmachat_core::PharmaError::config(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };
    Ok(apply_env_overrides(config))
}

fn apply_env_overrides(mut config: GatewayConfig) -> GatewayConfig {
    if let Ok(url) = std::env::var("PHARMACHAT_GATEWAY_URL") {
        if !url.trim().is_empty() {
            config.base_url = url;
        }
    }
    config
}
