//! Gateway connection configuration.

use serde::{Deserialize, Serialize};

/// Default agent backend URL (the FastAPI demo backend).
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:8000";

/// Default request timeout in seconds for gateway calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the agent gateway connection.
///
/// Loaded from `config.toml` by the infrastructure layer; every field has a
/// usable default so a missing file is not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the agent backend (no trailing slash required).
    #[serde(default = "default_gateway_url")]
    pub base_url: String,
    /// Bound on every gateway request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GatewayConfig {
    /// Returns the base URL with any trailing slash removed.
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
