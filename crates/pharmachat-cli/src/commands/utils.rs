use anyhow::{Context, Result};
use std::sync::Arc;

use pharmachat_core::agent::AgentGateway;
use pharmachat_gateway::HttpAgentGateway;
use pharmachat_infrastructure::load_gateway_config;

/// Builds the HTTP gateway from the resolved configuration.
pub fn connect() -> Result<Arc<dyn AgentGateway>> {
    let config = load_gateway_config().context("Failed to load gateway configuration")?;
    let gateway =
        HttpAgentGateway::new(&config).context("Failed to initialize the agent gateway")?;
    Ok(Arc::new(gateway))
}
