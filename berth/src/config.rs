use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use berth_core::api::rest::RequestLimits;
use serde::Deserialize;

/// Server configuration file (TOML). Every field is optional; CLI flags
/// override file values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    pub bind_address: Option<SocketAddr>,
    #[serde(default)]
    pub limits: RequestLimits,
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}
