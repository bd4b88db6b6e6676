mod loader;

use std::time::Duration;

use serde::Deserialize;

use crate::client::ClientOptions;
use crate::registry::{Endpoint, Network};

pub use loader::{get_default_config, load_configuration, write_config_to};

/// Process-level configuration, sourced from `config.toml` plus
/// `GATEWAY_*` environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub api_key: String,
    pub network: Network,
    /// Endpoint id to select instead of the network default.
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub retry_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub debug: bool,
    /// Extra endpoints merged over the built-in registry tables.
    pub endpoints: Vec<Endpoint>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let options = ClientOptions::default();
        Self {
            api_key: String::new(),
            network: Network::Mainnet,
            endpoint: None,
            timeout_ms: options.timeout.as_millis() as u64,
            retry_attempts: options.retry_attempts,
            base_delay_ms: options.base_delay.as_millis() as u64,
            max_delay_ms: options.max_delay.as_millis() as u64,
            debug: false,
            endpoints: Vec::new(),
        }
    }
}

impl GatewayConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_millis(self.timeout_ms),
            retry_attempts: self.retry_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            debug: self.debug,
            ..ClientOptions::default()
        }
    }
}
