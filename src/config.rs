//! Front-end configuration: app name, chain endpoints, market precision.
//!
//! Loaded from JSON (e.g. a static `config.json` shipped with the app).
//! Every field has a default, so `{}` is a valid config pointing at a local
//! development node.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::market::MarketPrecision;
use crate::error::{ConfigError, SdkError};
use crate::network::{DEFAULT_APP_NAME, DEFAULT_RPC_URL};
use crate::shared::NetworkId;

/// One chain network and its RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEndpoint {
    pub id: NetworkId,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name announced to the wallet extension.
    pub app_name: String,
    pub networks: Vec<NetworkEndpoint>,
    /// Market precision keyed by market id.
    pub markets: HashMap<String, MarketPrecision>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            networks: vec![NetworkEndpoint {
                id: NetworkId::default(),
                url: DEFAULT_RPC_URL.to_string(),
            }],
            markets: HashMap::new(),
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for network in &self.networks {
            if !seen.insert(&network.id) {
                return Err(ConfigError::DuplicateNetwork(network.id.to_string()));
            }
        }
        for market in self.markets.values() {
            market.validate()?;
        }
        Ok(())
    }

    pub fn endpoint(&self, id: &NetworkId) -> Option<&str> {
        self.networks
            .iter()
            .find(|n| &n.id == id)
            .map(|n| n.url.as_str())
    }

    pub fn market(&self, id: &str) -> Option<&MarketPrecision> {
        self.markets.get(id)
    }
}
