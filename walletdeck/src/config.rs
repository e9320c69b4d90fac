//! Dashboard configuration.
//!
//! Configuration is a single JSON document. Every field has a default, so
//! an empty object (or no file at all) yields a working mainnet, Goerli,
//! Polygon and Base setup over public RPC endpoints.
//!
//! ```json
//! {
//!   "debounce_ms": 500,
//!   "ens_suffix": ".eth",
//!   "checksum": "eip55",
//!   "default_chain": 1,
//!   "chains": [
//!     { "id": 1, "name": "Ethereum", "rpc_url": "https://eth.llamarpc.com" }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::{ChecksumPolicy, DEFAULT_ENS_SUFFIX};
use crate::error::ConfigError;
use crate::form::FormConfig;
use crate::provider::{ChainId, ChainInfo};
use crate::units::ETHER_DECIMALS;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "WALLETDECK_CONFIG";

/// Largest decimal exponent whose unit still fits in a `U256`.
const MAX_DECIMALS: u8 = 77;

/// Chain ID of Ethereum mainnet, where ENS lives.
pub const MAINNET_CHAIN_ID: ChainId = 1;

fn default_symbol() -> String {
    "ETH".to_string()
}

const fn default_decimals() -> u8 {
    ETHER_DECIMALS
}

/// A network the dashboard can connect to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain ID.
    pub id: ChainId,
    /// Display name.
    pub name: String,
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Native token symbol.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Native token decimals.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

impl ChainConfig {
    /// Create a chain with an 18-decimal native token.
    #[must_use]
    pub fn new(
        id: ChainId,
        name: impl Into<String>,
        rpc_url: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            rpc_url: rpc_url.into(),
            symbol: symbol.into(),
            decimals: ETHER_DECIMALS,
        }
    }

    /// ID and name, as listed by the network selector.
    #[must_use]
    pub fn info(&self) -> ChainInfo {
        ChainInfo {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Built-in networks.
#[must_use]
pub fn default_chains() -> Vec<ChainConfig> {
    vec![
        ChainConfig::new(MAINNET_CHAIN_ID, "Ethereum", "https://eth.llamarpc.com", "ETH"),
        ChainConfig::new(5, "Goerli", "https://goerli.gateway.tenderly.co", "ETH"),
        ChainConfig::new(137, "Polygon", "https://polygon-rpc.com", "MATIC"),
        ChainConfig::new(8453, "Base", "https://mainnet.base.org", "ETH"),
    ]
}

/// Top-level dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    /// Debounce quiet period for form inputs, in milliseconds.
    pub debounce_ms: u64,
    /// Suffix that marks input as an ENS name.
    pub ens_suffix: String,
    /// Checksum policy for typed hex addresses.
    pub checksum: ChecksumPolicy,
    /// Networks available for switching.
    pub chains: Vec<ChainConfig>,
    /// Chain selected on startup (first chain if unset).
    pub default_chain: Option<ChainId>,
    /// RPC endpoint used for ENS lookups (mainnet chain's RPC if unset).
    pub ens_rpc_url: Option<String>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            ens_suffix: DEFAULT_ENS_SUFFIX.to_string(),
            checksum: ChecksumPolicy::default(),
            chains: default_chains(),
            default_chain: None,
            ens_rpc_url: None,
        }
    }
}

impl DeckConfig {
    /// Load and validate a config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_json(&content)?;
        debug!(path = %path.display(), chains = config.chains.len(), "config loaded");
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chains.is_empty() {
            return Err(ConfigError::invalid("at least one chain is required"));
        }

        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.id) {
                return Err(ConfigError::invalid(format!(
                    "duplicate chain id {}",
                    chain.id
                )));
            }
            if chain.rpc_url.trim().is_empty() {
                return Err(ConfigError::invalid(format!(
                    "chain {} has no rpc_url",
                    chain.id
                )));
            }
            if chain.decimals > MAX_DECIMALS {
                return Err(ConfigError::invalid(format!(
                    "chain {} decimals {} exceed {MAX_DECIMALS}",
                    chain.id, chain.decimals
                )));
            }
        }

        if let Some(id) = self.default_chain {
            if !seen.contains(&id) {
                return Err(ConfigError::invalid(format!(
                    "default_chain {id} is not configured"
                )));
            }
        }

        if self.ens_suffix.trim().is_empty() {
            return Err(ConfigError::invalid("ens_suffix must not be empty"));
        }

        Ok(())
    }

    /// Look up a configured chain.
    #[must_use]
    pub fn chain(&self, id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.id == id)
    }

    /// The chain selected on startup.
    #[must_use]
    pub fn initial_chain(&self) -> Option<&ChainConfig> {
        self.default_chain
            .and_then(|id| self.chain(id))
            .or_else(|| self.chains.first())
    }

    /// RPC endpoint for ENS lookups.
    #[must_use]
    pub fn ens_rpc_url(&self) -> Option<&str> {
        self.ens_rpc_url
            .as_deref()
            .or_else(|| self.chain(MAINNET_CHAIN_ID).map(|c| c.rpc_url.as_str()))
    }

    /// Debounce quiet period.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Form settings for sending on `chain`.
    #[must_use]
    pub fn form_config(&self, chain: Option<&ChainConfig>) -> FormConfig {
        FormConfig {
            debounce: self.debounce(),
            decimals: chain.map_or(ETHER_DECIMALS, |c| c.decimals),
            ens_suffix: self.ens_suffix.clone(),
            checksum: self.checksum,
        }
    }
}
