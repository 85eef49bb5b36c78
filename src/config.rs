//! Client configuration
//!
//! Loaded from a TOML file (by default `<config dir>/mentora/config.toml`)
//! with `MENTORA_*` environment variables layered on top.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::{Address, ReceiptPolling};
use crate::error::{ClientError, Result};
use crate::review::ReviewerConfig;
use crate::storage::client::{DEFAULT_ALTERNATE_GATEWAY, DEFAULT_PUBLIC_GATEWAY};

pub const CONFIG_DIR_NAME: &str = "mentora";
pub const CONFIG_FILE_NAME: &str = "config.toml";

// ==================== Networks ====================

/// A chain the marketplace is deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkPreset {
    pub key: &'static str,
    pub chain_id: u64,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    pub currency: &'static str,
}

impl NetworkPreset {
    pub const OPEN_CAMPUS: NetworkPreset = NetworkPreset {
        key: "opencampus",
        chain_id: 656476,
        name: "Open Campus Codex",
        rpc_url: "https://rpc.open-campus-codex.gelato.digital",
        explorer_url: "https://opencampus-codex.blockscout.com",
        currency: "EDU",
    };

    pub const SEPOLIA: NetworkPreset = NetworkPreset {
        key: "sepolia",
        chain_id: 11155111,
        name: "Sepolia",
        rpc_url: "https://rpc.sepolia.org",
        explorer_url: "https://sepolia.etherscan.io",
        currency: "ETH",
    };

    pub const ARBITRUM_SEPOLIA: NetworkPreset = NetworkPreset {
        key: "arb_sepolia",
        chain_id: 421614,
        name: "Arbitrum Sepolia",
        rpc_url: "https://sepolia-rollup.arbitrum.io/rpc",
        explorer_url: "https://sepolia-explorer.arbitrum.io",
        currency: "ETH",
    };

    pub const ALL: [NetworkPreset; 3] = [Self::OPEN_CAMPUS, Self::SEPOLIA, Self::ARBITRUM_SEPOLIA];

    /// Look up by key (case-insensitive, separators ignored) or chain id
    pub fn by_key(key: &str) -> Option<NetworkPreset> {
        let wanted: String = key
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect();
        Self::ALL
            .into_iter()
            .find(|p| p.key.replace('_', "") == wanted || p.chain_id.to_string() == wanted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub explorer_url: String,
    /// Native token symbol, display only
    pub currency: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkPreset::OPEN_CAMPUS.into()
    }
}

impl From<NetworkPreset> for NetworkConfig {
    fn from(p: NetworkPreset) -> Self {
        Self {
            chain_id: p.chain_id,
            name: p.name.to_string(),
            rpc_url: p.rpc_url.to_string(),
            explorer_url: p.explorer_url.to_string(),
            currency: p.currency.to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }

    pub fn address_url(&self, address: &Address) -> String {
        format!("{}/address/{}", self.explorer_url.trim_end_matches('/'), address)
    }
}

// ==================== Sections ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractAddresses {
    pub mentora: Option<Address>,
    pub assignment_manager: Option<Address>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// REST upload server (`/upload/*`, `/retrieve/*`)
    #[default]
    Gateway,
    /// IPFS node RPC (`/api/v0/*`)
    IpfsNode,
}

impl FromStr for StorageBackend {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "gateway" | "rest" => Ok(StorageBackend::Gateway),
            "ipfs-node" | "ipfs" | "node" => Ok(StorageBackend::IpfsNode),
            other => Err(ClientError::Configuration(format!(
                "unknown storage backend '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Upload server API base (e.g. `http://localhost:5000/api`) or IPFS node
    /// RPC address (e.g. `http://127.0.0.1:5001`)
    pub api_base: String,
    pub public_gateway: String,
    pub alternate_gateway: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Gateway,
            api_base: "http://localhost:5000/api".to_string(),
            public_gateway: DEFAULT_PUBLIC_GATEWAY.to_string(),
            alternate_gateway: DEFAULT_ALTERNATE_GATEWAY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Websocket URL of the review agent
    pub url: Option<String>,
}

// ==================== ClientConfig ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub network: NetworkConfig,
    pub contracts: ContractAddresses,
    /// Sender for writes; must be unlocked on the node or wallet behind the RPC
    /// unless `private_key` is set
    pub default_account: Option<Address>,
    /// Hex secp256k1 key; writes are signed locally and sent raw
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    pub storage: StorageConfig,
    pub agent: AgentConfig,
    pub reviewer: ReviewerConfig,
    pub transactions: ReceiptPolling,
    /// Whole-request limit for JSON-RPC calls; storage transfers only use it
    /// as a connect limit
    pub http_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            contracts: ContractAddresses::default(),
            default_account: None,
            private_key: None,
            storage: StorageConfig::default(),
            agent: AgentConfig::default(),
            reviewer: ReviewerConfig::default(),
            transactions: ReceiptPolling::default(),
            http_timeout_secs: 120,
        }
    }
}

impl ClientConfig {
    /// `<config dir>/mentora/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Configuration(format!("Failed to read config from {}: {e}", path.display()))
        })?;
        let config = toml::from_str(&contents).map_err(|e| {
            ClientError::Configuration(format!("Failed to parse config at {}: {e}", path.display()))
        })?;
        debug!("Config loaded from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ClientError::Configuration(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ClientError::Configuration(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, contents).map_err(|e| {
            ClientError::Configuration(format!("Failed to write config to {}: {e}", path.display()))
        })?;
        debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Defaults with `MENTORA_*` overrides
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load `path` (or the default file when it exists), then apply the
    /// environment
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(path)?,
                None => Self::default(),
            },
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `MENTORA_*` variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(key) = env("MENTORA_NETWORK") {
            let preset = NetworkPreset::by_key(&key)
                .ok_or_else(|| ClientError::Configuration(format!("unknown network '{key}'")))?;
            self.network = preset.into();
        }
        if let Some(url) = env("MENTORA_RPC_URL") {
            self.network.rpc_url = url;
        }
        if let Some(id) = env("MENTORA_CHAIN_ID") {
            self.network.chain_id = parse_env("MENTORA_CHAIN_ID", &id)?;
        }
        if let Some(addr) = env("MENTORA_CONTRACT_ADDRESS") {
            self.contracts.mentora = Some(parse_address("MENTORA_CONTRACT_ADDRESS", &addr)?);
        }
        if let Some(addr) = env("MENTORA_ASSIGNMENT_MANAGER_ADDRESS") {
            self.contracts.assignment_manager =
                Some(parse_address("MENTORA_ASSIGNMENT_MANAGER_ADDRESS", &addr)?);
        }
        if let Some(addr) = env("MENTORA_DEFAULT_ACCOUNT") {
            self.default_account = Some(parse_address("MENTORA_DEFAULT_ACCOUNT", &addr)?);
        }
        if let Some(key) = env("MENTORA_PRIVATE_KEY") {
            self.private_key = Some(key);
        }
        if let Some(backend) = env("MENTORA_STORAGE_BACKEND") {
            self.storage.backend = backend.parse()?;
        }
        if let Some(api) = env("MENTORA_STORAGE_API") {
            self.storage.api_base = api;
        }
        if let Some(url) = env("MENTORA_AGENT_URL") {
            self.agent.url = Some(url);
        }
        if let Some(base) = env("MENTORA_LLM_API_BASE") {
            self.reviewer.api_base = base;
        }
        if let Some(key) = env("MENTORA_LLM_API_KEY") {
            self.reviewer.api_key = key;
        }
        if let Some(model) = env("MENTORA_LLM_MODEL") {
            self.reviewer.model = model;
        }
        if let Some(secs) = env("MENTORA_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = parse_env("MENTORA_HTTP_TIMEOUT_SECS", &secs)?;
        }
        Ok(())
    }

    pub fn mentora_address(&self) -> Result<Address> {
        self.contracts.mentora.ok_or_else(|| {
            ClientError::Configuration("Mentora contract address is not configured".into())
        })
    }

    pub fn assignment_manager_address(&self) -> Result<Address> {
        self.contracts.assignment_manager.ok_or_else(|| {
            ClientError::Configuration("Assignment manager address is not configured".into())
        })
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ClientError::Configuration(format!("{name}: {e}")))
}

fn parse_address(name: &str, value: &str) -> Result<Address> {
    value
        .parse()
        .map_err(|e| ClientError::Configuration(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::time::Duration;

    const ENV_VARS: &[&str] = &[
        "MENTORA_NETWORK",
        "MENTORA_RPC_URL",
        "MENTORA_CHAIN_ID",
        "MENTORA_CONTRACT_ADDRESS",
        "MENTORA_ASSIGNMENT_MANAGER_ADDRESS",
        "MENTORA_DEFAULT_ACCOUNT",
        "MENTORA_PRIVATE_KEY",
        "MENTORA_STORAGE_BACKEND",
        "MENTORA_STORAGE_API",
        "MENTORA_AGENT_URL",
        "MENTORA_LLM_API_BASE",
        "MENTORA_LLM_API_KEY",
        "MENTORA_LLM_MODEL",
        "MENTORA_HTTP_TIMEOUT_SECS",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn presets_match_known_chains() {
        assert_eq!(NetworkPreset::by_key("OPENCAMPUS").unwrap().chain_id, 656476);
        assert_eq!(NetworkPreset::by_key("arb-sepolia").unwrap().chain_id, 421614);
        assert_eq!(NetworkPreset::by_key("11155111").unwrap().name, "Sepolia");
        assert!(NetworkPreset::by_key("mainnet").is_none());
    }

    #[test]
    fn explorer_links() {
        let net = NetworkConfig::from(NetworkPreset::SEPOLIA);
        assert_eq!(net.tx_url("0xabc"), "https://sepolia.etherscan.io/tx/0xabc");
    }

    #[test]
    fn loads_partial_toml_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_account = "0x00000000000000000000000000000000000000aa"

[contracts]
mentora = "0x00000000000000000000000000000000000000c0"

[storage]
backend = "ipfs-node"
api_base = "http://127.0.0.1:5001"

[transactions]
interval = 250
max_polls = 10
"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.network.chain_id, 656476);
        assert_eq!(config.storage.backend, StorageBackend::IpfsNode);
        assert_eq!(config.storage.public_gateway, DEFAULT_PUBLIC_GATEWAY);
        assert_eq!(config.transactions.interval, Duration::from_millis(250));
        assert_eq!(config.transactions.max_polls, 10);
        assert!(config.mentora_address().is_ok());
        assert!(matches!(
            config.assignment_manager_address(),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = ClientConfig::default();
        config.agent.url = Some("wss://agent.example/ws".into());
        config.save(&path).unwrap();

        assert_eq!(ClientConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn invalid_toml_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_account = \"not-an-address\"").unwrap();
        assert!(matches!(
            ClientConfig::load(&path),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        clear_env();
        std::env::set_var("MENTORA_NETWORK", "sepolia");
        std::env::set_var("MENTORA_RPC_URL", "http://localhost:8545");
        std::env::set_var("MENTORA_DEFAULT_ACCOUNT", "0x00000000000000000000000000000000000000aa");
        std::env::set_var("MENTORA_STORAGE_BACKEND", "ipfs");
        std::env::set_var("MENTORA_LLM_MODEL", "gpt-4o-mini");

        let config = ClientConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.network.chain_id, 11155111);
        assert_eq!(config.network.rpc_url, "http://localhost:8545");
        assert!(config.default_account.is_some());
        assert_eq!(config.storage.backend, StorageBackend::IpfsNode);
        assert_eq!(config.reviewer.model, "gpt-4o-mini");
    }

    #[test]
    #[serial]
    fn private_key_from_env_is_not_written_back_when_unset() {
        clear_env();
        std::env::set_var("MENTORA_PRIVATE_KEY", "0x01");
        let config = ClientConfig::from_env().unwrap();
        clear_env();
        assert_eq!(config.private_key.as_deref(), Some("0x01"));

        let rendered = toml::to_string_pretty(&ClientConfig::default()).unwrap();
        assert!(!rendered.contains("private_key"));
    }

    #[test]
    #[serial]
    fn bad_env_value_is_reported() {
        clear_env();
        std::env::set_var("MENTORA_CHAIN_ID", "abc");
        let result = ClientConfig::from_env();
        clear_env();
        assert!(matches!(result, Err(ClientError::Configuration(ref m)) if m.contains("MENTORA_CHAIN_ID")));
    }
}
