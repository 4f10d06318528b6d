//! Configuration persistence.
//!
//! Settings live in ~/.agentbridge/settings.json and are loaded with
//! env var > settings.json > default priority. The signing key is
//! never stored here — it is read from `AGENT_PRIVATE_KEY` at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Persisted configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Hub API configuration.
    #[serde(default)]
    pub hub: HubSettings,

    /// Chain registry configuration.
    #[serde(default)]
    pub chain: ChainSettings,

    /// Batch synchronization configuration.
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Hub API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSettings {
    /// Base URL of the hub API, with trailing slash.
    #[serde(default = "default_hub_base_url")]
    pub base_url: String,

    /// SIWA domain the hub verifier expects.
    #[serde(default = "default_siwa_domain")]
    pub siwa_domain: String,

    /// Records per page during ingestion.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_hub_base_url() -> String {
    "http://localhost:3000/api/v1/".to_string()
}

fn default_siwa_domain() -> String {
    "localhost".to_string()
}

fn default_page_size() -> u64 {
    100
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            base_url: default_hub_base_url(),
            siwa_domain: default_siwa_domain(),
            page_size: default_page_size(),
        }
    }
}

/// Chain registry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    /// JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// EIP-155 chain id embedded in registration documents.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Identity registry contract address. Must be set before a run.
    #[serde(default)]
    pub registry_address: Option<String>,

    /// Bound on waiting for a transaction receipt; chain finality can
    /// stall, and a timeout takes the same error-and-resync path as
    /// any other failure.
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    /// Receipt polling interval.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

fn default_chain_id() -> u64 {
    8453 // Base mainnet
}

fn default_confirmation_timeout() -> u64 {
    90
}

fn default_poll_interval() -> u64 {
    1500
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: default_chain_id(),
            registry_address: None,
            confirmation_timeout_secs: default_confirmation_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl ChainSettings {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Batch synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Named settling pause between chain-mutating calls, in
    /// milliseconds. Tunable per RPC provider without code changes.
    #[serde(default = "default_settling_pause")]
    pub settling_pause_ms: u64,

    /// Progress line every Nth confirmed registration.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_settling_pause() -> u64 {
    500
}

fn default_progress_interval() -> usize {
    25
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            settling_pause_ms: default_settling_pause(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl SyncSettings {
    pub fn settling_pause(&self) -> Duration {
        Duration::from_millis(self.settling_pause_ms)
    }
}

impl Settings {
    /// Default settings file path (~/.agentbridge/settings.json).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".agentbridge")
            .join("settings.json")
    }

    /// Load settings from disk, then overlay environment overrides.
    /// Returns defaults when no file exists.
    pub fn load() -> Self {
        let mut settings = Self::load_from(&Self::default_path());
        settings.apply_env();
        settings
    }

    /// Load settings from a specific path.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Overlay environment variable overrides onto loaded settings.
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("AGENTBRIDGE_HUB_URL") {
            self.hub.base_url = v;
        }
        if let Ok(v) = std::env::var("AGENTBRIDGE_RPC_URL") {
            self.chain.rpc_url = v;
        }
        if let Ok(v) = std::env::var("AGENTBRIDGE_REGISTRY_ADDRESS") {
            self.chain.registry_address = Some(v);
        }
        if let Ok(v) = std::env::var("AGENTBRIDGE_CHAIN_ID")
            && let Ok(id) = v.parse()
        {
            self.chain.chain_id = id;
        }
    }
}
