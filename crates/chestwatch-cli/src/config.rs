use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use chestwatch_core::constants::{
    DEFAULT_FEED_LIMIT, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use chestwatch_core::{Address, WatchError};
use chestwatch_feed::WindowPolicy;
use chestwatch_rpc::ContractAddresses;

/// Watcher configuration. Every field has a default; a JSON file may set
/// any subset and command-line flags override both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// JSON-RPC endpoint of the chain node.
    pub rpc_url: String,
    pub chest_contract: Option<Address>,
    pub swap_contract: Option<Address>,
    /// Account whose positions and payouts are tracked.
    pub account: Option<Address>,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub feed_limit: usize,
    pub windows: WindowPolicy,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".into(),
            chest_contract: None,
            swap_contract: None,
            account: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            feed_limit: DEFAULT_FEED_LIMIT,
            windows: WindowPolicy::default(),
        }
    }
}

/// Flags that take precedence over the config file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Chain node JSON-RPC endpoint.
    #[arg(long, global = true)]
    pub rpc: Option<String>,

    /// Chest contract address (0x…).
    #[arg(long, global = true)]
    pub chest_contract: Option<Address>,

    /// Swap contract address (0x…).
    #[arg(long, global = true)]
    pub swap_contract: Option<Address>,

    /// Account to track (0x…).
    #[arg(long, global = true)]
    pub account: Option<Address>,

    /// Seconds between timer-driven refreshes.
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Maximum number of feed entries.
    #[arg(long, global = true)]
    pub feed_limit: Option<usize>,
}

impl WatchConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.rpc {
            self.rpc_url = url.clone();
        }
        if overrides.chest_contract.is_some() {
            self.chest_contract = overrides.chest_contract;
        }
        if overrides.swap_contract.is_some() {
            self.swap_contract = overrides.swap_contract;
        }
        if overrides.account.is_some() {
            self.account = overrides.account;
        }
        if let Some(secs) = overrides.interval {
            self.refresh_interval_secs = secs;
        }
        if let Some(limit) = overrides.feed_limit {
            self.feed_limit = limit;
        }
    }

    pub fn validate(&self) -> Result<(), WatchError> {
        if self.rpc_url.trim().is_empty() {
            return Err(WatchError::Config("rpc_url is empty".into()));
        }
        if self.refresh_interval_secs == 0 {
            return Err(WatchError::Config("refresh_interval_secs must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(WatchError::Config("request_timeout_secs must be positive".into()));
        }
        if self.windows.max_block_range == 0 {
            return Err(WatchError::Config("windows.max_block_range must be positive".into()));
        }
        self.contracts().map(|_| ())
    }

    pub fn contracts(&self) -> Result<ContractAddresses, WatchError> {
        match (self.chest_contract, self.swap_contract) {
            (Some(chest), Some(swap)) => Ok(ContractAddresses { chest, swap }),
            (None, _) => Err(WatchError::Config("chest_contract is not set".into())),
            (_, None) => Err(WatchError::Config("swap_contract is not set".into())),
        }
    }
}
