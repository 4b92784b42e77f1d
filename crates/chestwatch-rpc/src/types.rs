use serde::{Deserialize, Serialize};

use chestwatch_core::BlockNumber;

/// `eth_getLogs` filter object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLogFilter {
    pub address: String,
    /// Positional topic filters; `None` matches anything.
    pub topics: Vec<Option<String>>,
    pub from_block: String,
    pub to_block: String,
}

/// One entry of an `eth_getLogs` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: Option<String>,
    pub transaction_hash: Option<String>,
    pub log_index: Option<String>,
    /// Set when the log was dropped by a reorg.
    #[serde(default)]
    pub removed: bool,
}

/// `eth_call` transaction object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcCallRequest {
    pub to: String,
    pub data: String,
}

/// Hex quantity as used by JSON-RPC (`0x0`, `0x1a`).
pub fn quantity(value: u64) -> String {
    format!("{value:#x}")
}

pub fn parse_quantity(s: &str) -> Option<BlockNumber> {
    let digits = s.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}
