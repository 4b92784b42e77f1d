use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Address, BlockNumber, TokenAmount, TxHash};

// ── Canonical record ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Lock,
    Claim,
    Buy,
    Sell,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivityKind::Lock => "lock",
            ActivityKind::Claim => "claim",
            ActivityKind::Buy => "buy",
            ActivityKind::Sell => "sell",
        };
        f.write_str(s)
    }
}

/// One entry of the activity feed, independent of the contract that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub kind: ActivityKind,
    pub subject: Address,
    pub amount: TokenAmount,
    pub block_number: BlockNumber,
    pub transaction_ref: TxHash,
}

// ── Sources ──────────────────────────────────────────────────────────────────

/// The two contracts the engine reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractRole {
    /// Time-locked chest: LockCreated / LockClaimed, position and total reads.
    Chest,
    /// Token swap: TokensPurchased / TokensSold.
    Swap,
}

/// The closed set of subscribed events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    LockCreated,
    LockClaimed,
    TokensPurchased,
    TokensSold,
}

impl EventName {
    pub const ALL: [EventName; 4] = [
        EventName::LockCreated,
        EventName::LockClaimed,
        EventName::TokensPurchased,
        EventName::TokensSold,
    ];

    pub fn contract(&self) -> ContractRole {
        match self {
            EventName::LockCreated | EventName::LockClaimed => ContractRole::Chest,
            EventName::TokensPurchased | EventName::TokensSold => ContractRole::Swap,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::LockCreated => "LockCreated",
            EventName::LockClaimed => "LockClaimed",
            EventName::TokensPurchased => "TokensPurchased",
            EventName::TokensSold => "TokensSold",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a log came from on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogMeta {
    pub block_number: BlockNumber,
    pub transaction_hash: TxHash,
    pub log_index: u64,
}

/// A decoded contract event before normalization. Field names follow the
/// event arguments; amounts are still integer base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawLogRecord {
    LockCreated {
        meta: LogMeta,
        user: Address,
        amount: u128,
    },
    LockClaimed {
        meta: LogMeta,
        user: Address,
        payout: u128,
    },
    TokensPurchased {
        meta: LogMeta,
        buyer: Address,
        amount_of_tokens: u128,
    },
    TokensSold {
        meta: LogMeta,
        seller: Address,
        amount_of_tokens: u128,
    },
}

impl RawLogRecord {
    pub fn event(&self) -> EventName {
        match self {
            RawLogRecord::LockCreated { .. } => EventName::LockCreated,
            RawLogRecord::LockClaimed { .. } => EventName::LockClaimed,
            RawLogRecord::TokensPurchased { .. } => EventName::TokensPurchased,
            RawLogRecord::TokensSold { .. } => EventName::TokensSold,
        }
    }

    pub fn meta(&self) -> &LogMeta {
        match self {
            RawLogRecord::LockCreated { meta, .. }
            | RawLogRecord::LockClaimed { meta, .. }
            | RawLogRecord::TokensPurchased { meta, .. }
            | RawLogRecord::TokensSold { meta, .. } => meta,
        }
    }
}
