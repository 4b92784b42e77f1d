//! Contract ABI surface the watcher reads: event topics, view-function
//! selectors and the 32-byte word decoding both need.

use sha3::{Digest, Keccak256};
use thiserror::Error;

use chestwatch_core::{Address, EventName, LogMeta, Position, RawLogRecord};

pub const WORD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("expected {expected} topics, got {got}")]
    TopicCount { expected: usize, got: usize },

    #[error("topic0 does not match {0}")]
    WrongEvent(EventName),

    #[error("data too short: need {need} bytes, have {have}")]
    ShortData { need: usize, have: usize },

    #[error("value does not fit in 128 bits")]
    Overflow,

    #[error("word is not a left-padded address")]
    BadAddress,

    #[error("bad hex: {0}")]
    Hex(String),

    #[error("malformed dynamic array: {0}")]
    BadArray(&'static str),
}

/// Where each event keeps its fields. Every watched event has the acting
/// account as its single indexed argument.
pub struct EventLayout {
    pub event: EventName,
    pub signature: &'static str,
    /// Index of the amount word inside the non-indexed data.
    pub amount_word: usize,
    pub data_words: usize,
}

pub const EVENT_LAYOUTS: [EventLayout; 4] = [
    // LockCreated(address indexed user, uint256 lockId, uint256 amount, uint256 unlockTime)
    EventLayout {
        event: EventName::LockCreated,
        signature: "LockCreated(address,uint256,uint256,uint256)",
        amount_word: 1,
        data_words: 3,
    },
    // LockClaimed(address indexed user, uint256 lockId, uint256 payout)
    EventLayout {
        event: EventName::LockClaimed,
        signature: "LockClaimed(address,uint256,uint256)",
        amount_word: 1,
        data_words: 2,
    },
    // TokensPurchased(address indexed buyer, uint256 amountOfETH, uint256 amountOfTokens)
    EventLayout {
        event: EventName::TokensPurchased,
        signature: "TokensPurchased(address,uint256,uint256)",
        amount_word: 1,
        data_words: 2,
    },
    // TokensSold(address indexed seller, uint256 amountOfTokens, uint256 amountOfETH)
    EventLayout {
        event: EventName::TokensSold,
        signature: "TokensSold(address,uint256,uint256)",
        amount_word: 0,
        data_words: 2,
    },
];

pub const ACTIVE_LOCKED: &str = "activeLocked()";
pub const TOTAL_PAID_OUT: &str = "totalPaidOut()";
pub const GET_USER_LOCKS: &str = "getUserLocks(address)";

/// Words per element of `getUserLocks`:
/// `(uint256 amount, uint256 startTime, uint256 unlockTime, uint256 lockId, bool claimed)`.
const LOCK_TUPLE_WORDS: usize = 5;
const LOCK_AMOUNT_WORD: usize = 0;
const LOCK_CLAIMED_WORD: usize = 4;

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(bytes));
    out
}

pub fn layout(event: EventName) -> &'static EventLayout {
    match event {
        EventName::LockCreated => &EVENT_LAYOUTS[0],
        EventName::LockClaimed => &EVENT_LAYOUTS[1],
        EventName::TokensPurchased => &EVENT_LAYOUTS[2],
        EventName::TokensSold => &EVENT_LAYOUTS[3],
    }
}

pub fn event_topic(event: EventName) -> [u8; 32] {
    keccak256(layout(event).signature.as_bytes())
}

pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// `selector || args`, hex encoded with a `0x` prefix.
pub fn calldata(signature: &str, args: &[[u8; 32]]) -> String {
    let mut bytes = selector(signature).to_vec();
    for arg in args {
        bytes.extend_from_slice(arg);
    }
    format!("0x{}", hex::encode(bytes))
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>, AbiError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| AbiError::Hex(e.to_string()))
}

pub fn word_at(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    let short = AbiError::ShortData {
        need: index.saturating_add(1).saturating_mul(WORD),
        have: data.len(),
    };
    let start = index.checked_mul(WORD).ok_or(short.clone())?;
    data.get(start..start.saturating_add(WORD)).ok_or(short)
}

pub fn word_to_u128(word: &[u8]) -> Result<u128, AbiError> {
    if word.len() != WORD {
        return Err(AbiError::ShortData { need: WORD, have: word.len() });
    }
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

pub fn word_to_usize(word: &[u8]) -> Result<usize, AbiError> {
    let value = word_to_u128(word)?;
    usize::try_from(value).map_err(|_| AbiError::Overflow)
}

pub fn word_to_address(word: &[u8]) -> Result<Address, AbiError> {
    if word.len() != WORD || word[..12].iter().any(|b| *b != 0) {
        return Err(AbiError::BadAddress);
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Ok(Address::from_bytes(bytes))
}

/// Decode one log of `event` from its topics and data.
pub fn decode_event(
    event: EventName,
    meta: LogMeta,
    topics: &[[u8; 32]],
    data: &[u8],
) -> Result<RawLogRecord, AbiError> {
    let layout = layout(event);
    if topics.len() != 2 {
        return Err(AbiError::TopicCount { expected: 2, got: topics.len() });
    }
    if topics[0] != event_topic(event) {
        return Err(AbiError::WrongEvent(event));
    }
    if data.len() < layout.data_words * WORD {
        return Err(AbiError::ShortData {
            need: layout.data_words * WORD,
            have: data.len(),
        });
    }
    let account = word_to_address(&topics[1])?;
    let amount = word_to_u128(word_at(data, layout.amount_word)?)?;

    Ok(match event {
        EventName::LockCreated => RawLogRecord::LockCreated { meta, user: account, amount },
        EventName::LockClaimed => RawLogRecord::LockClaimed { meta, user: account, payout: amount },
        EventName::TokensPurchased => RawLogRecord::TokensPurchased {
            meta,
            buyer: account,
            amount_of_tokens: amount,
        },
        EventName::TokensSold => RawLogRecord::TokensSold {
            meta,
            seller: account,
            amount_of_tokens: amount,
        },
    })
}

/// Decode the return value of `getUserLocks(address)`: a dynamic array of
/// static lock tuples.
pub fn decode_positions(data: &[u8]) -> Result<Vec<Position>, AbiError> {
    let offset = word_to_usize(word_at(data, 0)?)?;
    if offset % WORD != 0 {
        return Err(AbiError::BadArray("unaligned offset"));
    }
    let base = offset / WORD;
    let len = word_to_usize(word_at(data, base)?)?;
    let needed = len
        .checked_mul(LOCK_TUPLE_WORDS)
        .and_then(|w| w.checked_add(base + 1))
        .and_then(|w| w.checked_mul(WORD))
        .ok_or(AbiError::BadArray("length overflow"))?;
    if data.len() < needed {
        return Err(AbiError::ShortData { need: needed, have: data.len() });
    }

    (0..len)
        .map(|i| {
            let first = base + 1 + i * LOCK_TUPLE_WORDS;
            let amount = word_to_u128(word_at(data, first + LOCK_AMOUNT_WORD)?)?;
            let claimed = match word_to_u128(word_at(data, first + LOCK_CLAIMED_WORD)?)? {
                0 => false,
                1 => true,
                _ => return Err(AbiError::BadArray("bool out of range")),
            };
            Ok(Position { amount, claimed })
        })
        .collect()
}
