use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

use crate::constants::{BASE_UNITS_PER_TOKEN, TOKEN_DECIMALS};
use crate::error::WatchError;

/// Block height. Monotonic within one chain.
pub type BlockNumber = u64;

fn decode_fixed_hex<const N: usize>(s: &str) -> Option<[u8; N]> {
    let body = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if body.len() != N * 2 {
        return None;
    }
    let bytes = hex::decode(body).ok()?;
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Some(arr)
}

// ── Address ──────────────────────────────────────────────────────────────────

/// 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn from_bytes(b: [u8; 20]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lower-case `0x`-prefixed hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Accepts 40 hex digits with or without a `0x` prefix, any case.
    pub fn from_hex(s: &str) -> Result<Self, WatchError> {
        decode_fixed_hex::<20>(s.trim())
            .map(Self)
            .ok_or_else(|| WatchError::InvalidAddress(s.to_string()))
    }

    /// `0x1234…abcd`, the way the activity feed abbreviates accounts.
    pub fn short(&self) -> String {
        let full = self.to_hex();
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ── TxHash ───────────────────────────────────────────────────────────────────

/// 32-byte transaction hash; the opaque unique reference of an activity record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> Result<Self, WatchError> {
        decode_fixed_hex::<32>(s.trim())
            .map(Self)
            .ok_or_else(|| WatchError::InvalidTxHash(s.to_string()))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({}…)", &self.to_hex()[..18])
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TxHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ── TokenAmount ──────────────────────────────────────────────────────────────

/// Exact token amount, stored as base units and rendered with
/// `TOKEN_DECIMALS` fractional digits. Never negative by construction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: TokenAmount = TokenAmount(0);

    pub fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    /// Whole tokens. `u64` keeps the product inside `u128`.
    pub fn from_tokens(tokens: u64) -> Self {
        Self(tokens as u128 * BASE_UNITS_PER_TOKEN)
    }

    pub fn base_units(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: TokenAmount) -> TokenAmount {
        TokenAmount(self.0.saturating_add(other.0))
    }

    /// Human-scaled decimal string, always with a fractional part:
    /// `1000000000000000000` → `"1.0"`, `1` → `"0.000000000000000001"`.
    pub fn to_decimal_string(&self) -> String {
        let whole = self.0 / BASE_UNITS_PER_TOKEN;
        let frac = self.0 % BASE_UNITS_PER_TOKEN;
        let digits = format!("{:0width$}", frac, width = TOKEN_DECIMALS as usize);
        let trimmed = digits.trim_end_matches('0');
        if trimmed.is_empty() {
            format!("{whole}.0")
        } else {
            format!("{whole}.{trimmed}")
        }
    }

    /// Parse a human-scaled decimal such as `"12"` or `"0.25"`.
    pub fn from_decimal_str(s: &str) -> Result<Self, WatchError> {
        let s = s.trim();
        let invalid = || WatchError::InvalidAmount(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > TOKEN_DECIMALS as usize {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: u128 = whole.parse().map_err(|_| WatchError::AmountOverflow)?;
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = TOKEN_DECIMALS as usize);
            padded.parse().map_err(|_| invalid())?
        };
        whole
            .checked_mul(BASE_UNITS_PER_TOKEN)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or(WatchError::AmountOverflow)
    }
}

impl Sum for TokenAmount {
    fn sum<I: Iterator<Item = TokenAmount>>(iter: I) -> Self {
        iter.fold(TokenAmount::ZERO, TokenAmount::saturating_add)
    }
}

impl<'a> Sum<&'a TokenAmount> for TokenAmount {
    fn sum<I: Iterator<Item = &'a TokenAmount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl fmt::Debug for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenAmount({})", self.to_decimal_string())
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        TokenAmount::from_decimal_str(&s).map_err(serde::de::Error::custom)
    }
}

// ── QueryWindow ──────────────────────────────────────────────────────────────

/// Inclusive block range `[from_block, to_block]` with `from_block <= to_block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QueryWindow {
    from_block: BlockNumber,
    to_block: BlockNumber,
}

impl QueryWindow {
    /// `None` when the bounds are inverted.
    pub fn new(from_block: BlockNumber, to_block: BlockNumber) -> Option<Self> {
        (from_block <= to_block).then_some(Self { from_block, to_block })
    }

    /// The `lookback` blocks ending at `to_block`, clamped at genesis.
    pub fn trailing(to_block: BlockNumber, lookback: u64) -> Self {
        Self {
            from_block: to_block.saturating_sub(lookback),
            to_block,
        }
    }

    pub fn from_block(&self) -> BlockNumber {
        self.from_block
    }

    pub fn to_block(&self) -> BlockNumber {
        self.to_block
    }

    /// Number of blocks covered (inclusive on both ends).
    pub fn span(&self) -> u64 {
        (self.to_block - self.from_block).saturating_add(1)
    }

    pub fn contains(&self, block: BlockNumber) -> bool {
        (self.from_block..=self.to_block).contains(&block)
    }

    /// Consecutive sub-windows of at most `max_span` blocks that cover
    /// `self` exactly, oldest first. A `max_span` of zero is treated as one.
    pub fn chunks(&self, max_span: u64) -> Vec<QueryWindow> {
        let step = max_span.max(1);
        let mut out = Vec::with_capacity((self.span() / step).saturating_add(1).min(1024) as usize);
        let mut start = self.from_block;
        loop {
            let end = start.saturating_add(step - 1).min(self.to_block);
            out.push(QueryWindow { from_block: start, to_block: end });
            if end == self.to_block {
                break;
            }
            start = end + 1;
        }
        out
    }

    /// Halve the window; `None` for a single block.
    pub fn split(&self) -> Option<(QueryWindow, QueryWindow)> {
        if self.from_block == self.to_block {
            return None;
        }
        let mid = self.from_block + (self.to_block - self.from_block) / 2;
        Some((
            QueryWindow { from_block: self.from_block, to_block: mid },
            QueryWindow { from_block: mid + 1, to_block: self.to_block },
        ))
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from_block, self.to_block)
    }
}
