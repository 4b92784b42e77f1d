use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    // ── Parsing ──────────────────────────────────────────────────────────────
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),

    #[error("invalid token amount: {0}")]
    InvalidAmount(String),

    #[error("amount exceeds 128-bit base units")]
    AmountOverflow,

    // ── Configuration ────────────────────────────────────────────────────────
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Failure reported by a chain collaborator (log source, chain client,
/// position query, scalar reads).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Network failure, timeout or a provider-side error; retrying later may succeed.
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// The provider refused the block range or result size; a narrower range may succeed.
    #[error("block range rejected by provider: {0}")]
    RangeTooLarge(String),

    /// The request itself is invalid; retrying the same request will not help.
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// The provider answered with something that could not be decoded.
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }
}
