/// ─── Chestwatch Constants ───────────────────────────────────────────────────
///
/// The staking token has a fixed on-chain decimals value; every amount read
/// from the chain arrives in base units and is scaled by it.

// ── Token ────────────────────────────────────────────────────────────────────

/// On-chain `decimals()` of the staking token.
pub const TOKEN_DECIMALS: u32 = 18;

/// 1 token expressed in base units (10^TOKEN_DECIMALS).
pub const BASE_UNITS_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Display ticker.
pub const TOKEN_TICKER: &str = "SCAI";

// ── Windows ──────────────────────────────────────────────────────────────────

/// Trailing blocks scanned for the recent-activity feed.
pub const DEFAULT_FEED_LOOKBACK_BLOCKS: u64 = 1_000;

/// Trailing blocks scanned for the subject's claim payouts.
pub const DEFAULT_PAYOUT_LOOKBACK_BLOCKS: u64 = 50_000;

/// Largest block span sent in a single `eth_getLogs` request.
/// Public providers commonly reject anything wider.
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 10_000;

// ── Feed / refresh ───────────────────────────────────────────────────────────

/// Records kept in the published feed.
pub const DEFAULT_FEED_LIMIT: usize = 50;

/// Timer-driven refresh period.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Per-request HTTP timeout against the node.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
