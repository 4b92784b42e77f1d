//! Range planning.
//!
//! Every window of a cycle is derived from the single height read at the
//! start of that cycle, so blocks arriving mid-cycle never leak into it.

use serde::{Deserialize, Serialize};

use chestwatch_core::constants::{
    DEFAULT_FEED_LOOKBACK_BLOCKS, DEFAULT_MAX_BLOCK_RANGE, DEFAULT_PAYOUT_LOOKBACK_BLOCKS,
};
use chestwatch_core::{BlockNumber, QueryWindow};

/// `[max(0, current_height - lookback), current_height]`.
pub fn compute_window(current_height: BlockNumber, lookback: u64) -> QueryWindow {
    QueryWindow::trailing(current_height, lookback)
}

/// Lookback constants for each call site, kept in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowPolicy {
    /// Recent-activity feed.
    pub feed_lookback: u64,
    /// Subject payout total.
    pub payout_lookback: u64,
    /// Widest range sent to the provider in one request.
    pub max_block_range: u64,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            feed_lookback: DEFAULT_FEED_LOOKBACK_BLOCKS,
            payout_lookback: DEFAULT_PAYOUT_LOOKBACK_BLOCKS,
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
        }
    }
}

impl WindowPolicy {
    pub fn feed_window(&self, current_height: BlockNumber) -> QueryWindow {
        compute_window(current_height, self.feed_lookback)
    }

    pub fn payout_window(&self, current_height: BlockNumber) -> QueryWindow {
        compute_window(current_height, self.payout_lookback)
    }

    /// Provider-sized pieces of `window`, oldest first.
    pub fn request_chunks(&self, window: QueryWindow) -> Vec<QueryWindow> {
        window.chunks(self.max_block_range)
    }
}
