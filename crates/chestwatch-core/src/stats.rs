use serde::{Deserialize, Serialize};

use crate::types::{QueryWindow, TokenAmount};

/// One chest owned by an account, as returned by the position query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Locked amount in base units.
    pub amount: u128,
    pub claimed: bool,
}

/// Rolling counters shown next to the activity feed.
///
/// The global figures are exact on-chain counters; the user figures come
/// from a position list and a bounded log window, so `user_* <= global_*`
/// is expected but not guaranteed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub global_locked: TokenAmount,
    pub global_paid_out: TokenAmount,
    pub user_locked: TokenAmount,
    /// False when the position query failed; `user_locked` is then zero.
    pub user_locked_available: bool,
    pub user_paid_out: TokenAmount,
    /// False when the subject's claim logs could not be fetched.
    pub user_paid_out_available: bool,
    /// Block range `user_paid_out` was summed over, if there is a subject.
    pub user_paid_out_window: Option<QueryWindow>,
}

impl Default for AggregateStats {
    fn default() -> Self {
        Self {
            global_locked: TokenAmount::ZERO,
            global_paid_out: TokenAmount::ZERO,
            user_locked: TokenAmount::ZERO,
            user_locked_available: true,
            user_paid_out: TokenAmount::ZERO,
            user_paid_out_available: true,
            user_paid_out_window: None,
        }
    }
}
