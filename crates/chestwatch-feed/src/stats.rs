use chestwatch_core::{
    ActivityKind, ActivityRecord, Address, AggregateStats, Position, QueryWindow, TokenAmount,
};

/// Per-subject inputs of a stats computation. `None` for `positions` or
/// `claims` means that fetch failed this cycle.
#[derive(Debug, Clone, Copy)]
pub struct UserActivity<'a> {
    pub subject: Address,
    pub positions: Option<&'a [Position]>,
    pub claims: Option<&'a [ActivityRecord]>,
    /// Range the claim records were collected from.
    pub claims_window: QueryWindow,
}

/// Fold the scalar reads and the subject's positions and claims into the
/// published counters. Without a subject the user figures are zero.
pub fn compute_stats(
    global_locked_raw: u128,
    global_paid_out_raw: u128,
    user: Option<UserActivity<'_>>,
) -> AggregateStats {
    let mut stats = AggregateStats {
        global_locked: TokenAmount::from_base_units(global_locked_raw),
        global_paid_out: TokenAmount::from_base_units(global_paid_out_raw),
        ..AggregateStats::default()
    };
    let Some(user) = user else {
        return stats;
    };

    match user.positions {
        Some(positions) => {
            stats.user_locked = positions
                .iter()
                .filter(|p| !p.claimed)
                .map(|p| TokenAmount::from_base_units(p.amount))
                .sum();
        }
        None => stats.user_locked_available = false,
    }

    match user.claims {
        Some(claims) => {
            stats.user_paid_out = claims
                .iter()
                .filter(|r| r.kind == ActivityKind::Claim && r.subject == user.subject)
                .map(|r| r.amount)
                .sum();
            stats.user_paid_out_window = Some(user.claims_window);
        }
        None => stats.user_paid_out_available = false,
    }

    stats
}
