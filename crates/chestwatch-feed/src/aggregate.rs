use std::collections::HashSet;

use chestwatch_core::ActivityRecord;

/// Merge per-source batches into one feed.
///
/// Records repeated across batches (overlapping or retried windows) are
/// collapsed on `(transaction_ref, kind)`, keeping the first occurrence.
/// The result is ordered newest block first; records of the same block keep
/// their input order. At most `limit` records are returned.
pub fn aggregate<I, B>(batches: I, limit: usize) -> Vec<ActivityRecord>
where
    I: IntoIterator<Item = B>,
    B: IntoIterator<Item = ActivityRecord>,
{
    let mut seen = HashSet::new();
    let mut merged: Vec<ActivityRecord> = batches
        .into_iter()
        .flatten()
        .filter(|r| seen.insert((r.transaction_ref, r.kind)))
        .collect();
    // sort_by is stable
    merged.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    merged.truncate(limit);
    merged
}
