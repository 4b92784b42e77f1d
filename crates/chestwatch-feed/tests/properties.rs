use std::collections::HashSet;

use chestwatch_core::{ActivityKind, ActivityRecord, Address, QueryWindow, TokenAmount, TxHash};
use chestwatch_feed::{aggregate, compute_window};
use proptest::prelude::*;

// few distinct hashes and blocks so duplicates and ties are common
prop_compose! {
    fn record()(
        kind in prop_oneof![
            Just(ActivityKind::Lock),
            Just(ActivityKind::Claim),
            Just(ActivityKind::Buy),
            Just(ActivityKind::Sell),
        ],
        tx in 0u8..8,
        subject in 0u8..4,
        block in 0u64..20,
        tokens in 0u64..1_000,
    ) -> ActivityRecord {
        ActivityRecord {
            kind,
            subject: Address::from_bytes([subject; 20]),
            amount: TokenAmount::from_tokens(tokens),
            block_number: block,
            transaction_ref: TxHash::from_bytes([tx; 32]),
        }
    }
}

fn batches() -> impl Strategy<Value = Vec<Vec<ActivityRecord>>> {
    prop::collection::vec(prop::collection::vec(record(), 0..12), 0..5)
}

proptest! {
    #[test]
    fn aggregate_is_deterministic(input in batches(), limit in 0usize..40) {
        prop_assert_eq!(aggregate(input.clone(), limit), aggregate(input, limit));
    }

    #[test]
    fn aggregate_of_own_output_is_unchanged(input in batches(), limit in 0usize..40) {
        let once = aggregate(input, limit);
        let twice = aggregate(vec![once.clone()], limit);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn feed_has_no_duplicate_keys(input in batches()) {
        let feed = aggregate(input, usize::MAX);
        let keys: HashSet<_> = feed.iter().map(|r| (r.transaction_ref, r.kind)).collect();
        prop_assert_eq!(keys.len(), feed.len());
    }

    #[test]
    fn feed_is_newest_first(input in batches(), limit in 0usize..40) {
        let feed = aggregate(input, limit);
        prop_assert!(feed.windows(2).all(|w| w[0].block_number >= w[1].block_number));
    }

    #[test]
    fn feed_length_is_min_of_limit_and_distinct(input in batches(), limit in 0usize..40) {
        let distinct: HashSet<_> = input
            .iter()
            .flatten()
            .map(|r| (r.transaction_ref, r.kind))
            .collect();
        let feed = aggregate(input, limit);
        prop_assert_eq!(feed.len(), distinct.len().min(limit));
    }

    #[test]
    fn window_ends_at_height_and_respects_lookback(height in any::<u64>(), lookback in 0u64..1_000_000) {
        let w = compute_window(height, lookback);
        prop_assert!(w.from_block() <= w.to_block());
        prop_assert_eq!(w.to_block(), height);
        prop_assert!(w.to_block() - w.from_block() <= lookback);
    }

    #[test]
    fn chunks_tile_the_window(from in 0u64..100_000, len in 0u64..50_000, max_span in 1u64..20_000) {
        let window = QueryWindow::new(from, from + len).unwrap();
        let chunks = window.chunks(max_span);
        prop_assert_eq!(chunks.first().map(|c| c.from_block()), Some(window.from_block()));
        prop_assert_eq!(chunks.last().map(|c| c.to_block()), Some(window.to_block()));
        prop_assert!(chunks.iter().all(|c| c.span() <= max_span));
        prop_assert!(chunks.windows(2).all(|w| w[0].to_block() + 1 == w[1].from_block()));
    }
}
