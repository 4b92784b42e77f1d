//! Refresh cycles against an in-memory chain.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chestwatch_core::{
    ActivityKind, Address, BlockNumber, EventName, LogMeta, Position, QueryWindow, RawLogRecord,
    SourceError, TokenAmount, TxHash,
};
use chestwatch_feed::{
    normalize, ActivityPipeline, ChainClient, CycleError, LogQuery, LogSource, PositionQuery,
    RefreshScheduler, RefreshStatus, ScalarReads, SessionContext, WindowPolicy,
};

const ONE: u128 = 1_000_000_000_000_000_000;
const HEIGHT: BlockNumber = 100_000;

#[derive(Default)]
struct FakeChain {
    height: Option<BlockNumber>,
    totals: Option<(u128, u128)>,
    positions: Option<Vec<Position>>,
    logs: Vec<RawLogRecord>,
    failing: Vec<EventName>,
    /// Reject wider requests with `RangeTooLarge`.
    max_range: Option<u64>,
    /// Return every log of the event, whatever the range.
    ignore_range: bool,
    requests: Mutex<Vec<(EventName, QueryWindow)>>,
}

impl FakeChain {
    fn healthy() -> Self {
        Self {
            height: Some(HEIGHT),
            totals: Some((1_000 * ONE, 400 * ONE)),
            positions: Some(Vec::new()),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<(EventName, QueryWindow)> {
        self.requests.lock().unwrap().clone()
    }
}

impl LogSource for FakeChain {
    async fn get_logs(
        &self,
        query: &LogQuery,
        window: QueryWindow,
    ) -> Result<Vec<RawLogRecord>, SourceError> {
        self.requests.lock().unwrap().push((query.event, window));
        if self.failing.contains(&query.event) {
            return Err(SourceError::Transient("connection reset".into()));
        }
        if self.max_range.is_some_and(|max| window.span() > max) {
            return Err(SourceError::RangeTooLarge("block range too wide".into()));
        }
        Ok(self
            .logs
            .iter()
            .filter(|log| log.event() == query.event)
            .filter(|log| self.ignore_range || window.contains(log.meta().block_number))
            .filter(|log| query.indexed_filter.map_or(true, |s| normalize(log).subject == s))
            .cloned()
            .collect())
    }
}

impl ChainClient for FakeChain {
    async fn block_height(&self) -> Result<BlockNumber, SourceError> {
        self.height
            .ok_or_else(|| SourceError::Transient("node unreachable".into()))
    }
}

impl PositionQuery for FakeChain {
    async fn positions(&self, _account: &Address) -> Result<Vec<Position>, SourceError> {
        self.positions
            .clone()
            .ok_or_else(|| SourceError::Transient("call reverted".into()))
    }
}

impl ScalarReads for FakeChain {
    async fn global_locked(&self) -> Result<u128, SourceError> {
        self.totals
            .map(|t| t.0)
            .ok_or_else(|| SourceError::Transient("timeout".into()))
    }

    async fn global_paid_out(&self) -> Result<u128, SourceError> {
        self.totals
            .map(|t| t.1)
            .ok_or_else(|| SourceError::Transient("timeout".into()))
    }
}

fn meta(block: BlockNumber, tx: u8) -> LogMeta {
    LogMeta {
        block_number: block,
        transaction_hash: TxHash::from_bytes([tx; 32]),
        log_index: 0,
    }
}

fn user(n: u8) -> Address {
    Address::from_bytes([n; 20])
}

fn sample_logs() -> Vec<RawLogRecord> {
    vec![
        RawLogRecord::LockCreated { meta: meta(99_500, 1), user: user(1), amount: 3 * ONE },
        RawLogRecord::LockClaimed { meta: meta(99_900, 2), user: user(2), payout: 5 * ONE },
        RawLogRecord::TokensPurchased {
            meta: meta(99_200, 3),
            buyer: user(3),
            amount_of_tokens: 7 * ONE,
        },
        RawLogRecord::TokensSold { meta: meta(99_700, 4), seller: user(4), amount_of_tokens: ONE },
    ]
}

fn pipeline(chain: FakeChain) -> (Arc<FakeChain>, ActivityPipeline<FakeChain>) {
    let chain = Arc::new(chain);
    let pipeline = ActivityPipeline::new(Arc::clone(&chain), WindowPolicy::default());
    (chain, pipeline)
}

#[tokio::test]
async fn anonymous_cycle_merges_every_kind_newest_first() {
    let (_, pipeline) = pipeline(FakeChain { logs: sample_logs(), ..FakeChain::healthy() });
    let out = pipeline.run(&SessionContext::anonymous()).await.unwrap();

    let blocks: Vec<_> = out.feed.iter().map(|r| r.block_number).collect();
    assert_eq!(blocks, vec![99_900, 99_700, 99_500, 99_200]);
    assert_eq!(out.block_height, HEIGHT);
    assert!(out.degraded.is_empty());
    assert_eq!(out.stats.global_locked, TokenAmount::from_tokens(1_000));
    assert_eq!(out.stats.global_paid_out, TokenAmount::from_tokens(400));
    assert_eq!(out.stats.user_locked, TokenAmount::ZERO);
    assert_eq!(out.stats.user_paid_out, TokenAmount::ZERO);
}

#[tokio::test]
async fn failing_event_query_degrades_only_that_kind() {
    let (_, pipeline) = pipeline(FakeChain {
        logs: sample_logs(),
        failing: vec![EventName::TokensSold],
        ..FakeChain::healthy()
    });
    let out = pipeline.run(&SessionContext::anonymous()).await.unwrap();

    assert_eq!(out.feed.len(), 3);
    assert!(out.feed.iter().all(|r| r.kind != ActivityKind::Sell));
    assert_eq!(out.degraded, vec![EventName::TokensSold]);
}

#[tokio::test]
async fn unreachable_height_fails_the_cycle() {
    let (_, pipeline) = pipeline(FakeChain { height: None, ..FakeChain::healthy() });
    let err = pipeline.run(&SessionContext::anonymous()).await.unwrap_err();
    assert!(matches!(err, CycleError::Height(SourceError::Transient(_))));
}

#[tokio::test]
async fn unreadable_totals_fail_the_cycle() {
    let (_, pipeline) = pipeline(FakeChain { totals: None, ..FakeChain::healthy() });
    let err = pipeline.run(&SessionContext::anonymous()).await.unwrap_err();
    assert!(matches!(err, CycleError::Totals(_)));
}

#[tokio::test]
async fn rejected_ranges_are_bisected_until_accepted() {
    let (chain, pipeline) = pipeline(FakeChain {
        logs: sample_logs(),
        max_range: Some(300),
        ..FakeChain::healthy()
    });
    let out = pipeline.run(&SessionContext::anonymous()).await.unwrap();

    assert_eq!(out.feed.len(), 4);
    assert!(out.degraded.is_empty());
    let requests = chain.requests();
    assert!(requests.iter().any(|(_, w)| w.span() > 300));
    // accepted pieces of one event tile the feed window
    let mut accepted: Vec<_> = requests
        .iter()
        .filter(|(e, w)| *e == EventName::LockCreated && w.span() <= 300)
        .map(|(_, w)| *w)
        .collect();
    accepted.sort_by_key(|w| w.from_block());
    assert_eq!(accepted.first().map(|w| w.from_block()), Some(HEIGHT - 1_000));
    assert_eq!(accepted.last().map(|w| w.to_block()), Some(HEIGHT));
    assert!(accepted.windows(2).all(|p| p[0].to_block() + 1 == p[1].from_block()));
}

#[tokio::test]
async fn logs_outside_the_requested_range_are_dropped() {
    let mut logs = sample_logs();
    logs.push(RawLogRecord::LockCreated { meta: meta(10, 9), user: user(9), amount: ONE });
    let (_, pipeline) = pipeline(FakeChain {
        logs,
        ignore_range: true,
        ..FakeChain::healthy()
    });
    let out = pipeline.run(&SessionContext::anonymous()).await.unwrap();

    assert_eq!(out.feed.len(), 4);
    assert!(out.feed.iter().all(|r| r.block_number >= HEIGHT - 1_000));
}

#[tokio::test]
async fn subject_stats_use_positions_and_payout_window() {
    let me = user(1);
    let mut logs = sample_logs();
    // older than the feed window, inside the payout window
    logs.push(RawLogRecord::LockClaimed { meta: meta(60_000, 20), user: me, payout: 2 * ONE });
    logs.push(RawLogRecord::LockClaimed { meta: meta(99_950, 21), user: me, payout: 3 * ONE });
    // beyond the payout window
    logs.push(RawLogRecord::LockClaimed { meta: meta(40_000, 22), user: me, payout: 50 * ONE });
    let (_, pipeline) = pipeline(FakeChain {
        logs,
        positions: Some(vec![
            Position { amount: 4 * ONE, claimed: false },
            Position { amount: 6 * ONE, claimed: true },
        ]),
        ..FakeChain::healthy()
    });
    let out = pipeline.run(&SessionContext::connected(me)).await.unwrap();

    assert_eq!(out.stats.user_locked, TokenAmount::from_tokens(4));
    assert_eq!(out.stats.user_paid_out, TokenAmount::from_tokens(5));
    assert!(out.stats.user_locked_available);
    assert_eq!(
        out.stats.user_paid_out_window.map(|w| (w.from_block(), w.to_block())),
        Some((HEIGHT - 50_000, HEIGHT))
    );
    assert!(out.feed.iter().all(|r| r.block_number >= HEIGHT - 1_000));
}

#[tokio::test]
async fn failed_position_query_keeps_global_stats() {
    let (_, pipeline) = pipeline(FakeChain {
        logs: sample_logs(),
        positions: None,
        ..FakeChain::healthy()
    });
    let out = pipeline.run(&SessionContext::connected(user(1))).await.unwrap();

    assert!(!out.stats.user_locked_available);
    assert_eq!(out.stats.user_locked, TokenAmount::ZERO);
    assert!(out.stats.user_paid_out_available);
    assert_eq!(out.stats.global_locked, TokenAmount::from_tokens(1_000));
    assert_eq!(out.feed.len(), 4);
}

#[tokio::test]
async fn feed_limit_caps_the_published_feed() {
    let (_, pipeline) = pipeline(FakeChain { logs: sample_logs(), ..FakeChain::healthy() });
    let out = pipeline
        .with_feed_limit(2)
        .run(&SessionContext::anonymous())
        .await
        .unwrap();
    let blocks: Vec<_> = out.feed.iter().map(|r| r.block_number).collect();
    assert_eq!(blocks, vec![99_900, 99_700]);
}

#[tokio::test]
async fn same_block_records_follow_log_index() {
    let at = |index, tx| LogMeta { log_index: index, ..meta(99_800, tx) };
    let logs = vec![
        RawLogRecord::LockCreated { meta: at(1, 31), user: user(1), amount: ONE },
        RawLogRecord::LockCreated { meta: at(7, 32), user: user(2), amount: ONE },
        RawLogRecord::LockCreated { meta: at(3, 33), user: user(3), amount: ONE },
    ];
    let (_, pipeline) = pipeline(FakeChain { logs, ..FakeChain::healthy() });
    let out = pipeline.run(&SessionContext::anonymous()).await.unwrap();

    let txs: Vec<_> = out.feed.iter().map(|r| r.transaction_ref).collect();
    assert_eq!(
        txs,
        vec![
            TxHash::from_bytes([32; 32]),
            TxHash::from_bytes([33; 32]),
            TxHash::from_bytes([31; 32]),
        ]
    );
}

#[tokio::test]
async fn scheduler_publishes_pipeline_output() {
    tokio::task::LocalSet::new()
        .run_until(async {
            let (_, pipeline) = pipeline(FakeChain { logs: sample_logs(), ..FakeChain::healthy() });
            let (scheduler, handle) = RefreshScheduler::new(
                pipeline,
                Duration::from_secs(3600),
                SessionContext::anonymous(),
            );
            tokio::task::spawn_local(scheduler.run());

            let mut rx = handle.subscribe();
            let state = rx
                .wait_for(|s| s.status == RefreshStatus::Succeeded)
                .await
                .unwrap()
                .clone();
            assert_eq!(state.feed.len(), 4);
            assert_eq!(state.block_height, Some(HEIGHT));
            assert!(state.last_updated.is_some());

            let json = serde_json::to_value(&state).unwrap();
            assert_eq!(json["status"], "succeeded");
            assert_eq!(json["stats"]["global_locked"], "1000.0");
        })
        .await;
}
