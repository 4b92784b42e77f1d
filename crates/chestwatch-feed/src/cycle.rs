use std::cmp::Reverse;
use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::{join_all, LocalBoxFuture};
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use chestwatch_core::constants::DEFAULT_FEED_LIMIT;
use chestwatch_core::{
    ActivityRecord, AggregateStats, BlockNumber, EventName, QueryWindow, RawLogRecord,
    SourceError,
};

use crate::aggregate::aggregate;
use crate::normalize::normalize;
use crate::scheduler::SessionContext;
use crate::source::{ChainReader, LogQuery};
use crate::stats::{compute_stats, UserActivity};
use crate::window::WindowPolicy;

/// Failures that abort a whole cycle. Everything else degrades in place.
#[derive(Debug, Clone, Error)]
pub enum CycleError {
    #[error("chain height unavailable: {0}")]
    Height(SourceError),

    #[error("global totals unavailable: {0}")]
    Totals(SourceError),
}

/// Everything one successful cycle produced, computed from a single height.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub block_height: BlockNumber,
    pub feed: Vec<ActivityRecord>,
    pub stats: AggregateStats,
    /// Event kinds whose query failed and contributed nothing this cycle.
    pub degraded: Vec<EventName>,
}

/// Produces one cycle's result for a session. The scheduler owns the
/// returned future and drops it to cancel a superseded cycle.
pub trait CycleRunner {
    fn run_cycle(
        &self,
        context: SessionContext,
    ) -> LocalBoxFuture<'static, Result<CycleOutput, CycleError>>;
}

/// The read/aggregate pipeline over a chain reader.
pub struct ActivityPipeline<S> {
    source: Arc<S>,
    policy: WindowPolicy,
    feed_limit: usize,
}

impl<S> Clone for ActivityPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            policy: self.policy,
            feed_limit: self.feed_limit,
        }
    }
}

impl<S: ChainReader> ActivityPipeline<S> {
    pub fn new(source: Arc<S>, policy: WindowPolicy) -> Self {
        Self {
            source,
            policy,
            feed_limit: DEFAULT_FEED_LIMIT,
        }
    }

    pub fn with_feed_limit(mut self, feed_limit: usize) -> Self {
        self.feed_limit = feed_limit;
        self
    }

    pub fn policy(&self) -> &WindowPolicy {
        &self.policy
    }

    /// Run one refresh cycle for `context`.
    ///
    /// The height read is the only step whose failure is fatal besides the
    /// two global totals; every log query and the position query degrade to
    /// empty/unavailable instead.
    pub async fn run(&self, context: &SessionContext) -> Result<CycleOutput, CycleError> {
        let height = self.source.block_height().await.map_err(CycleError::Height)?;
        let feed_window = self.policy.feed_window(height);
        let payout_window = self.policy.payout_window(height);
        debug!(height, %feed_window, %payout_window, "planned refresh windows");

        let feed_queries = EventName::ALL.map(LogQuery::new);
        let feed_batches = join_all(
            feed_queries
                .iter()
                .map(|query| self.fetch_records(query, feed_window)),
        );
        let totals = async {
            futures::try_join!(self.source.global_locked(), self.source.global_paid_out())
        };
        let positions = async {
            match context.subject() {
                Some(subject) => Some(self.source.positions(subject).await),
                None => None,
            }
        };
        let claims = async {
            match context.subject() {
                Some(subject) => {
                    let query = LogQuery::for_subject(EventName::LockClaimed, *subject);
                    Some(self.fetch_records(&query, payout_window).await)
                }
                None => None,
            }
        };

        let (feed_batches, totals, positions, claims) =
            futures::join!(feed_batches, totals, positions, claims);

        let (global_locked, global_paid_out) = totals.map_err(CycleError::Totals)?;

        let mut degraded = Vec::new();
        let mut batches = Vec::with_capacity(feed_batches.len());
        for (query, batch) in feed_queries.iter().zip(feed_batches) {
            match batch {
                Ok(records) => batches.push(records),
                Err(e) => {
                    warn!(event = %query.event, error = %e, "event query failed; treating as empty");
                    degraded.push(query.event);
                    batches.push(Vec::new());
                }
            }
        }
        let feed = aggregate(batches, self.feed_limit);

        let positions = match positions {
            Some(Ok(list)) => Some(Some(list)),
            Some(Err(e)) => {
                warn!(error = %e, "position query failed; user locked unavailable");
                Some(None)
            }
            None => None,
        };
        let claims = match claims {
            Some(Ok(records)) => Some(Some(records)),
            Some(Err(e)) => {
                warn!(error = %e, "subject claim query failed; user payout unavailable");
                Some(None)
            }
            None => None,
        };

        let user = context.subject().map(|subject| UserActivity {
            subject: *subject,
            positions: positions.as_ref().and_then(|p| p.as_deref()),
            claims: claims.as_ref().and_then(|c| c.as_deref()),
            claims_window: payout_window,
        });
        let stats = compute_stats(global_locked, global_paid_out, user);

        info!(
            height,
            feed = feed.len(),
            degraded = degraded.len(),
            "refresh cycle complete"
        );
        Ok(CycleOutput {
            block_height: height,
            feed,
            stats,
            degraded,
        })
    }

    /// Fetch and normalize every log matching `query` inside `window`,
    /// ordered by `(block, log index)` descending.
    ///
    /// The window is walked in provider-sized chunks, oldest first. A chunk
    /// the provider rejects as too wide is bisected and retried; any other
    /// failure fails the whole query so one cycle never mixes a partial kind
    /// into the feed.
    async fn fetch_records(
        &self,
        query: &LogQuery,
        window: QueryWindow,
    ) -> Result<Vec<ActivityRecord>, SourceError> {
        let mut pending: VecDeque<QueryWindow> = self.policy.request_chunks(window).into();
        let mut logs = Vec::new();
        while let Some(chunk) = pending.pop_front() {
            match self.source.get_logs(query, chunk).await {
                Ok(batch) => logs.extend(in_window(batch, query, chunk)),
                Err(SourceError::RangeTooLarge(reason)) => match chunk.split() {
                    Some((lower, upper)) => {
                        debug!(event = %query.event, %chunk, %reason, "range rejected; bisecting");
                        pending.push_front(upper);
                        pending.push_front(lower);
                    }
                    None => return Err(SourceError::RangeTooLarge(reason)),
                },
                Err(e) => return Err(e),
            }
        }
        // newest first; within a block the later log comes first
        logs.sort_by_key(|log| {
            let meta = log.meta();
            Reverse((meta.block_number, meta.log_index))
        });
        Ok(logs.iter().map(normalize).collect())
    }
}

/// Drop logs a provider returned outside the requested range or for the
/// wrong event.
fn in_window(
    mut logs: Vec<RawLogRecord>,
    query: &LogQuery,
    chunk: QueryWindow,
) -> Vec<RawLogRecord> {
    let before = logs.len();
    logs.retain(|log| log.event() == query.event && chunk.contains(log.meta().block_number));
    if logs.len() != before {
        debug!(
            event = %query.event,
            %chunk,
            dropped = before - logs.len(),
            "discarded logs outside the requested range"
        );
    }
    logs
}

impl<S: ChainReader + 'static> CycleRunner for ActivityPipeline<S> {
    fn run_cycle(
        &self,
        context: SessionContext,
    ) -> LocalBoxFuture<'static, Result<CycleOutput, CycleError>> {
        let pipeline = self.clone();
        async move { pipeline.run(&context).await }.boxed_local()
    }
}
