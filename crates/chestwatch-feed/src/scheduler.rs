use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::LocalBoxFuture;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use chestwatch_core::{ActivityRecord, Address, AggregateStats, BlockNumber, EventName};

use crate::cycle::{CycleError, CycleOutput, CycleRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    /// No cycle has been started yet.
    Idle,
    Fetching,
    Succeeded,
    Failed,
}

/// On-chain actions whose completion should be reflected immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAction {
    Stake,
    Claim,
    Swap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Timer,
    Manual,
    UserAction(UserAction),
    /// Account connected, switched or disconnected (`None`).
    SubjectChanged(Option<Address>),
}

/// Read-only context a cycle runs under. Replaced as a whole on every
/// subject change, never edited in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionContext {
    subject: Option<Address>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self { subject: None }
    }

    pub fn connected(subject: Address) -> Self {
        Self {
            subject: Some(subject),
        }
    }

    pub fn subject(&self) -> Option<&Address> {
        self.subject.as_ref()
    }
}

/// What consumers see. Feed and stats always come from the same cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedState {
    pub feed: Vec<ActivityRecord>,
    pub stats: AggregateStats,
    /// Completion time of the cycle that produced `feed` and `stats`.
    pub last_updated: Option<DateTime<Utc>>,
    pub status: RefreshStatus,
    /// Sequence number of the most recently started cycle.
    pub cycle: u64,
    pub block_height: Option<BlockNumber>,
    /// Subject the published numbers were computed for.
    pub subject: Option<Address>,
    pub degraded: Vec<EventName>,
    pub last_error: Option<String>,
}

impl PublishedState {
    fn initial(context: SessionContext) -> Self {
        Self {
            feed: Vec::new(),
            stats: AggregateStats::default(),
            last_updated: None,
            status: RefreshStatus::Idle,
            cycle: 0,
            block_height: None,
            subject: context.subject,
            degraded: Vec::new(),
            last_error: None,
        }
    }

    pub fn from_output(
        cycle: u64,
        context: SessionContext,
        output: CycleOutput,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            feed: output.feed,
            stats: output.stats,
            last_updated: Some(completed_at),
            status: RefreshStatus::Succeeded,
            cycle,
            block_height: Some(output.block_height),
            subject: context.subject,
            degraded: output.degraded,
            last_error: None,
        }
    }

    /// The latest cycle failed and the figures shown are from an earlier one.
    pub fn is_stale(&self) -> bool {
        self.status == RefreshStatus::Failed
    }
}

struct InFlight {
    cycle: u64,
    context: SessionContext,
    result: LocalBoxFuture<'static, Result<CycleOutput, CycleError>>,
}

enum Wake {
    Trigger(RefreshTrigger),
    Finished(u64, SessionContext, Result<CycleOutput, CycleError>),
    Closed,
}

/// Drives refresh cycles on a fixed interval and on explicit triggers.
pub struct RefreshScheduler<R> {
    runner: R,
    interval: Duration,
    context: SessionContext,
    triggers: mpsc::UnboundedReceiver<RefreshTrigger>,
    published: watch::Sender<PublishedState>,
    latest_cycle: u64,
}

/// Cloneable control side of a [`RefreshScheduler`]. Dropping every handle
/// stops the scheduler.
#[derive(Clone)]
pub struct RefreshHandle {
    triggers: mpsc::UnboundedSender<RefreshTrigger>,
    state: watch::Receiver<PublishedState>,
}

impl<R: CycleRunner> RefreshScheduler<R> {
    pub fn new(runner: R, interval: Duration, context: SessionContext) -> (Self, RefreshHandle) {
        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PublishedState::initial(context));

        let scheduler = RefreshScheduler {
            runner,
            interval,
            context,
            triggers: trigger_rx,
            published: state_tx,
            latest_cycle: 0,
        };
        let handle = RefreshHandle {
            triggers: trigger_tx,
            state: state_rx,
        };
        (scheduler, handle)
    }

    /// Run the loop until every handle is dropped. The first timer tick fires
    /// immediately. A timer tick never interrupts a running cycle; any other
    /// trigger supersedes it. Cycle futures are not `Send`; run this on a
    /// local task.
    pub async fn run(mut self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight: Option<InFlight> = None;

        info!(
            interval_secs = self.interval.as_secs(),
            subject = ?self.context.subject,
            "refresh scheduler started"
        );

        loop {
            // explicit triggers win over a tick that is due at the same time
            let wake = tokio::select! {
                biased;

                msg = self.triggers.recv() => match msg {
                    Some(trigger) => Wake::Trigger(trigger),
                    None => Wake::Closed,
                },

                (cycle, context, result) = next_result(&mut in_flight) => {
                    Wake::Finished(cycle, context, result)
                }

                _ = ticker.tick() => Wake::Trigger(RefreshTrigger::Timer),
            };

            match wake {
                Wake::Trigger(RefreshTrigger::Timer) if in_flight.is_some() => {
                    debug!("timer tick while a cycle is running; skipped");
                }
                Wake::Trigger(trigger) => {
                    if trigger != RefreshTrigger::Timer {
                        ticker.reset();
                    }
                    if let RefreshTrigger::SubjectChanged(subject) = trigger {
                        self.context = SessionContext { subject };
                    }
                    if let Some(old) = in_flight.take() {
                        debug!(cycle = old.cycle, "superseding in-flight cycle");
                    }
                    in_flight = Some(self.start(trigger));
                }
                Wake::Finished(cycle, context, result) => {
                    in_flight = None;
                    self.publish(cycle, context, result);
                }
                Wake::Closed => break,
            }
        }

        info!("refresh scheduler stopped");
    }

    fn start(&mut self, trigger: RefreshTrigger) -> InFlight {
        self.latest_cycle += 1;
        let cycle = self.latest_cycle;
        let context = self.context;
        self.published.send_modify(|state| {
            state.status = RefreshStatus::Fetching;
            state.cycle = cycle;
        });
        debug!(cycle, ?trigger, "refresh cycle started");
        InFlight {
            cycle,
            context,
            result: self.runner.run_cycle(context),
        }
    }

    fn publish(
        &self,
        cycle: u64,
        context: SessionContext,
        result: Result<CycleOutput, CycleError>,
    ) {
        if cycle != self.latest_cycle {
            debug!(cycle, latest = self.latest_cycle, "discarding stale cycle result");
            return;
        }
        match result {
            Ok(output) => {
                let state = PublishedState::from_output(cycle, context, output, Utc::now());
                self.published.send_replace(state);
            }
            Err(e) => {
                warn!(cycle, error = %e, "refresh cycle failed; keeping previous state");
                self.published.send_modify(|state| {
                    state.status = RefreshStatus::Failed;
                    state.last_error = Some(e.to_string());
                });
            }
        }
    }
}

/// Resolves with the in-flight cycle's result, or never when idle. Dropping
/// this future leaves the cycle parked in `in_flight`.
async fn next_result(
    in_flight: &mut Option<InFlight>,
) -> (u64, SessionContext, Result<CycleOutput, CycleError>) {
    match in_flight {
        Some(running) => {
            let result = (&mut running.result).await;
            (running.cycle, running.context, result)
        }
        None => std::future::pending().await,
    }
}

impl RefreshHandle {
    /// Returns `false` once the scheduler has stopped.
    pub fn trigger(&self, trigger: RefreshTrigger) -> bool {
        self.triggers.send(trigger).is_ok()
    }

    pub fn refresh_now(&self) -> bool {
        self.trigger(RefreshTrigger::Manual)
    }

    pub fn after_action(&self, action: UserAction) -> bool {
        self.trigger(RefreshTrigger::UserAction(action))
    }

    pub fn set_subject(&self, subject: Option<Address>) -> bool {
        self.trigger(RefreshTrigger::SubjectChanged(subject))
    }

    pub fn subscribe(&self) -> watch::Receiver<PublishedState> {
        self.state.clone()
    }

    pub fn current(&self) -> PublishedState {
        self.state.borrow().clone()
    }
}
