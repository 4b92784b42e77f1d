//! chestwatch: recent-activity feed and staking statistics for the chest
//! and swap contracts.
//!
//! Usage:
//!   chestwatch watch [--config <file>] [--rpc <url>] [--account <0x…>] …
//!   chestwatch once  [--config <file>] [--rpc <url>] [--account <0x…>] …
//!
//! `watch` refreshes on a timer and reads commands from stdin: `refresh`,
//! `stake`, `claim`, `swap`, `account <0x…>`, `disconnect`, `quit`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use chestwatch_core::constants::TOKEN_TICKER;
use chestwatch_feed::{
    ActivityPipeline, PublishedState, RefreshHandle, RefreshScheduler, RefreshStatus,
    SessionContext,
};
use chestwatch_rpc::{ChainRpcAdapter, EthRpcClient};

mod commands;
mod config;

use commands::{parse_command, ConsoleCommand};
use config::{ConfigOverrides, WatchConfig};

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "chestwatch",
    version,
    about = "Chest staking activity feed and statistics"
)]
struct Args {
    /// JSON config file; flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh continuously and accept commands on stdin.
    Watch,

    /// Run a single refresh cycle and print the result as JSON.
    Once,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,chestwatch=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => WatchConfig::load(path)?,
        None => WatchConfig::default(),
    };
    config.apply(&args.overrides);
    config.validate().context("invalid configuration")?;

    let client = EthRpcClient::new(
        &config.rpc_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("building HTTP client")?;
    let adapter = ChainRpcAdapter::new(client, config.contracts()?);
    let pipeline = ActivityPipeline::new(Arc::new(adapter), config.windows)
        .with_feed_limit(config.feed_limit);
    let context = config
        .account
        .map(SessionContext::connected)
        .unwrap_or_default();

    info!(
        rpc = %config.rpc_url,
        account = ?config.account,
        feed_lookback = config.windows.feed_lookback,
        payout_lookback = config.windows.payout_lookback,
        "chestwatch starting"
    );

    match args.command {
        Command::Once => run_once(&pipeline, context).await,
        Command::Watch => {
            let interval = Duration::from_secs(config.refresh_interval_secs);
            tokio::task::LocalSet::new()
                .run_until(run_watch(pipeline, interval, context))
                .await
        }
    }
}

async fn run_once(
    pipeline: &ActivityPipeline<ChainRpcAdapter>,
    context: SessionContext,
) -> anyhow::Result<()> {
    let output = pipeline
        .run(&context)
        .await
        .context("refresh cycle failed")?;
    let state = PublishedState::from_output(1, context, output, Utc::now());
    println!(
        "{}",
        serde_json::to_string_pretty(&state).context("serializing state")?
    );
    Ok(())
}

async fn run_watch(
    pipeline: ActivityPipeline<ChainRpcAdapter>,
    interval: Duration,
    context: SessionContext,
) -> anyhow::Result<()> {
    let (scheduler, handle) = RefreshScheduler::new(pipeline, interval, context);
    let scheduler_task = tokio::task::spawn_local(scheduler.run());

    let mut updates = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                report(&state);
            }

            line = lines.next_line(), if stdin_open => {
                match line.context("reading stdin")? {
                    Some(line) => {
                        if !dispatch(&handle, &line) {
                            break;
                        }
                    }
                    None => {
                        debug!("stdin closed; timer refresh only");
                        stdin_open = false;
                    }
                }
            }

            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
        }
    }

    drop(updates);
    drop(handle);
    scheduler_task.await.context("scheduler task panicked")?;
    Ok(())
}

/// Forward one console line to the scheduler. Returns `false` on `quit`.
fn dispatch(handle: &RefreshHandle, line: &str) -> bool {
    let sent = match parse_command(line) {
        Ok(None) => true,
        Ok(Some(ConsoleCommand::Quit)) => return false,
        Ok(Some(ConsoleCommand::Refresh)) => handle.refresh_now(),
        Ok(Some(ConsoleCommand::Completed(action))) => {
            info!(?action, "action completed; refreshing");
            handle.after_action(action)
        }
        Ok(Some(ConsoleCommand::Account(account))) => {
            info!(account = %account.short(), "switching account");
            handle.set_subject(Some(account))
        }
        Ok(Some(ConsoleCommand::Disconnect)) => {
            info!("account disconnected");
            handle.set_subject(None)
        }
        Err(e) => {
            warn!("{e}");
            true
        }
    };
    if !sent {
        warn!("scheduler has stopped");
    }
    sent
}

fn report(state: &PublishedState) {
    match state.status {
        RefreshStatus::Idle => {}
        RefreshStatus::Fetching => debug!(cycle = state.cycle, "refreshing"),
        RefreshStatus::Failed => warn!(
            cycle = state.cycle,
            error = state.last_error.as_deref().unwrap_or("unknown"),
            last_updated = ?state.last_updated,
            "refresh failed; showing stale data"
        ),
        RefreshStatus::Succeeded => {
            let stats = &state.stats;
            info!(
                cycle = state.cycle,
                height = ?state.block_height,
                entries = state.feed.len(),
                degraded = ?state.degraded,
                "total locked {} {TOKEN_TICKER}, total paid out {} {TOKEN_TICKER}",
                stats.global_locked,
                stats.global_paid_out,
            );
            if let Some(subject) = state.subject {
                let locked = if stats.user_locked_available {
                    stats.user_locked.to_string()
                } else {
                    "unavailable".into()
                };
                let paid = if stats.user_paid_out_available {
                    stats.user_paid_out.to_string()
                } else {
                    "unavailable".into()
                };
                info!(
                    account = %subject.short(),
                    window = ?stats.user_paid_out_window.map(|w| w.to_string()),
                    "your locked {locked} {TOKEN_TICKER}, your paid out {paid} {TOKEN_TICKER}"
                );
            }
            for record in &state.feed {
                info!(
                    kind = %record.kind,
                    account = %record.subject.short(),
                    block = record.block_number,
                    tx = %record.transaction_ref,
                    "{} {TOKEN_TICKER}",
                    record.amount
                );
            }
        }
    }
}
