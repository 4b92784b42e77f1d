//! chestwatch-feed
//!
//! On-chain activity aggregation engine. Each refresh cycle reads the chain
//! height, plans block windows, fans out log and contract reads, normalizes
//! the events into one feed and folds the statistics. The refresh scheduler
//! drives cycles on a timer and on explicit triggers and publishes the
//! result atomically.

pub mod aggregate;
pub mod cycle;
pub mod normalize;
pub mod scheduler;
pub mod source;
pub mod stats;
pub mod window;

pub use aggregate::aggregate;
pub use cycle::{ActivityPipeline, CycleError, CycleOutput, CycleRunner};
pub use normalize::normalize;
pub use scheduler::{
    PublishedState, RefreshHandle, RefreshScheduler, RefreshStatus, RefreshTrigger,
    SessionContext, UserAction,
};
pub use source::{ChainClient, ChainReader, LogQuery, LogSource, PositionQuery, ScalarReads};
pub use stats::{compute_stats, UserActivity};
pub use window::{compute_window, WindowPolicy};
