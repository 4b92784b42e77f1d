pub mod activity;
pub mod constants;
pub mod error;
pub mod stats;
pub mod types;

pub use activity::*;
pub use constants::*;
pub use error::{SourceError, WatchError};
pub use stats::*;
pub use types::*;
