use std::future::Future;

use chestwatch_core::{
    Address, BlockNumber, ContractRole, EventName, Position, QueryWindow, RawLogRecord,
    SourceError,
};

/// One `getLogs` request: which contract, which event, and optionally the
/// value of the first indexed argument (the acting account for every
/// subscribed event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogQuery {
    pub contract: ContractRole,
    pub event: EventName,
    pub indexed_filter: Option<Address>,
}

impl LogQuery {
    pub fn new(event: EventName) -> Self {
        Self {
            contract: event.contract(),
            event,
            indexed_filter: None,
        }
    }

    pub fn for_subject(event: EventName, subject: Address) -> Self {
        Self {
            indexed_filter: Some(subject),
            ..Self::new(event)
        }
    }
}

/// Historical event logs within a block range.
pub trait LogSource {
    fn get_logs(
        &self,
        query: &LogQuery,
        window: QueryWindow,
    ) -> impl Future<Output = Result<Vec<RawLogRecord>, SourceError>>;
}

pub trait ChainClient {
    fn block_height(&self) -> impl Future<Output = Result<BlockNumber, SourceError>>;
}

/// Chests owned by an account.
pub trait PositionQuery {
    fn positions(
        &self,
        account: &Address,
    ) -> impl Future<Output = Result<Vec<Position>, SourceError>>;
}

/// Point-in-time counters kept by the chest contract, in base units.
pub trait ScalarReads {
    fn global_locked(&self) -> impl Future<Output = Result<u128, SourceError>>;
    fn global_paid_out(&self) -> impl Future<Output = Result<u128, SourceError>>;
}

/// Everything a refresh cycle reads from the chain.
pub trait ChainReader: LogSource + ChainClient + PositionQuery + ScalarReads {}

impl<T> ChainReader for T where T: LogSource + ChainClient + PositionQuery + ScalarReads {}
