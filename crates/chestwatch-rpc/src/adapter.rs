use tracing::{debug, warn};

use chestwatch_core::{
    Address, BlockNumber, ContractRole, LogMeta, Position, QueryWindow, RawLogRecord,
    SourceError, TxHash,
};
use chestwatch_feed::{ChainClient, LogQuery, LogSource, PositionQuery, ScalarReads};

use crate::abi::{
    self, address_word, calldata, decode_hex, decode_positions, event_topic, word_at,
    word_to_u128, AbiError,
};
use crate::client::EthRpcClient;
use crate::types::{parse_quantity, quantity, RpcCallRequest, RpcLog, RpcLogFilter};

/// Deployed addresses of the two watched contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub chest: Address,
    pub swap: Address,
}

impl ContractAddresses {
    pub fn for_role(&self, role: ContractRole) -> Address {
        match role {
            ContractRole::Chest => self.chest,
            ContractRole::Swap => self.swap,
        }
    }
}

/// Chain reader backed by an Ethereum JSON-RPC endpoint.
pub struct ChainRpcAdapter {
    client: EthRpcClient,
    contracts: ContractAddresses,
}

impl ChainRpcAdapter {
    pub fn new(client: EthRpcClient, contracts: ContractAddresses) -> Self {
        Self { client, contracts }
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    async fn read_scalar(&self, signature: &str) -> Result<u128, SourceError> {
        let request = RpcCallRequest {
            to: self.contracts.chest.to_hex(),
            data: calldata(signature, &[]),
        };
        let data = self.client.eth_call(&request).await?;
        word_at(&data, 0)
            .and_then(word_to_u128)
            .map_err(|e| SourceError::Decode(format!("{signature}: {e}")))
    }
}

fn log_filter(address: Address, query: &LogQuery, window: QueryWindow) -> RpcLogFilter {
    let mut topics = vec![Some(format!("0x{}", hex::encode(event_topic(query.event))))];
    if let Some(subject) = query.indexed_filter {
        topics.push(Some(format!("0x{}", hex::encode(address_word(&subject)))));
    }
    RpcLogFilter {
        address: address.to_hex(),
        topics,
        from_block: quantity(window.from_block()),
        to_block: quantity(window.to_block()),
    }
}

#[derive(Debug, thiserror::Error)]
enum LogDecodeError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("bad {0}")]
    Bad(&'static str),
    #[error(transparent)]
    Abi(#[from] AbiError),
}

fn topic_bytes(topic: &str) -> Result<[u8; 32], LogDecodeError> {
    let bytes = decode_hex(topic)?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| LogDecodeError::Bad("topic length"))
}

fn decode_log(query: &LogQuery, log: &RpcLog) -> Result<RawLogRecord, LogDecodeError> {
    let block_number: BlockNumber = log
        .block_number
        .as_deref()
        .ok_or(LogDecodeError::Missing("blockNumber"))
        .and_then(|s| parse_quantity(s).ok_or(LogDecodeError::Bad("blockNumber")))?;
    let transaction_hash = log
        .transaction_hash
        .as_deref()
        .ok_or(LogDecodeError::Missing("transactionHash"))
        .and_then(|s| TxHash::from_hex(s).map_err(|_| LogDecodeError::Bad("transactionHash")))?;
    let log_index = match log.log_index.as_deref() {
        Some(s) => parse_quantity(s).ok_or(LogDecodeError::Bad("logIndex"))?,
        None => 0,
    };
    let topics = log
        .topics
        .iter()
        .map(|t| topic_bytes(t))
        .collect::<Result<Vec<_>, _>>()?;
    let data = decode_hex(&log.data)?;

    let meta = LogMeta {
        block_number,
        transaction_hash,
        log_index,
    };
    Ok(abi::decode_event(query.event, meta, &topics, &data)?)
}

impl LogSource for ChainRpcAdapter {
    async fn get_logs(
        &self,
        query: &LogQuery,
        window: QueryWindow,
    ) -> Result<Vec<RawLogRecord>, SourceError> {
        let address = self.contracts.for_role(query.contract);
        let filter = log_filter(address, query, window);
        let logs = self.client.get_logs(&filter).await?;
        debug!(event = %query.event, %window, count = logs.len(), "fetched logs");

        let records = logs
            .iter()
            .filter(|log| !log.removed)
            .filter_map(|log| match decode_log(query, log) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        event = %query.event,
                        tx = log.transaction_hash.as_deref().unwrap_or("?"),
                        error = %e,
                        "dropping undecodable log"
                    );
                    None
                }
            })
            .collect();
        Ok(records)
    }
}

impl ChainClient for ChainRpcAdapter {
    async fn block_height(&self) -> Result<BlockNumber, SourceError> {
        self.client.block_number().await
    }
}

impl PositionQuery for ChainRpcAdapter {
    async fn positions(&self, account: &Address) -> Result<Vec<Position>, SourceError> {
        let request = RpcCallRequest {
            to: self.contracts.chest.to_hex(),
            data: calldata(abi::GET_USER_LOCKS, &[address_word(account)]),
        };
        let data = self.client.eth_call(&request).await?;
        decode_positions(&data).map_err(|e| SourceError::Decode(format!("getUserLocks: {e}")))
    }
}

impl ScalarReads for ChainRpcAdapter {
    async fn global_locked(&self) -> Result<u128, SourceError> {
        self.read_scalar(abi::ACTIVE_LOCKED).await
    }

    async fn global_paid_out(&self) -> Result<u128, SourceError> {
        self.read_scalar(abi::TOTAL_PAID_OUT).await
    }
}
