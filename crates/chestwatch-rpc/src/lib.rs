//! chestwatch-rpc
//!
//! Ethereum JSON-RPC backed implementation of the chain collaborators the
//! refresh cycle reads from: block height, event logs, the chest's position
//! list and its two global counters.

pub mod abi;
pub mod adapter;
pub mod client;
pub mod types;

pub use adapter::{ChainRpcAdapter, ContractAddresses};
pub use client::EthRpcClient;
