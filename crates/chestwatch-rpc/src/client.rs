use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::trace;

use chestwatch_core::{BlockNumber, SourceError};

use crate::abi::decode_hex;
use crate::types::{parse_quantity, RpcCallRequest, RpcLog, RpcLogFilter};

/// Node-reported code for "query returned more than N results" and friends.
const LIMIT_EXCEEDED: i64 = -32005;
const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// Minimal Ethereum JSON-RPC 2.0 client over HTTP POST.
pub struct EthRpcClient {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl EthRpcClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call a JSON-RPC method and return the `result` field.
    async fn call(&self, method: &str, params: Value) -> Result<Value, SourceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id
        });
        trace!(method, id, "rpc request");

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(SourceError::Transient(format!("{method}: HTTP {status}")));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(format!("{method}: parsing RPC response: {e}")))?;

        if let Some(err) = json.get("error") {
            return Err(classify_rpc_error(err));
        }
        if !status.is_success() {
            return Err(SourceError::MalformedQuery(format!("{method}: HTTP {status}")));
        }

        Ok(json["result"].clone())
    }

    pub async fn block_number(&self) -> Result<BlockNumber, SourceError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        result
            .as_str()
            .and_then(parse_quantity)
            .ok_or_else(|| SourceError::Decode(format!("eth_blockNumber: unexpected result {result}")))
    }

    pub async fn get_logs(&self, filter: &RpcLogFilter) -> Result<Vec<RpcLog>, SourceError> {
        let result = self.call("eth_getLogs", json!([filter])).await?;
        serde_json::from_value(result)
            .map_err(|e| SourceError::Decode(format!("eth_getLogs: {e}")))
    }

    /// `eth_call` against the latest block; returns the raw return data.
    pub async fn eth_call(&self, request: &RpcCallRequest) -> Result<Vec<u8>, SourceError> {
        let result = self.call("eth_call", json!([request, "latest"])).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| SourceError::Decode(format!("eth_call: unexpected result {result}")))?;
        decode_hex(hex).map_err(|e| SourceError::Decode(format!("eth_call: {e}")))
    }
}

fn classify_transport(e: &reqwest::Error) -> SourceError {
    if e.is_builder() {
        SourceError::MalformedQuery(e.to_string())
    } else if e.is_decode() {
        SourceError::Decode(e.to_string())
    } else {
        // timeouts, refused connections, resets
        SourceError::Transient(e.to_string())
    }
}

/// Map a JSON-RPC `error` object onto the source error classes. Providers
/// disagree on codes for oversized ranges, so the message is checked too.
pub fn classify_rpc_error(err: &Value) -> SourceError {
    let code = err.get("code").and_then(Value::as_i64);
    let message = err
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let lower = message.to_lowercase();

    let range_hint = ["block range", "range too", "more than", "too many", "limit exceeded"]
        .iter()
        .any(|hint| lower.contains(hint));

    match code {
        Some(LIMIT_EXCEEDED) => SourceError::RangeTooLarge(message),
        _ if range_hint => SourceError::RangeTooLarge(message),
        Some(PARSE_ERROR | INVALID_REQUEST | METHOD_NOT_FOUND | INVALID_PARAMS) => {
            SourceError::MalformedQuery(message)
        }
        _ => SourceError::Transient(message),
    }
}
