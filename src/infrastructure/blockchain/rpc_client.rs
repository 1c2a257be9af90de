//! JSON-RPC client for an EVM node over HTTP

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, B256, U64};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::shared::errors::LedgerError;
use crate::shared::types::{TxHash, TxReceipt};

/// EIP-1193 "user rejected request"
const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Subset of `eth_getTransactionReceipt` we rely on
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<U64>,
    pub gas_used: Option<U64>,
    /// 1 = success, 0 = reverted
    pub status: Option<U64>,
}

impl RpcReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.map(|s| s == U64::from(1u8)).unwrap_or(false)
    }

    pub fn into_receipt(self) -> TxReceipt {
        TxReceipt {
            tx_hash: TxHash(self.transaction_hash),
            block_number: self.block_number.map(|n| n.to::<u64>()),
            gas_used: self.gas_used.map(|g| g.to::<u64>()),
        }
    }
}

/// Parse a JSON-RPC 2.0 response body. A `null` result comes back as `None`.
pub fn decode_response<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, LedgerError> {
    let parsed: RpcResponse<T> = serde_json::from_slice(body).map_err(|e| {
        let raw = String::from_utf8_lossy(body);
        let preview: String = raw.chars().take(200).collect();
        LedgerError::Decode(format!("Failed to parse RPC response: {} (raw: {})", e, preview))
    })?;

    if let Some(error) = parsed.error {
        if error.code == USER_REJECTED_CODE {
            return Err(LedgerError::Rejected(error.message));
        }
        return Err(LedgerError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    Ok(parsed.result)
}

/// Decodes a hexadecimal string response from an `eth_call`.
fn decode_hex(encoded: &str) -> Result<Vec<u8>, LedgerError> {
    let stripped = encoded.strip_prefix("0x").unwrap_or(encoded);
    hex::decode(stripped).map_err(|e| LedgerError::Decode(format!("Error decoding hex response: {}", e)))
}

/// Thin JSON-RPC wrapper around a node endpoint
pub struct JsonRpcClient {
    http: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Send one request; `Ok(None)` when the node answered with a null result.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("RPC {} #{} -> {}", method, id, self.url);

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{} request failed: {}", method, e)))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LedgerError::Transport(format!("{} response unreadable: {}", method, e)))?;

        decode_response(&bytes)
    }

    async fn request_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        self.request(method, params)
            .await?
            .ok_or_else(|| LedgerError::Decode(format!("{} returned no result", method)))
    }

    /// `eth_call` against the latest block, returning the raw return data
    pub async fn eth_call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, LedgerError> {
        let call = json!({
            "to": to,
            "data": format!("0x{}", hex::encode(data)),
        });
        let encoded: String = self.request_required("eth_call", json!([call, "latest"])).await?;
        decode_hex(&encoded)
    }

    /// `eth_sendTransaction`; the node or wallet behind it signs for `from`
    pub async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: &[u8],
    ) -> Result<TxHash, LedgerError> {
        let tx = json!({
            "from": from,
            "to": to,
            "data": format!("0x{}", hex::encode(data)),
        });
        let hash: B256 = self
            .request_required("eth_sendTransaction", json!([tx]))
            .await?;
        Ok(TxHash(hash))
    }

    pub async fn get_transaction_receipt(
        &self,
        hash: TxHash,
    ) -> Result<Option<RpcReceipt>, LedgerError> {
        self.request("eth_getTransactionReceipt", json!([hash.0]))
            .await
    }
}
