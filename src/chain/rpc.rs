//! Chain node client.
//!
//! `ChainClient` is the seam the orchestrator depends on; `EthRpcClient`
//! implements it over JSON-RPC with reqwest. Failures are surfaced as
//! `ContracterError::Chain` and are terminal for the current request.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::chain::types::Address;
use crate::types::{ContracterError, Result};

/// Operations the deployment path needs from a chain node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Pending-pool transaction count for `address` (the next usable nonce).
    async fn pending_nonce(&self, address: &Address) -> Result<u64>;

    /// Node-suggested gas price in wei.
    async fn gas_price(&self) -> Result<u128>;

    /// Chain id used for replay protection.
    async fn chain_id(&self) -> Result<u64>;

    /// Broadcast a raw signed transaction; returns the 0x-prefixed tx hash.
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String>;
}

/// JSON-RPC client for an Ethereum-compatible node.
pub struct EthRpcClient {
    endpoint: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl EthRpcClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ContracterError::Chain(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            http,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        debug!("RPC {} -> {}", method, self.endpoint);

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ContracterError::Chain(format!("chain node unreachable: {}", e)))?;

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ContracterError::Chain(format!("invalid RPC response: {}", e)))?;

        if let Some(err) = parsed.error {
            // On-chain rejections (insufficient funds, nonce collision)
            // arrive here and must stay distinguishable from local errors.
            return Err(ContracterError::Chain(format!(
                "{} rejected ({}): {}",
                method, err.code, err.message
            )));
        }

        parsed
            .result
            .ok_or_else(|| ContracterError::Chain(format!("{} returned no result", method)))
    }

    async fn call_quantity(&self, method: &str, params: Value) -> Result<u128> {
        let result = self.call(method, params).await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| ContracterError::Chain(format!("{} result is not a string", method)))?;
        parse_quantity(hex_str)
            .ok_or_else(|| ContracterError::Chain(format!("{} returned bad quantity", method)))
    }
}

#[async_trait]
impl ChainClient for EthRpcClient {
    async fn pending_nonce(&self, address: &Address) -> Result<u64> {
        let value = self
            .call_quantity(
                "eth_getTransactionCount",
                json!([address.to_string(), "pending"]),
            )
            .await?;
        Ok(value as u64)
    }

    async fn gas_price(&self) -> Result<u128> {
        self.call_quantity("eth_gasPrice", json!([])).await
    }

    async fn chain_id(&self) -> Result<u64> {
        let value = self.call_quantity("eth_chainId", json!([])).await?;
        Ok(value as u64)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String> {
        let raw_hex = format!("0x{}", hex::encode(raw));
        let result = self
            .call("eth_sendRawTransaction", json!([raw_hex]))
            .await?;
        result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ContracterError::Chain("tx hash missing from response".into()))
    }
}

/// Parse a JSON-RPC hex quantity ("0x1a") into an integer.
fn parse_quantity(value: &str) -> Option<u128> {
    let hex_part = value.strip_prefix("0x")?;
    if hex_part.is_empty() {
        return None;
    }
    u128::from_str_radix(hex_part, 16).ok()
}
