//! reqwest-backed JSON-RPC client.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::errors::RpcError;
use crate::rpc::types::{JsonRpcRequest, JsonRpcResponse};
use crate::rpc::{EthereumRpc, TransactionReceipt};

/// HTTP JSON-RPC endpoint.
///
/// One instance per endpoint; cheap to share behind an `Arc`. Request ids
/// are only for correlating logs, the client never pipelines.
pub struct HttpRpc {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One call; `Ok(None)` when the node answered with a null result
    /// (e.g. an unmined transaction's receipt).
    async fn call<T: DeserializeOwned + Default>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        tracing::debug!(method, id, "rpc request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .json::<JsonRpcResponse<T>>()
            .await?;

        if let Some(error) = response.error {
            tracing::debug!(method, id, code = error.code, "rpc error response");
            return Err(RpcError::Node {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result)
    }

    /// Like [`Self::call`] but a null result is a protocol violation.
    async fn call_required<T: DeserializeOwned + Default>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        self.call(method, params).await?.ok_or_else(|| {
            RpcError::MalformedResponse(format!("`{method}` returned neither result nor error"))
        })
    }
}

#[async_trait]
impl EthereumRpc for HttpRpc {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        let chain_id: U64 = self.call_required("eth_chainId", json!([])).await?;
        Ok(chain_id.to::<u64>())
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError> {
        let nonce: U64 = self
            .call_required("eth_getTransactionCount", json!([address, "latest"]))
            .await?;
        Ok(nonce.to::<u64>())
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError> {
        self.call_required("eth_getCode", json!([address, "latest"]))
            .await
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        let price: U256 = self.call_required("eth_gasPrice", json!([])).await?;
        u128::try_from(price)
            .map_err(|_| RpcError::MalformedResponse("gas price exceeds u128".to_string()))
    }

    async fn max_priority_fee_per_gas(&self) -> Result<u128, RpcError> {
        let fee: U256 = self
            .call_required("eth_maxPriorityFeePerGas", json!([]))
            .await?;
        u128::try_from(fee)
            .map_err(|_| RpcError::MalformedResponse("priority fee exceeds u128".to_string()))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError> {
        self.call_required("eth_sendRawTransaction", json!([raw]))
            .await
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.call("eth_getTransactionReceipt", json!([hash])).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_envelope_serializes_to_jsonrpc_two() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "eth_getTransactionCount",
            params: json!([Address::ZERO, "latest"]),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "eth_getTransactionCount");
        assert_eq!(
            value["params"][0],
            "0x0000000000000000000000000000000000000000"
        );
        assert_eq!(value["params"][1], "latest");
    }
}
