//! Blockchain RPC collaborator boundary.
//!
//! The workflow only ever talks to the chain through [`EthereumRpc`]; the
//! HTTP implementation lives in [`http`] and tests script the trait with an
//! in-memory fake. Nothing here retries: a failed call is surfaced to the
//! user action that triggered it.

mod http;
mod types;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use crate::errors::RpcError;

pub use http::HttpRpc;
pub use types::{Log, TransactionReceipt};

/// The read/submit surface of a JSON-RPC Ethereum endpoint used by the
/// demo flow.
#[async_trait]
pub trait EthereumRpc {
    async fn chain_id(&self) -> Result<u64, RpcError>;

    /// Current transaction count (nonce) of an account.
    async fn transaction_count(&self, address: Address) -> Result<u64, RpcError>;

    /// Deployed code at an address; empty for a plain EOA.
    async fn code_at(&self, address: Address) -> Result<Bytes, RpcError>;

    async fn gas_price(&self) -> Result<u128, RpcError>;

    /// `eth_maxPriorityFeePerGas`; not served by every endpoint, so
    /// callers fall back to a default when this errors.
    async fn max_priority_fee_per_gas(&self) -> Result<u128, RpcError>;

    /// Submit a signed, EIP-2718-encoded transaction.
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError>;

    /// Receipt for a transaction, or `None` while it is unmined.
    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, RpcError>;
}
