//! Scripted RPC endpoint for workflow tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy_primitives::{keccak256, Address, Bytes, B256, U64};
use async_trait::async_trait;

use crate::errors::RpcError;
use crate::rpc::{EthereumRpc, TransactionReceipt};

/// In-memory [`EthereumRpc`] with canned answers and a call log.
///
/// Defaults to a healthy endpoint: nonce 0, empty code, 10 gwei gas price,
/// a 1 gwei tip, accepted submissions, and a successful receipt on the
/// first poll.
pub(crate) struct FakeRpc {
    chain_id: u64,
    nonce: u64,
    code: Bytes,
    gas_price: u128,
    priority_fee: Option<u128>,
    send_error: Option<String>,
    nonce_error: bool,
    /// Receipt polls answered with `None` before the receipt appears;
    /// `usize::MAX` means it never does.
    receipt_after: usize,
    receipt_status: u64,
    receipt_polls: AtomicUsize,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeRpc {
    pub(crate) fn new() -> Self {
        Self {
            chain_id: 17000,
            nonce: 0,
            code: Bytes::new(),
            gas_price: 10_000_000_000,
            priority_fee: Some(1_000_000_000),
            send_error: None,
            nonce_error: false,
            receipt_after: 0,
            receipt_status: 1,
            receipt_polls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    pub(crate) fn with_code(mut self, code: impl Into<Bytes>) -> Self {
        self.code = code.into();
        self
    }

    pub(crate) fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub(crate) fn with_priority_fee(mut self, fee: Option<u128>) -> Self {
        self.priority_fee = fee;
        self
    }

    pub(crate) fn with_send_error(mut self, message: &str) -> Self {
        self.send_error = Some(message.to_string());
        self
    }

    pub(crate) fn with_nonce_error(mut self) -> Self {
        self.nonce_error = true;
        self
    }

    pub(crate) fn with_receipt_after(mut self, polls: usize) -> Self {
        self.receipt_after = polls;
        self
    }

    pub(crate) fn with_receipt_never(mut self) -> Self {
        self.receipt_after = usize::MAX;
        self
    }

    pub(crate) fn with_receipt_status(mut self, status: u64) -> Self {
        self.receipt_status = status;
        self
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("call log lock").clone()
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().expect("call log lock").push(method);
    }
}

#[async_trait]
impl EthereumRpc for FakeRpc {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        self.record("eth_chainId");
        Ok(self.chain_id)
    }

    async fn transaction_count(&self, _address: Address) -> Result<u64, RpcError> {
        self.record("eth_getTransactionCount");
        if self.nonce_error {
            return Err(RpcError::Node {
                code: -32000,
                message: "scripted failure".to_string(),
            });
        }
        Ok(self.nonce)
    }

    async fn code_at(&self, _address: Address) -> Result<Bytes, RpcError> {
        self.record("eth_getCode");
        Ok(self.code.clone())
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        self.record("eth_gasPrice");
        Ok(self.gas_price)
    }

    async fn max_priority_fee_per_gas(&self) -> Result<u128, RpcError> {
        self.record("eth_maxPriorityFeePerGas");
        self.priority_fee.ok_or(RpcError::Node {
            code: -32601,
            message: "method not found".to_string(),
        })
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError> {
        self.record("eth_sendRawTransaction");
        if let Some(message) = &self.send_error {
            return Err(RpcError::Node {
                code: -32000,
                message: message.clone(),
            });
        }
        Ok(keccak256(&raw))
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, RpcError> {
        self.record("eth_getTransactionReceipt");
        let polls = self.receipt_polls.fetch_add(1, Ordering::SeqCst);
        if polls < self.receipt_after {
            return Ok(None);
        }
        Ok(Some(TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(U64::from(123_456u64)),
            gas_used: U64::from(46_000u64),
            status: Some(U64::from(self.receipt_status)),
            logs: Vec::new(),
        }))
    }
}
