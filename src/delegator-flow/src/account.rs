//! Read-only account state: nonce, code, and the decoded delegation
//! indicator.
//!
//! Polling here is safe to run alongside a sign/submit cycle since it only
//! reads chain state.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::errors::FlowError;
use crate::rpc::EthereumRpc;
use crate::session::Session;

/// Delegated-code marker per EIP-7702: `0xef0100 || address`.
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];
const DELEGATION_DESIGNATOR_LEN: usize = 23;

/// How often the original demo refetched nonce/code.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// What the code at an address says about its delegation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelegationStatus {
    /// No code: a plain EOA.
    Undelegated,
    /// An EIP-7702 delegation designator pointing at this contract.
    Delegated(Address),
    /// Code that is not a delegation designator (a regular contract, or a
    /// designator of the wrong shape).
    Bytecode,
}

impl DelegationStatus {
    pub fn from_code(code: &[u8]) -> Self {
        if code.is_empty() {
            return DelegationStatus::Undelegated;
        }
        if code.len() == DELEGATION_DESIGNATOR_LEN && code[..3] == DELEGATION_PREFIX {
            return DelegationStatus::Delegated(Address::from_slice(&code[3..]));
        }
        DelegationStatus::Bytecode
    }
}

/// Point-in-time view of an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub address: Address,
    pub nonce: u64,
    pub code: Bytes,
    pub delegation: DelegationStatus,
}

/// Snapshot the session's active identity. `Unauthenticated` without one.
pub async fn snapshot<R>(rpc: &R, session: &Session) -> Result<AccountSnapshot, FlowError>
where
    R: EthereumRpc + Sync + ?Sized,
{
    let identity = session.require_identity()?;
    snapshot_address(rpc, identity.address()).await
}

/// Snapshot an arbitrary address.
pub async fn snapshot_address<R>(rpc: &R, address: Address) -> Result<AccountSnapshot, FlowError>
where
    R: EthereumRpc + Sync + ?Sized,
{
    let nonce = rpc.transaction_count(address).await?;
    let code = rpc.code_at(address).await?;
    let delegation = DelegationStatus::from_code(&code);
    Ok(AccountSnapshot {
        address,
        nonce,
        code,
        delegation,
    })
}

/// Fixed-interval poller for one address.
///
/// Transient poll failures keep the last good snapshot; the watcher never
/// retries early or backs off, it just waits for the next tick. Dropping
/// the watcher stops the task.
pub struct AccountWatcher {
    receiver: watch::Receiver<Option<AccountSnapshot>>,
    handle: JoinHandle<()>,
}

impl AccountWatcher {
    pub fn spawn<R>(rpc: Arc<R>, address: Address, interval: Duration) -> Self
    where
        R: EthereumRpc + Send + Sync + 'static,
    {
        let (sender, receiver) = watch::channel(None);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match snapshot_address(rpc.as_ref(), address).await {
                    Ok(snapshot) => {
                        if sender.send(Some(snapshot)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!(%address, %err, "account poll failed, keeping last snapshot");
                    }
                }
            }
        });
        Self { receiver, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AccountSnapshot>> {
        self.receiver.clone()
    }

    pub fn latest(&self) -> Option<AccountSnapshot> {
        self.receiver.borrow().clone()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for AccountWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
