//! Headless EIP-7702 delegation workflows for test networks.
//!
//! This crate drives the full demo lifecycle without any presentation
//! layer: connect a signing identity from a seed phrase or private key,
//! sign an authorization tuple delegating the account to a contract (or to
//! the zero address to revoke), submit the carrying transaction, and track
//! it to settlement.
//!
//! Design notes:
//! - State is explicit. [`Session`] owns the identity,
//!   [`AuthorizationFlow`] owns the single authorization slot and the
//!   submission outcome; every operation takes both and the RPC handle as
//!   arguments. There is no ambient global state.
//! - Every user action is one single-shot async task: no automatic retry,
//!   no cancellation, no background re-signing on network switches. A
//!   tuple stays bound to the chain id it was signed for.
//! - Key material lives in memory only and is never persisted. This is a
//!   testnet demo contract, not production key custody.

pub mod account;
pub mod authorization;
pub mod errors;
pub mod rpc;
pub mod session;
pub mod tx;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use account::{
    snapshot, snapshot_address, AccountSnapshot, AccountWatcher, DelegationStatus,
    DEFAULT_POLL_INTERVAL,
};
pub use authorization::{AuthorizationRequest, REVOCATION_TARGET};
pub use errors::{FlowError, RpcError};
pub use rpc::{EthereumRpc, HttpRpc, TransactionReceipt};
pub use session::{Credential, Session, SigningIdentity};
pub use workflow::{
    AuthorizationFlow, FailureStage, FlowState, Settlement, SubmissionState, SubmitOptions,
};

/// The signed tuple type, re-exported from alloy for downstream callers.
pub use alloy_eips::eip7702::SignedAuthorization;

pub use delegator_types::{known_networks, Network, SponsorMode, SubmissionRecord};
