//! Error taxonomy for the delegation workflow.
//!
//! Every failure is recovered at the user action that triggered it: the
//! active identity and the current authorization tuple are never mutated on
//! an error path, and nothing here is fatal to the process.

use alloy_primitives::U256;
use thiserror::Error;

/// Errors surfaced by sessions and workflow operations.
#[derive(Debug, Error)]
pub enum FlowError {
    /// An operation that needs a signing identity was called without one.
    #[error("no active signing identity; connect first")]
    Unauthenticated,

    /// The supplied seed phrase or private key could not produce an identity.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The signer rejected or failed to produce a signature.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// `submit` was called with no signed authorization in the slot.
    #[error("no signed authorization to submit")]
    MissingAuthorization,

    /// The current tuple was signed for a different chain than the flow
    /// targets. Never corrected silently; re-sign on the right network.
    #[error("authorization is bound to chain {signed}, flow targets chain {network}")]
    ChainMismatch { signed: U256, network: u64 },

    /// The network rejected the carrying transaction.
    #[error("submission rejected: {0}")]
    SubmissionFailed(#[source] RpcError),

    /// The transaction was accepted but no receipt could be obtained.
    #[error("receipt unavailable: {0}")]
    ReceiptUnavailable(String),

    /// A read against the RPC endpoint failed (nonce, code, fees).
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Errors from the JSON-RPC collaborator.
///
/// Transport problems, node-side rejections, and responses we cannot make
/// sense of are kept apart so callers can report them differently.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("node rejected request: {message} (code {code})")]
    Node { code: i64, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
