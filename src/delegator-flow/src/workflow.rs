//! The authorization workflow controller.
//!
//! Drives one delegation cycle per the lifecycle:
//!
//! ```text
//! NoIdentity --connect--> Idle --sign--> Signed --submit--> Pending --receipt--> Settled
//! ```
//!
//! State is explicit: the flow owns the single authorization slot and the
//! submission outcome, the session is passed into every operation, and the
//! chain is fixed when the flow is constructed. The slot has
//! last-writer-wins semantics; signing again (including a revoke)
//! supersedes the prior tuple and resets the submission outcome. Nothing
//! retries automatically and failures never leave a partially mutated flow.

use std::time::Duration;

use alloy_eips::eip7702::SignedAuthorization;
use alloy_primitives::{Address, B256, U256};
use delegator_types::{Network, SponsorMode};

use crate::authorization::{self, REVOCATION_TARGET};
use crate::errors::FlowError;
use crate::rpc::EthereumRpc;
use crate::session::Session;
use crate::tx;

/// Knobs for `submit` / `wait_for_settlement`.
#[derive(Clone, Copy, Debug)]
pub struct SubmitOptions {
    /// Gas limit override; defaults to the intrinsic-cost-derived limit.
    pub gas_limit: Option<u64>,
    pub receipt_poll_interval: Duration,
    pub receipt_attempts: u32,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            gas_limit: None,
            receipt_poll_interval: Duration::from_secs(2),
            receipt_attempts: 60,
        }
    }
}

/// Observable workflow state, per authorization cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowState {
    NoIdentity,
    Idle,
    Signed,
    Submitting,
    Pending,
    Settled,
}

/// Where a failed submission attempt failed. The two stages are
/// independent network calls and are reported apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureStage {
    Submit,
    AwaitReceipt,
}

/// The settled outcome of a submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub hash: B256,
    pub success: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

/// Progress of the current submission cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Pending { hash: B256 },
    Settled(Settlement),
    /// The attempt failed; the signed tuple is retained and may be
    /// resubmitted by a fresh user action.
    Failed { stage: FailureStage, reason: String },
}

/// Controller for one network's delegation cycle.
pub struct AuthorizationFlow {
    network: Network,
    sponsor: SponsorMode,
    options: SubmitOptions,
    authorization: Option<SignedAuthorization>,
    submission: SubmissionState,
}

impl AuthorizationFlow {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            sponsor: SponsorMode::default(),
            options: SubmitOptions::default(),
            authorization: None,
            submission: SubmissionState::Idle,
        }
    }

    pub fn with_sponsor(mut self, sponsor: SponsorMode) -> Self {
        self.sponsor = sponsor;
        self
    }

    pub fn with_options(mut self, options: SubmitOptions) -> Self {
        self.options = options;
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Pre-filled delegation target for this network, if one is known.
    pub fn default_target(&self) -> Option<Address> {
        self.network.delegate
    }

    pub fn current_authorization(&self) -> Option<&SignedAuthorization> {
        self.authorization.as_ref()
    }

    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    /// Project the observable state from the slots. Failed submissions
    /// collapse back to `Signed`: the tuple is retained and resubmittable.
    pub fn state(&self, session: &Session) -> FlowState {
        if !session.is_connected() {
            return FlowState::NoIdentity;
        }
        match (&self.authorization, &self.submission) {
            (None, _) => FlowState::Idle,
            (Some(_), SubmissionState::Idle | SubmissionState::Failed { .. }) => FlowState::Signed,
            (Some(_), SubmissionState::Submitting) => FlowState::Submitting,
            (Some(_), SubmissionState::Pending { .. }) => FlowState::Pending,
            (Some(_), SubmissionState::Settled(_)) => FlowState::Settled,
        }
    }

    /// Sign a delegation to `target` and make it the current tuple.
    ///
    /// Replaces any prior tuple and resets the submission outcome, but only
    /// after the signature fully succeeds; on any failure the slot is left
    /// exactly as it was.
    pub async fn sign_authorization<R>(
        &mut self,
        session: &Session,
        rpc: &R,
        target: Address,
    ) -> Result<&SignedAuthorization, FlowError>
    where
        R: EthereumRpc + Sync + ?Sized,
    {
        let identity = session.require_identity()?;
        let request = authorization::build_request(
            rpc,
            self.network.chain_id,
            identity.address(),
            target,
            &self.sponsor,
        )
        .await?;
        let signed = request.sign(identity)?;
        tracing::info!(
            %target,
            nonce = request.nonce,
            chain_id = request.chain_id,
            revocation = request.is_revocation(),
            "authorization signed"
        );
        self.submission = SubmissionState::Idle;
        Ok(self.authorization.insert(signed))
    }

    /// Sign a revocation: a delegation to the zero address.
    pub async fn revoke<R>(
        &mut self,
        session: &Session,
        rpc: &R,
    ) -> Result<&SignedAuthorization, FlowError>
    where
        R: EthereumRpc + Sync + ?Sized,
    {
        self.sign_authorization(session, rpc, REVOCATION_TARGET).await
    }

    /// Submit the carrying transaction for the current tuple.
    ///
    /// Preconditions are checked before any network call: an active
    /// identity, a signed tuple, and a tuple bound to this flow's chain.
    pub async fn submit<R>(&mut self, session: &Session, rpc: &R) -> Result<B256, FlowError>
    where
        R: EthereumRpc + Sync + ?Sized,
    {
        session.require_identity()?;
        let authorization = self
            .authorization
            .clone()
            .ok_or(FlowError::MissingAuthorization)?;

        let signed_chain = authorization.chain_id;
        if !signed_chain.is_zero() && signed_chain != U256::from(self.network.chain_id) {
            return Err(FlowError::ChainMismatch {
                signed: signed_chain,
                network: self.network.chain_id,
            });
        }

        self.submission = SubmissionState::Submitting;
        match self.send_carrying_tx(session, rpc, authorization).await {
            Ok(hash) => {
                tracing::info!(%hash, "transaction submitted");
                self.submission = SubmissionState::Pending { hash };
                Ok(hash)
            }
            Err(err) => {
                tracing::warn!(%err, "submission failed");
                self.submission = SubmissionState::Failed {
                    stage: FailureStage::Submit,
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }

    async fn send_carrying_tx<R>(
        &self,
        session: &Session,
        rpc: &R,
        authorization: SignedAuthorization,
    ) -> Result<B256, FlowError>
    where
        R: EthereumRpc + Sync + ?Sized,
    {
        let identity = session.require_identity()?;
        let account_nonce = rpc.transaction_count(identity.address()).await?;
        let fees = tx::estimate_fees(rpc).await?;
        let gas_limit = self
            .options
            .gas_limit
            .unwrap_or_else(|| tx::default_gas_limit(1));

        let unsigned = tx::build_delegation_tx(
            self.network.chain_id,
            identity.address(),
            account_nonce,
            gas_limit,
            &fees,
            authorization,
        );
        let raw = tx::sign_and_encode(unsigned, identity)?;
        rpc.send_raw_transaction(raw)
            .await
            .map_err(FlowError::SubmissionFailed)
    }

    /// Poll for the receipt of the pending submission.
    ///
    /// Polls on a fixed interval up to the configured attempt bound; a
    /// timeout is `ReceiptUnavailable`, distinct from a submit rejection.
    /// A receipt with a failed status still settles the cycle.
    pub async fn wait_for_settlement<R>(&mut self, rpc: &R) -> Result<Settlement, FlowError>
    where
        R: EthereumRpc + Sync + ?Sized,
    {
        let hash = match &self.submission {
            SubmissionState::Pending { hash } => *hash,
            _ => {
                return Err(FlowError::ReceiptUnavailable(
                    "no submission is pending".to_string(),
                ))
            }
        };

        for attempt in 0..self.options.receipt_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.options.receipt_poll_interval).await;
            }
            match rpc.transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    let settlement = Settlement {
                        hash,
                        success: receipt.succeeded(),
                        gas_used: receipt.gas_used.to::<u64>(),
                        block_number: receipt.block_number.map(|n| n.to::<u64>()),
                    };
                    tracing::info!(
                        %hash,
                        success = settlement.success,
                        gas_used = settlement.gas_used,
                        "transaction settled"
                    );
                    self.submission = SubmissionState::Settled(settlement.clone());
                    return Ok(settlement);
                }
                Ok(None) => {
                    tracing::debug!(%hash, attempt, "receipt not yet available");
                }
                Err(err) => {
                    // Transient endpoint trouble counts against the attempt
                    // bound; the next tick may still find the receipt.
                    tracing::warn!(%hash, %err, "receipt query failed");
                }
            }
        }

        let reason = format!(
            "no receipt for {hash} after {} attempts",
            self.options.receipt_attempts
        );
        self.submission = SubmissionState::Failed {
            stage: FailureStage::AwaitReceipt,
            reason: reason.clone(),
        };
        Err(FlowError::ReceiptUnavailable(reason))
    }

    /// The one-shot submit action: send, then wait for the receipt.
    pub async fn submit_and_wait<R>(
        &mut self,
        session: &Session,
        rpc: &R,
    ) -> Result<Settlement, FlowError>
    where
        R: EthereumRpc + Sync + ?Sized,
    {
        self.submit(session, rpc).await?;
        self.wait_for_settlement(rpc).await
    }
}
