//! Assembly of the type-0x04 transaction that carries an authorization.
//!
//! The demo transaction is the smallest one that can carry an
//! authorization list: a zero-value self-call with empty calldata. Its only
//! effect is having the authorization processed, which flips the account's
//! code indicator.

use alloy_consensus::{SignableTransaction, TxEip7702, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_eips::eip2930::AccessList;
use alloy_eips::eip7702::SignedAuthorization;
use alloy_primitives::{Address, Bytes, U256};

use crate::errors::{FlowError, RpcError};
use crate::rpc::EthereumRpc;
use crate::session::SigningIdentity;

// Intrinsic costs from the protocol.
pub const BASE_TX_GAS: u64 = 21_000;
/// Charged per authorization tuple (EIP-7702 `PER_EMPTY_ACCOUNT_COST`).
pub const PER_AUTH_GAS: u64 = 25_000;
/// Headroom for the delegate's fallback running on the self-call.
pub const EXECUTION_GAS_HEADROOM: u64 = 60_000;

const DEFAULT_PRIORITY_FEE_WEI: u128 = 1_000_000_000; // 1 gwei

/// Default gas limit for a delegation transaction.
pub fn default_gas_limit(authorization_count: u64) -> u64 {
    BASE_TX_GAS + PER_AUTH_GAS * authorization_count + EXECUTION_GAS_HEADROOM
}

/// EIP-1559 fee pair used for the carrying transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Derive fees from the endpoint: double the quoted gas price as the cap,
/// the node's suggested tip when available, 1 gwei otherwise.
pub async fn estimate_fees<R>(rpc: &R) -> Result<FeeEstimate, RpcError>
where
    R: EthereumRpc + Sync + ?Sized,
{
    let gas_price = rpc.gas_price().await?;
    let priority = match rpc.max_priority_fee_per_gas().await {
        Ok(fee) => fee,
        Err(err) => {
            tracing::debug!(%err, "eth_maxPriorityFeePerGas unavailable, using default tip");
            DEFAULT_PRIORITY_FEE_WEI
        }
    };
    let max_fee_per_gas = gas_price.saturating_mul(2);
    Ok(FeeEstimate {
        max_fee_per_gas,
        max_priority_fee_per_gas: priority.min(max_fee_per_gas),
    })
}

/// Build the self-call carrying one authorization tuple.
pub fn build_delegation_tx(
    chain_id: u64,
    sender: Address,
    nonce: u64,
    gas_limit: u64,
    fees: &FeeEstimate,
    authorization: SignedAuthorization,
) -> TxEip7702 {
    TxEip7702 {
        chain_id,
        nonce,
        gas_limit,
        max_fee_per_gas: fees.max_fee_per_gas,
        max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
        to: sender,
        value: U256::ZERO,
        access_list: AccessList::default(),
        authorization_list: vec![authorization],
        input: Bytes::new(),
    }
}

/// Sign the transaction and produce the raw EIP-2718 bytes for
/// `eth_sendRawTransaction`.
pub fn sign_and_encode(tx: TxEip7702, identity: &SigningIdentity) -> Result<Bytes, FlowError> {
    let digest = tx.signature_hash();
    let signature = identity.sign_digest(&digest)?;
    let envelope = TxEnvelope::Eip7702(tx.into_signed(signature));
    Ok(envelope.encoded_2718().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorization::AuthorizationRequest;
    use crate::session::{Credential, Session};
    use crate::testing::FakeRpc;

    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn fees() -> FeeEstimate {
        FeeEstimate {
            max_fee_per_gas: 20_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        }
    }

    fn signed_tuple(session: &Session) -> SignedAuthorization {
        AuthorizationRequest::new(17000, Address::repeat_byte(0x77), 8)
            .sign(session.require_identity().unwrap())
            .unwrap()
    }

    #[test]
    fn default_gas_limit_covers_the_intrinsic_costs() {
        assert_eq!(default_gas_limit(1), 21_000 + 25_000 + 60_000);
        assert!(default_gas_limit(2) > default_gas_limit(1));
    }

    #[test]
    fn delegation_tx_is_a_zero_value_self_call() {
        let mut session = Session::new();
        session
            .connect(Credential::private_key(TEST_PRIVATE_KEY))
            .unwrap();
        let sender = session.require_identity().unwrap().address();

        let tx = build_delegation_tx(17000, sender, 7, default_gas_limit(1), &fees(), signed_tuple(&session));
        assert_eq!(tx.to, sender);
        assert_eq!(tx.value, U256::ZERO);
        assert!(tx.input.is_empty());
        assert_eq!(tx.authorization_list.len(), 1);
        assert_eq!(tx.chain_id, 17000);
        assert_eq!(tx.nonce, 7);
    }

    #[test]
    fn encoded_transaction_is_typed_0x04() {
        let mut session = Session::new();
        session
            .connect(Credential::private_key(TEST_PRIVATE_KEY))
            .unwrap();
        let sender = session.require_identity().unwrap().address();

        let tx = build_delegation_tx(17000, sender, 7, default_gas_limit(1), &fees(), signed_tuple(&session));
        let raw = sign_and_encode(tx, session.require_identity().unwrap()).unwrap();
        assert_eq!(raw[0], 0x04);
        assert!(raw.len() > 100);
    }

    #[tokio::test]
    async fn fee_estimate_doubles_the_gas_price_and_keeps_the_tip() {
        let rpc = FakeRpc::new()
            .with_gas_price(10_000_000_000)
            .with_priority_fee(Some(2_000_000_000));
        let estimate = estimate_fees(&rpc).await.unwrap();
        assert_eq!(estimate.max_fee_per_gas, 20_000_000_000);
        assert_eq!(estimate.max_priority_fee_per_gas, 2_000_000_000);
    }

    #[tokio::test]
    async fn fee_estimate_falls_back_to_a_one_gwei_tip() {
        let rpc = FakeRpc::new()
            .with_gas_price(10_000_000_000)
            .with_priority_fee(None);
        let estimate = estimate_fees(&rpc).await.unwrap();
        assert_eq!(estimate.max_priority_fee_per_gas, DEFAULT_PRIORITY_FEE_WEI);
    }
}
