//! Authorization request building and signing.
//!
//! A request binds {chain id, target contract, nonce} for one signer; the
//! signature is recoverable ECDSA over the EIP-7702 magic digest
//! (`keccak256(0x05 || rlp([chain_id, address, nonce]))`). Revocation is
//! not a special case on the wire: it is an ordinary authorization whose
//! target is the zero address, which the chain interprets as "remove any
//! delegation".

use alloy_eips::eip7702::{Authorization, SignedAuthorization};
use alloy_primitives::{Address, U256};
use delegator_types::SponsorMode;

use crate::errors::FlowError;
use crate::rpc::EthereumRpc;
use crate::session::SigningIdentity;

/// Delegating to this target signals "remove any delegation".
pub const REVOCATION_TARGET: Address = Address::ZERO;

/// An unsigned delegation intent. Ephemeral: built fresh per sign action
/// and discarded once signed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub chain_id: u64,
    pub target: Address,
    pub nonce: u64,
}

impl AuthorizationRequest {
    pub fn new(chain_id: u64, target: Address, nonce: u64) -> Self {
        Self {
            chain_id,
            target,
            nonce,
        }
    }

    pub fn is_revocation(&self) -> bool {
        self.target == REVOCATION_TARGET
    }

    fn to_eip7702(self) -> Authorization {
        Authorization {
            chain_id: U256::from(self.chain_id),
            address: self.target,
            nonce: self.nonce,
        }
    }

    /// Sign the request, producing the authorization tuple.
    ///
    /// Either every field of the result is populated or an error comes
    /// back; a partially populated tuple is never observable.
    pub fn sign(self, identity: &SigningIdentity) -> Result<SignedAuthorization, FlowError> {
        let inner = self.to_eip7702();
        let digest = inner.signature_hash();
        let signature = identity.sign_digest(&digest)?;
        Ok(inner.into_signed(signature))
    }
}

/// Build a request against live chain state.
///
/// The nonce comes from the signer's current transaction count, shifted by
/// the sponsor rule (see [`SponsorMode::authorization_nonce`]).
pub async fn build_request<R>(
    rpc: &R,
    chain_id: u64,
    signer: Address,
    target: Address,
    sponsor: &SponsorMode,
) -> Result<AuthorizationRequest, FlowError>
where
    R: EthereumRpc + Sync + ?Sized,
{
    let account_nonce = rpc.transaction_count(signer).await?;
    let nonce = sponsor.authorization_nonce(account_nonce);
    tracing::debug!(%signer, %target, account_nonce, nonce, "authorization request built");
    Ok(AuthorizationRequest::new(chain_id, target, nonce))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Credential, Session};

    const TEST_PRIVATE_KEY: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn connected_session() -> Session {
        let mut session = Session::new();
        session
            .connect(Credential::private_key(TEST_PRIVATE_KEY))
            .expect("test key connects");
        session
    }

    #[test]
    fn signing_binds_every_field() {
        let session = connected_session();
        let identity = session.require_identity().unwrap();
        let target: Address = "0xABCDEF0000000000000000000000000000000001"
            .parse()
            .unwrap();

        let request = AuthorizationRequest::new(17000, target, 8);
        let signed = request.sign(identity).expect("signing succeeds");

        assert_eq!(signed.address, target);
        assert_eq!(signed.chain_id, U256::from(17000u64));
        assert_eq!(signed.nonce, 8);
        assert_ne!(signed.r(), U256::ZERO);
        assert_ne!(signed.s(), U256::ZERO);
    }

    #[test]
    fn signature_recovers_to_the_signer() {
        let session = connected_session();
        let identity = session.require_identity().unwrap();

        let request = AuthorizationRequest::new(11155111, Address::repeat_byte(0x22), 0);
        let signed = request.sign(identity).unwrap();

        let authority = signed.recover_authority().expect("signature recovers");
        assert_eq!(authority, identity.address());
    }

    #[test]
    fn revocation_is_an_ordinary_authorization_for_the_zero_target() {
        let session = connected_session();
        let identity = session.require_identity().unwrap();

        let request = AuthorizationRequest::new(17000, REVOCATION_TARGET, 3);
        assert!(request.is_revocation());

        let signed = request.sign(identity).unwrap();
        assert_eq!(signed.address, Address::ZERO);
        assert_eq!(signed.nonce, 3);
        assert_eq!(signed.recover_authority().unwrap(), identity.address());
    }

    #[test]
    fn different_requests_produce_different_digests() {
        let a = AuthorizationRequest::new(17000, Address::repeat_byte(0x01), 1).to_eip7702();
        let b = AuthorizationRequest::new(17000, Address::repeat_byte(0x01), 2).to_eip7702();
        let c = AuthorizationRequest::new(17001, Address::repeat_byte(0x01), 1).to_eip7702();
        assert_ne!(a.signature_hash(), b.signature_hash());
        assert_ne!(a.signature_hash(), c.signature_hash());
    }
}
