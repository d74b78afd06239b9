//! Session and signing-identity management.
//!
//! A session holds at most one in-memory signing identity derived from a
//! seed phrase, a raw private key, or a freshly generated throwaway key.
//! Nothing is ever persisted; this is a testnet demo contract, not key
//! custody. Connect failures leave the previous identity untouched.

use std::fmt;

use alloy_primitives::{Address, PrimitiveSignature, B256, U256};
use coins_bip39::{English, Mnemonic};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::errors::FlowError;

/// BIP-44 path for the first Ethereum account, matching what browser
/// wallets derive for the same phrase.
pub const DERIVATION_PATH: &str = "m/44'/60'/0'/0/0";

/// Key material supplied by the user to open a session.
///
/// Raw strings are zeroized when the credential is dropped.
pub enum Credential {
    /// BIP-39 seed phrase (12-24 words, standard English wordlist).
    Mnemonic(Zeroizing<String>),
    /// 32-byte hex scalar, with or without the `0x` prefix.
    PrivateKey(Zeroizing<String>),
    /// Generate a fresh random key; useful for faucet-funded throwaways.
    Ephemeral,
}

impl Credential {
    pub fn mnemonic(phrase: impl Into<String>) -> Self {
        Credential::Mnemonic(Zeroizing::new(phrase.into()))
    }

    pub fn private_key(key: impl Into<String>) -> Self {
        Credential::PrivateKey(Zeroizing::new(key.into()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Credential::Mnemonic(_) => "Credential::Mnemonic(..)",
            Credential::PrivateKey(_) => "Credential::PrivateKey(..)",
            Credential::Ephemeral => "Credential::Ephemeral",
        })
    }
}

/// A key-derived account able to produce signatures.
///
/// The key lives only in memory for the lifetime of the session.
pub struct SigningIdentity {
    address: Address,
    key: SigningKey,
}

impl SigningIdentity {
    fn from_signing_key(key: SigningKey) -> Self {
        let pubkey = key.verifying_key().to_encoded_point(false);
        // keccak(uncompressed pubkey minus the 0x04 tag), low 20 bytes.
        let address = Address::from_raw_public_key(&pubkey.as_bytes()[1..]);
        Self { address, key }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Recoverable ECDSA over a 32-byte digest.
    ///
    /// k256 returns a low-s signature with the recovery id already adjusted,
    /// which is exactly the parity the authorization tuple carries.
    pub(crate) fn sign_digest(&self, digest: &B256) -> Result<PrimitiveSignature, FlowError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|err| FlowError::SigningFailed(err.to_string()))?;
        let (r, s) = signature.split_bytes();
        Ok(PrimitiveSignature::new(
            U256::from_be_slice(r.as_slice()),
            U256::from_be_slice(s.as_slice()),
            recovery_id.is_y_odd(),
        ))
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of logs.
        f.debug_struct("SigningIdentity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Owner of the currently active signing identity.
#[derive(Debug, Default)]
pub struct Session {
    identity: Option<SigningIdentity>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive an identity from the credential and make it active.
    ///
    /// On failure no state changes: a session that was connected stays
    /// connected to its previous identity.
    pub fn connect(&mut self, credential: Credential) -> Result<Address, FlowError> {
        let identity = match credential {
            Credential::Mnemonic(phrase) => identity_from_mnemonic(&phrase)?,
            Credential::PrivateKey(key) => identity_from_private_key(&key)?,
            Credential::Ephemeral => {
                SigningIdentity::from_signing_key(SigningKey::random(&mut OsRng))
            }
        };
        let address = identity.address();
        tracing::info!(%address, "session connected");
        self.identity = Some(identity);
        Ok(address)
    }

    /// Clear the active identity. Idempotent.
    pub fn disconnect(&mut self) {
        if self.identity.take().is_some() {
            tracing::info!("session disconnected");
        }
    }

    pub fn identity(&self) -> Option<&SigningIdentity> {
        self.identity.as_ref()
    }

    pub fn require_identity(&self) -> Result<&SigningIdentity, FlowError> {
        self.identity.as_ref().ok_or(FlowError::Unauthenticated)
    }

    pub fn is_connected(&self) -> bool {
        self.identity.is_some()
    }
}

fn identity_from_mnemonic(phrase: &str) -> Result<SigningIdentity, FlowError> {
    let phrase = phrase.trim();
    let words = phrase.split_whitespace().count();
    if !(12..=24).contains(&words) {
        return Err(FlowError::InvalidCredential(format!(
            "seed phrase must be 12-24 words, got {words}"
        )));
    }

    let mnemonic = Mnemonic::<English>::new_from_phrase(phrase)
        .map_err(|err| FlowError::InvalidCredential(format!("seed phrase rejected: {err}")))?;
    let derived = mnemonic
        .derive_key(DERIVATION_PATH, None)
        .map_err(|err| FlowError::InvalidCredential(format!("derivation failed: {err}")))?;
    let key: &coins_bip32::prelude::SigningKey = derived.as_ref();
    let key = SigningKey::from_bytes(&key.to_bytes())
        .map_err(|err| FlowError::InvalidCredential(format!("derived key rejected: {err}")))?;
    Ok(SigningIdentity::from_signing_key(key))
}

fn identity_from_private_key(key: &str) -> Result<SigningIdentity, FlowError> {
    let trimmed = key.trim();
    let raw = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = Zeroizing::new(hex::decode(raw).map_err(|err| {
        FlowError::InvalidCredential(format!("private key is not valid hex: {err}"))
    })?);
    if bytes.len() != 32 {
        return Err(FlowError::InvalidCredential(format!(
            "private key must be a 32-byte scalar, got {} bytes",
            bytes.len()
        )));
    }
    let key = SigningKey::from_slice(&bytes).map_err(|err| {
        FlowError::InvalidCredential(format!("not a valid secp256k1 scalar: {err}"))
    })?;
    Ok(SigningIdentity::from_signing_key(key))
}
