//! Sponsor configuration for signed authorizations.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Who is expected to submit the transaction carrying the authorization.
///
/// The choice matters for the nonce the tuple is signed over: when the
/// authority submits for itself, the carrying transaction consumes the
/// account nonce before the authorization list is processed, so the tuple
/// must commit to the *next* nonce. A sponsored tuple commits to the
/// current nonce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SponsorMode {
    /// The authority signs and submits its own transaction.
    #[default]
    SelfExecuted,
    /// A specific sponsor account submits on the authority's behalf.
    Sponsored(Address),
    /// Any willing sponsor may submit.
    AnySponsor,
}

impl SponsorMode {
    /// Nonce the authorization must be signed over, given the account's
    /// current transaction count.
    pub fn authorization_nonce(&self, account_nonce: u64) -> u64 {
        match self {
            SponsorMode::SelfExecuted => account_nonce + 1,
            SponsorMode::Sponsored(_) | SponsorMode::AnySponsor => account_nonce,
        }
    }

    pub fn is_sponsored(&self) -> bool {
        !matches!(self, SponsorMode::SelfExecuted)
    }
}
