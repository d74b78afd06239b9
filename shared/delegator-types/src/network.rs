//! Supported test networks and their demo defaults.
//!
//! The delegate address is the reference smart-account contract the demo
//! delegates to when the user does not pick a target themselves. It differs
//! per network but plays the same role everywhere; tooling may override it
//! from a JSON file, so nothing downstream should treat these values as
//! canonical.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// A test network the demo flow can target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub name: String,
    pub chain_id: u64,
    /// Public JSON-RPC endpoint used when the caller does not supply one.
    pub rpc_url: String,
    /// Reference delegate contract for the one-click flow, if deployed.
    pub delegate: Option<Address>,
}

impl Network {
    pub fn holesky() -> Self {
        Self {
            name: "holesky".to_string(),
            chain_id: 17000,
            rpc_url: "https://ethereum-holesky-rpc.publicnode.com".to_string(),
            delegate: Some(address!("7a0b3c241f2dbf1c8254b7b3deb2960bb3a84b3f")),
        }
    }

    pub fn sepolia() -> Self {
        Self {
            name: "sepolia".to_string(),
            chain_id: 11155111,
            rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
            delegate: Some(address!("2f1db95ca7a72b74430370b4e0a05ba51f3e7a91")),
        }
    }

    pub fn base_sepolia() -> Self {
        Self {
            name: "base-sepolia".to_string(),
            chain_id: 84532,
            rpc_url: "https://sepolia.base.org".to_string(),
            delegate: Some(address!("c4b1f9a530fdcac897ad082514cc2cf0d0ab38cd")),
        }
    }

    /// Look a network up by its registry name (case-insensitive).
    pub fn by_name(name: &str) -> Option<Self> {
        let name = name.trim();
        known_networks()
            .into_iter()
            .find(|network| network.name.eq_ignore_ascii_case(name))
    }

    pub fn by_chain_id(chain_id: u64) -> Option<Self> {
        known_networks()
            .into_iter()
            .find(|network| network.chain_id == chain_id)
    }
}

/// Networks the demo knows out of the box.
pub fn known_networks() -> Vec<Network> {
    vec![Network::holesky(), Network::sepolia(), Network::base_sepolia()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        let network = Network::by_name(" Holesky ").expect("holesky is registered");
        assert_eq!(network.chain_id, 17000);
        assert!(Network::by_name("mainnet").is_none());
    }

    #[test]
    fn lookup_by_chain_id() {
        let network = Network::by_chain_id(84532).expect("base sepolia is registered");
        assert_eq!(network.name, "base-sepolia");
        assert!(Network::by_chain_id(1).is_none());
    }

    #[test]
    fn registry_entries_are_complete_and_distinct() {
        let networks = known_networks();
        assert_eq!(networks.len(), 3);
        for network in &networks {
            assert!(network.delegate.is_some(), "{} has no delegate", network.name);
            assert!(network.rpc_url.starts_with("https://"));
        }
        let mut chain_ids: Vec<u64> = networks.iter().map(|n| n.chain_id).collect();
        chain_ids.sort_unstable();
        chain_ids.dedup();
        assert_eq!(chain_ids.len(), 3);

        let mut delegates: Vec<Address> = networks.iter().filter_map(|n| n.delegate).collect();
        delegates.sort_unstable();
        delegates.dedup();
        assert_eq!(delegates.len(), 3, "delegate contracts differ per network");
    }
}
