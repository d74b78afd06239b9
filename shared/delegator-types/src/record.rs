//! Submission records written by the CLI.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// One settled submission, as appended to the per-network submissions file.
///
/// The file exists so integration tooling can pick up what the demo did
/// without scraping terminal output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub network: String,
    pub chain_id: u64,
    /// The account that signed the authorization.
    pub authority: Address,
    /// Delegation target; the zero address records a revocation.
    pub delegate: Address,
    pub tx_hash: B256,
    /// "success" or "reverted", from the receipt status flag.
    pub status: String,
    pub gas_used: u64,
    /// RFC-3339, stamped at write time.
    pub submitted_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let record = SubmissionRecord {
            network: "holesky".to_string(),
            chain_id: 17000,
            authority: Address::repeat_byte(0xaa),
            delegate: Address::ZERO,
            tx_hash: B256::repeat_byte(0x42),
            status: "success".to_string(),
            gas_used: 46_000,
            submitted_at: "2025-01-01T00:00:00Z".to_string(),
        };

        let value = serde_json::to_value(&record).expect("record serializes");
        assert_eq!(value["chainId"], 17000);
        assert!(value["txHash"].as_str().is_some());
        assert_eq!(value["status"], "success");
    }
}
