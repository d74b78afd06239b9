//! Shared types for the delegator workspace.
//!
//! Everything here is plain data used on both sides of the workflow crate:
//! the network registry consumed when building flows, the sponsor-mode
//! configuration that decides the authorization nonce rule, and the
//! submission-record schema the CLI appends to its per-network JSON file.

pub mod network;
pub mod record;
pub mod sponsor;

pub use network::{known_networks, Network};
pub use record::SubmissionRecord;
pub use sponsor::SponsorMode;
