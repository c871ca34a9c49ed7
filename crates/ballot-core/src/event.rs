//! Append-only record of accepted ballot operations.

use ballot_types::Address;
use serde::{Deserialize, Serialize};

/// One accepted operation, as recorded in the ballot's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BallotEvent {
    Deployed {
        chairperson: Address,
        proposals: usize,
    },
    RightGranted {
        voter: Address,
    },
    Voted {
        voter: Address,
        proposal: usize,
        weight: u64,
    },
    Delegated {
        from: Address,
        /// End of the delegation chain, not necessarily the requested target
        to: Address,
        weight: u64,
        /// Set when the weight went straight into a proposal's count
        proposal: Option<usize>,
    },
}
