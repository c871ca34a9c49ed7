//! Transitive vote delegation.
//!
//! A voter who delegates hands their whole weight to another rights-holder.
//! If that rights-holder has itself delegated, the chain is followed until it
//! reaches either a voter who voted directly or one who has not acted yet.

use std::collections::BTreeMap;

use ballot_types::Address;

use crate::error::BallotError;
use crate::ledger::Voter;

/// Where a delegation chain ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The chain ends at a voter who already voted for `proposal`.
    Voted { delegate: Address, proposal: usize },
    /// The chain ends at a voter who has not voted or delegated yet.
    Pending { delegate: Address },
}

impl Resolution {
    pub fn delegate(&self) -> Address {
        match self {
            Resolution::Voted { delegate, .. } | Resolution::Pending { delegate } => *delegate,
        }
    }
}

/// Follow the delegation chain starting at `to` on behalf of `caller`.
///
/// The walk takes at most one hop per registered voter, so it terminates on
/// any state, including one loaded from a tampered file.
///
/// # Errors
/// - [`BallotError::DelegationCycle`] if the chain leads back to `caller` or
///   runs past the hop limit.
/// - [`BallotError::IneligibleDelegate`] if the chain ends at a voter marked
///   as voted with neither a proposal nor a delegate.
pub fn resolve_delegate(
    voters: &BTreeMap<Address, Voter>,
    caller: Address,
    to: Address,
) -> Result<Resolution, BallotError> {
    let max_hops = voters.len();
    let mut current = to;
    let mut hops = 0usize;

    while let Some(next) = voters
        .get(&current)
        .filter(|v| v.voted)
        .and_then(|v| v.delegate)
    {
        if hops >= max_hops {
            return Err(BallotError::DelegationCycle);
        }
        hops += 1;
        current = next;
        if current == caller {
            return Err(BallotError::DelegationCycle);
        }
    }

    let terminal = voters.get(&current).copied().unwrap_or_default();
    if !terminal.voted {
        return Ok(Resolution::Pending { delegate: current });
    }
    match terminal.vote {
        Some(proposal) => Ok(Resolution::Voted { delegate: current, proposal }),
        None => Err(BallotError::IneligibleDelegate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_address(n: u8) -> Address {
        let mut addr = [0u8; 20];
        addr[19] = n;
        Address::from_bytes(addr)
    }

    fn delegated(to: Address) -> Voter {
        Voter { weight: 1, voted: true, vote: None, delegate: Some(to) }
    }

    fn direct(proposal: usize) -> Voter {
        Voter { weight: 1, voted: true, vote: Some(proposal), delegate: None }
    }

    #[test]
    fn test_unknown_target_is_pending() {
        let voters = BTreeMap::new();
        let res = resolve_delegate(&voters, test_address(1), test_address(2)).unwrap();
        assert_eq!(res, Resolution::Pending { delegate: test_address(2) });
    }

    #[test]
    fn test_follows_chain_to_direct_voter() {
        let (alice, bob, charlie, dave) =
            (test_address(1), test_address(2), test_address(3), test_address(4));
        let mut voters = BTreeMap::new();
        voters.insert(bob, delegated(charlie));
        voters.insert(charlie, delegated(dave));
        voters.insert(dave, direct(2));

        let res = resolve_delegate(&voters, alice, bob).unwrap();
        assert_eq!(res, Resolution::Voted { delegate: dave, proposal: 2 });
        assert_eq!(res.delegate(), dave);
    }

    #[test]
    fn test_stops_at_pending_rights_holder() {
        let (alice, bob, charlie) = (test_address(1), test_address(2), test_address(3));
        let mut voters = BTreeMap::new();
        voters.insert(bob, delegated(charlie));
        voters.insert(charlie, Voter { weight: 2, ..Voter::default() });

        let res = resolve_delegate(&voters, alice, bob).unwrap();
        assert_eq!(res, Resolution::Pending { delegate: charlie });
    }

    #[test]
    fn test_cycle_back_to_caller() {
        let (alice, bob) = (test_address(1), test_address(2));
        let mut voters = BTreeMap::new();
        voters.insert(alice, delegated(bob));
        voters.insert(bob, Voter { weight: 2, ..Voter::default() });

        let res = resolve_delegate(&voters, bob, alice);
        assert_eq!(res, Err(BallotError::DelegationCycle));
    }

    #[test]
    fn test_hop_limit_on_corrupt_loop() {
        // bob <-> charlie loop that does not pass through the caller
        let (alice, bob, charlie) = (test_address(1), test_address(2), test_address(3));
        let mut voters = BTreeMap::new();
        voters.insert(bob, delegated(charlie));
        voters.insert(charlie, delegated(bob));

        let res = resolve_delegate(&voters, alice, bob);
        assert_eq!(res, Err(BallotError::DelegationCycle));
    }

    #[test]
    fn test_voted_without_choice_is_ineligible() {
        let (alice, bob) = (test_address(1), test_address(2));
        let mut voters = BTreeMap::new();
        voters.insert(bob, Voter { weight: 1, voted: true, vote: None, delegate: None });

        let res = resolve_delegate(&voters, alice, bob);
        assert_eq!(res, Err(BallotError::IneligibleDelegate));
    }
}
