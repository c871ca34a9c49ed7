//! Tally and leader computation.

use serde::{Deserialize, Serialize};

use crate::ledger::Proposal;

/// Index of the proposal with the strictly greatest vote count.
///
/// Ties go to the lowest index; with no votes cast this is 0.
pub fn winning_index(proposals: &[Proposal]) -> usize {
    let mut winning = 0;
    let mut best = 0u64;
    for (index, proposal) in proposals.iter().enumerate() {
        if proposal.vote_count > best {
            best = proposal.vote_count;
            winning = index;
        }
    }
    winning
}

/// Point-in-time view of the vote counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub counts: Vec<u64>,
    pub total: u64,
    pub leader: usize,
}

impl Tally {
    pub fn from_proposals(proposals: &[Proposal]) -> Self {
        let counts: Vec<u64> = proposals.iter().map(|p| p.vote_count).collect();
        Self {
            total: counts.iter().sum(),
            leader: winning_index(proposals),
            counts,
        }
    }

    /// True when at least one other proposal shares the leader's count.
    pub fn is_tied(&self) -> bool {
        let Some(&top) = self.counts.get(self.leader) else {
            return false;
        };
        self.counts.iter().filter(|&&c| c == top).count() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_types::ProposalName;

    fn proposals(counts: &[u64]) -> Vec<Proposal> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &vote_count)| Proposal {
                name: format!("Proposal {}", i + 1).parse::<ProposalName>().unwrap(),
                vote_count,
            })
            .collect()
    }

    #[test]
    fn test_no_votes_picks_first() {
        assert_eq!(winning_index(&proposals(&[0, 0, 0])), 0);
        assert_eq!(winning_index(&proposals(&[0])), 0);
    }

    #[test]
    fn test_strict_maximum() {
        assert_eq!(winning_index(&proposals(&[2, 1, 3])), 2);
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        assert_eq!(winning_index(&proposals(&[1, 4, 4, 2])), 1);
    }

    #[test]
    fn test_tally_summary() {
        let tally = Tally::from_proposals(&proposals(&[2, 1, 3]));
        assert_eq!(tally.counts, vec![2, 1, 3]);
        assert_eq!(tally.total, 6);
        assert_eq!(tally.leader, 2);
        assert!(!tally.is_tied());

        let tied = Tally::from_proposals(&proposals(&[0, 0]));
        assert!(tied.is_tied());
    }
}
