//! The ballot state machine.
//!
//! A [`Ballot`] is created once with its full proposal list. After that only
//! voter records and vote counts change, and only ever forward: rights are
//! granted but never revoked, votes are cast but never retracted.
//!
//! Every operation checks all of its preconditions before touching state, so
//! a rejected call leaves the ballot exactly as it was.

use std::collections::BTreeMap;

use ballot_types::{Address, NamePolicy, ProposalName};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::BallotCommand;
use crate::delegation::{resolve_delegate, Resolution};
use crate::error::{BallotError, VotedContext};
use crate::event::BallotEvent;
use crate::tally::{winning_index, Tally};

/// A registered proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub name: ProposalName,
    pub vote_count: u64,
}

/// Voting record of one identity.
///
/// Unknown identities read as `Voter::default()`: no weight, not voted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Voter {
    /// Accumulated voting power, 0 means no right to vote
    pub weight: u64,
    /// Set once the voter has voted or delegated
    pub voted: bool,
    /// Proposal chosen by a direct vote
    pub vote: Option<usize>,
    /// End of the delegation chain this voter handed their weight to
    pub delegate: Option<Address>,
}

impl Voter {
    pub fn has_right(&self) -> bool {
        self.weight > 0
    }

    pub fn voted_directly(&self) -> bool {
        self.voted && self.delegate.is_none()
    }
}

/// Single-chairperson delegated voting ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    chairperson: Address,
    proposals: Vec<Proposal>,
    voters: BTreeMap<Address, Voter>,
    events: Vec<BallotEvent>,
}

impl Ballot {
    /// Create a ballot with `creator` as chairperson.
    ///
    /// The chairperson starts with a weight of 1.
    pub fn new(names: Vec<ProposalName>, creator: Address) -> Result<Self, BallotError> {
        if names.is_empty() {
            return Err(BallotError::NoProposals);
        }

        let proposals: Vec<Proposal> = names
            .into_iter()
            .map(|name| Proposal { name, vote_count: 0 })
            .collect();

        let mut voters = BTreeMap::new();
        voters.insert(creator, Voter { weight: 1, ..Voter::default() });

        let events = vec![BallotEvent::Deployed {
            chairperson: creator,
            proposals: proposals.len(),
        }];

        debug!(chairperson = %creator, proposals = proposals.len(), "ballot created");

        Ok(Self { chairperson: creator, proposals, voters, events })
    }

    /// Create a ballot from display strings, applying `policy` to long names.
    pub fn from_names<I, S>(names: I, creator: Address, policy: NamePolicy) -> Result<Self, BallotError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| ProposalName::new(n.as_ref(), policy))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(names, creator)
    }

    /// Give `target` the right to vote. Only the chairperson may call this.
    ///
    /// # Errors
    /// - [`BallotError::Unauthorized`] if `caller` is not the chairperson
    /// - [`BallotError::AlreadyVoted`] if `target` already voted or delegated
    /// - [`BallotError::AlreadyHasRights`] if `target` already has weight
    pub fn give_right_to_vote(&mut self, caller: Address, target: Address) -> Result<(), BallotError> {
        if caller != self.chairperson {
            return Err(BallotError::Unauthorized);
        }
        let voter = self.voter(&target);
        if voter.voted {
            return Err(BallotError::AlreadyVoted(VotedContext::Grant));
        }
        if voter.weight != 0 {
            return Err(BallotError::AlreadyHasRights);
        }

        self.voters.entry(target).or_default().weight = 1;
        self.events.push(BallotEvent::RightGranted { voter: target });
        debug!(voter = %target, "voting right granted");
        Ok(())
    }

    /// Cast the caller's whole weight for `proposal`.
    ///
    /// # Errors
    /// - [`BallotError::NoVotingRights`] if the caller has no weight
    /// - [`BallotError::AlreadyVoted`] if the caller already voted or delegated
    /// - [`BallotError::InvalidProposal`] if `proposal` is out of range
    pub fn vote(&mut self, caller: Address, proposal: usize) -> Result<(), BallotError> {
        let voter = self.voter(&caller);
        if voter.weight == 0 {
            return Err(BallotError::NoVotingRights);
        }
        if voter.voted {
            return Err(BallotError::AlreadyVoted(VotedContext::Vote));
        }
        let count = self.proposals.len();
        let current = self
            .proposals
            .get(proposal)
            .ok_or(BallotError::InvalidProposal { index: proposal, count })?
            .vote_count;
        let updated = current
            .checked_add(voter.weight)
            .ok_or(BallotError::WeightOverflow)?;

        self.proposals[proposal].vote_count = updated;
        let record = self.voters.entry(caller).or_default();
        record.voted = true;
        record.vote = Some(proposal);
        self.events.push(BallotEvent::Voted {
            voter: caller,
            proposal,
            weight: voter.weight,
        });
        debug!(voter = %caller, proposal, weight = voter.weight, "vote cast");
        Ok(())
    }

    /// Hand the caller's weight to `to`, following `to`'s own delegation.
    ///
    /// If the chain ends at a direct voter the weight is added to that
    /// voter's proposal straight away; otherwise it is added to the end
    /// voter's weight and counted when they act.
    ///
    /// # Errors
    /// - [`BallotError::NoVotingRights`] if the caller has no weight
    /// - [`BallotError::SelfDelegation`] if `to` is the caller
    /// - [`BallotError::AlreadyVoted`] if the caller already voted or delegated
    /// - [`BallotError::DelegationCycle`] if the chain leads back to the caller
    /// - [`BallotError::IneligibleDelegate`] if the chain ends at a voter
    ///   without the right to vote
    pub fn delegate(&mut self, caller: Address, to: Address) -> Result<(), BallotError> {
        let sender = self.voter(&caller);
        if sender.weight == 0 {
            return Err(BallotError::NoVotingRights);
        }
        if to == caller {
            return Err(BallotError::SelfDelegation);
        }
        if sender.voted {
            return Err(BallotError::AlreadyVoted(VotedContext::Delegate));
        }

        let resolution = resolve_delegate(&self.voters, caller, to)?;
        let delegate = resolution.delegate();
        let target = self.voter(&delegate);
        if target.weight == 0 {
            return Err(BallotError::IneligibleDelegate);
        }

        let weight = sender.weight;
        let proposal = match resolution {
            Resolution::Voted { proposal, .. } => {
                let count = self.proposals.len();
                let current = self
                    .proposals
                    .get(proposal)
                    .ok_or(BallotError::InvalidProposal { index: proposal, count })?
                    .vote_count;
                let updated = current.checked_add(weight).ok_or(BallotError::WeightOverflow)?;
                self.proposals[proposal].vote_count = updated;
                Some(proposal)
            }
            Resolution::Pending { .. } => {
                let updated = target.weight.checked_add(weight).ok_or(BallotError::WeightOverflow)?;
                self.voters.entry(delegate).or_default().weight = updated;
                None
            }
        };

        let record = self.voters.entry(caller).or_default();
        record.voted = true;
        record.delegate = Some(delegate);
        self.events.push(BallotEvent::Delegated {
            from: caller,
            to: delegate,
            weight,
            proposal,
        });
        debug!(from = %caller, to = %delegate, weight, ?proposal, "vote delegated");
        Ok(())
    }

    /// Apply a command on behalf of `caller`.
    pub fn execute(&mut self, caller: Address, command: &BallotCommand) -> Result<(), BallotError> {
        match *command {
            BallotCommand::GiveRightToVote { voter } => self.give_right_to_vote(caller, voter),
            BallotCommand::Vote { proposal } => self.vote(caller, proposal),
            BallotCommand::Delegate { to } => self.delegate(caller, to),
        }
    }

    pub fn chairperson(&self) -> Address {
        self.chairperson
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    pub fn proposal(&self, index: usize) -> Result<&Proposal, BallotError> {
        self.proposals.get(index).ok_or(BallotError::InvalidProposal {
            index,
            count: self.proposals.len(),
        })
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    /// Index of the leading proposal; ties go to the lowest index.
    pub fn winning_proposal(&self) -> usize {
        winning_index(&self.proposals)
    }

    pub fn winner_name(&self) -> ProposalName {
        self.proposals[self.winning_proposal()].name
    }

    pub fn tally(&self) -> Tally {
        Tally::from_proposals(&self.proposals)
    }

    /// Voting record for `address`; unknown identities get the default record.
    pub fn voter(&self, address: &Address) -> Voter {
        self.voters.get(address).copied().unwrap_or_default()
    }

    pub fn voters(&self) -> impl Iterator<Item = (&Address, &Voter)> {
        self.voters.iter()
    }

    pub fn events(&self) -> &[BallotEvent] {
        &self.events
    }

    /// Proposal that `address`'s weight ends up counted for, if any.
    ///
    /// Follows the recorded delegation pointers to the end of the chain.
    /// Returns `None` while the chain ends at a voter who has not voted.
    pub fn resolved_vote(&self, address: &Address) -> Option<usize> {
        let mut current = *address;
        for _ in 0..=self.voters.len() {
            let voter = self.voters.get(&current)?;
            if !voter.voted {
                return None;
            }
            match voter.delegate {
                Some(next) => current = next,
                None => return voter.vote,
            }
        }
        None
    }

    /// Rebuild the per-proposal counts from the voter records alone.
    ///
    /// Every rights-holder contributes their base weight of 1 to the
    /// proposal their delegation chain resolves to.
    pub fn recount(&self) -> Vec<u64> {
        let mut counts = vec![0u64; self.proposals.len()];
        for (address, voter) in &self.voters {
            if !voter.has_right() {
                continue;
            }
            if let Some(index) = self.resolved_vote(address) {
                if let Some(slot) = counts.get_mut(index) {
                    *slot += 1;
                }
            }
        }
        counts
    }

    /// Check structural invariants, used when loading persisted state.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.proposals.is_empty() {
            return Err("ballot has no proposals".to_string());
        }
        if self.voter(&self.chairperson).weight == 0 {
            return Err("chairperson has no voting weight".to_string());
        }
        for (address, voter) in &self.voters {
            if let Some(index) = voter.vote {
                if index >= self.proposals.len() {
                    return Err(format!("voter {} voted for unknown proposal {}", address, index));
                }
            }
            if voter.voted && voter.vote.is_none() && voter.delegate.is_none() {
                return Err(format!("voter {} voted without a choice", address));
            }
        }
        let tallied: Vec<u64> = self.proposals.iter().map(|p| p.vote_count).collect();
        let recounted = self.recount();
        if tallied != recounted {
            return Err(format!(
                "tally {:?} does not match voter records {:?}",
                tallied, recounted
            ));
        }
        Ok(())
    }
}
