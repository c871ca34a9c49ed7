use std::fmt;
use std::path::PathBuf;

use ballot_types::TypesError;
use thiserror::Error;

/// Errors raised by ballot operations.
///
/// Every variant leaves the ballot exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BallotError {
    #[error("Only chairperson can give right to vote.")]
    Unauthorized,

    #[error("{0}")]
    AlreadyVoted(VotedContext),

    #[error("Voter already has the right to vote")]
    AlreadyHasRights,

    #[error("Has no right to vote")]
    NoVotingRights,

    #[error("Invalid proposal {index}: ballot has {count} proposals")]
    InvalidProposal { index: usize, count: usize },

    #[error("Self-delegation is disallowed.")]
    SelfDelegation,

    #[error("Found loop in delegation.")]
    DelegationCycle,

    #[error("Delegate has no right to vote")]
    IneligibleDelegate,

    #[error("A ballot needs at least one proposal")]
    NoProposals,

    #[error("Vote weight overflow")]
    WeightOverflow,

    #[error("Invalid proposal name: {0}")]
    InvalidName(#[from] TypesError),
}

/// Operation that found its subject had already voted or delegated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotedContext {
    /// The target of a grant
    Grant,
    /// The caller of a vote
    Vote,
    /// The caller of a delegation
    Delegate,
}

impl fmt::Display for VotedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VotedContext::Grant => "The voter already voted.",
            VotedContext::Vote => "Already voted",
            VotedContext::Delegate => "You already voted.",
        })
    }
}

/// Errors raised by [`crate::BallotStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Ballot(#[from] BallotError),

    #[error("Ballot state already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("No ballot state found at {0}")]
    NotFound(PathBuf),

    #[error("Unsupported state version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Corrupt ballot state: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_messages() {
        assert_eq!(
            BallotError::Unauthorized.to_string(),
            "Only chairperson can give right to vote."
        );
        assert_eq!(BallotError::NoVotingRights.to_string(), "Has no right to vote");
        assert_eq!(
            BallotError::SelfDelegation.to_string(),
            "Self-delegation is disallowed."
        );
        assert_eq!(BallotError::DelegationCycle.to_string(), "Found loop in delegation.");
    }

    #[test]
    fn test_already_voted_messages() {
        assert_eq!(
            BallotError::AlreadyVoted(VotedContext::Grant).to_string(),
            "The voter already voted."
        );
        assert_eq!(BallotError::AlreadyVoted(VotedContext::Vote).to_string(), "Already voted");
        assert_eq!(
            BallotError::AlreadyVoted(VotedContext::Delegate).to_string(),
            "You already voted."
        );
    }

    #[test]
    fn test_invalid_proposal_message() {
        let err = BallotError::InvalidProposal { index: 7, count: 3 };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: StoreError = BallotError::AlreadyVoted(VotedContext::Vote).into();
        assert_eq!(err.to_string(), "Already voted");
    }
}
