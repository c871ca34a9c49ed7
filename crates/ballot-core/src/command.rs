//! Mutating commands and the receipts issued for them.

use std::fmt;

use ballot_types::Address;
use serde::{Deserialize, Serialize};

/// A state-changing request against a ballot, submitted by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BallotCommand {
    GiveRightToVote { voter: Address },
    Vote { proposal: usize },
    Delegate { to: Address },
}

impl BallotCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BallotCommand::GiveRightToVote { .. } => "give_right_to_vote",
            BallotCommand::Vote { .. } => "vote",
            BallotCommand::Delegate { .. } => "delegate",
        }
    }

    /// Fixed binary encoding used for receipt hashing.
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(21);
        match self {
            BallotCommand::GiveRightToVote { voter } => {
                out.push(0);
                out.extend_from_slice(voter.as_bytes());
            }
            BallotCommand::Vote { proposal } => {
                out.push(1);
                out.extend_from_slice(&(*proposal as u64).to_le_bytes());
            }
            BallotCommand::Delegate { to } => {
                out.push(2);
                out.extend_from_slice(to.as_bytes());
            }
        }
        out
    }
}

impl fmt::Display for BallotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BallotCommand::GiveRightToVote { voter } => write!(f, "give right to vote to {}", voter),
            BallotCommand::Vote { proposal } => write!(f, "vote for proposal {}", proposal),
            BallotCommand::Delegate { to } => write!(f, "delegate vote to {}", to),
        }
    }
}

/// Proof that a command was accepted and persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Position of the command in the ballot's total order, starting at 0
    pub sequence: u64,
    pub caller: Address,
    pub command: BallotCommand,
    /// `0x`-prefixed blake3 digest of the sequence, caller and command
    pub hash: String,
}

impl Receipt {
    pub fn new(sequence: u64, caller: Address, command: BallotCommand) -> Self {
        let hash = format!("0x{}", hex::encode(Self::digest(sequence, &caller, &command)));
        Self { sequence, caller, command, hash }
    }

    pub fn digest(sequence: u64, caller: &Address, command: &BallotCommand) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"ballot-receipt");
        hasher.update(&sequence.to_le_bytes());
        hasher.update(caller.as_bytes());
        hasher.update(&command.encode());
        hasher.finalize().into()
    }

    /// Recompute the digest and compare it with the recorded hash.
    pub fn verify(&self) -> bool {
        let expected = format!(
            "0x{}",
            hex::encode(Self::digest(self.sequence, &self.caller, &self.command))
        );
        expected == self.hash
    }
}
