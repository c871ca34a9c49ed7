//! Ballot Core - Delegated, weighted voting ledger.
//!
//! This crate provides:
//! - The ballot state machine (chairperson, proposals, voters)
//! - Transitive vote delegation with cycle detection
//! - Tally and winning proposal computation
//! - A file-backed store that applies commands one at a time

pub mod ledger;
pub mod delegation;
pub mod tally;
pub mod command;
pub mod event;
pub mod store;
pub mod error;

pub use ledger::{Ballot, Proposal, Voter};
pub use delegation::{resolve_delegate, Resolution};
pub use tally::{winning_index, Tally};
pub use command::{BallotCommand, Receipt};
pub use event::BallotEvent;
pub use store::BallotStore;
pub use error::{BallotError, StoreError, VotedContext};
