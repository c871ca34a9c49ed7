//! Ballot Types - Shared type definitions for the ballot ledger.
//!
//! This crate provides:
//! - Addresses (20-byte identities, hex or Bech32m encoded)
//! - Proposal names (fixed 32-byte, null-padded display names)
//! - The policy applied to over-long proposal names

pub mod address;
pub mod name;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use name::{NamePolicy, ProposalName};
pub use error::TypesError;
