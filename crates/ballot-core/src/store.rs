//! File-backed ballot store.
//!
//! The store owns one [`Ballot`] and applies commands to it one at a time
//! under a write lock. Readers take the read lock and always see the state
//! between two whole commands. When the store has a path, every accepted
//! command is written to disk before the receipt is returned; if the write
//! fails the command is undone in memory as well.

use std::fs;
use std::path::{Path, PathBuf};

use ballot_types::Address;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::command::{BallotCommand, Receipt};
use crate::error::StoreError;
use crate::ledger::Ballot;

/// Current on-disk format version.
pub const STATE_VERSION: u32 = 1;

/// Persisted state
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateDocument {
    version: u32,
    ballot: Ballot,
    receipts: Vec<Receipt>,
}

/// Ballot plus the receipts of every accepted command.
#[derive(Debug)]
pub struct BallotStore {
    state: RwLock<StateDocument>,
    path: Option<PathBuf>,
}

impl BallotStore {
    /// Keep the ballot in memory only.
    pub fn in_memory(ballot: Ballot) -> Self {
        Self {
            state: RwLock::new(StateDocument {
                version: STATE_VERSION,
                ballot,
                receipts: Vec::new(),
            }),
            path: None,
        }
    }

    /// Persist a freshly created ballot at `path`.
    ///
    /// Refuses to overwrite an existing state file.
    pub fn create(path: impl Into<PathBuf>, ballot: Ballot) -> Result<Self, StoreError> {
        let path = path.into();
        if path.exists() {
            return Err(StoreError::AlreadyExists(path));
        }
        let store = Self {
            state: RwLock::new(StateDocument {
                version: STATE_VERSION,
                ballot,
                receipts: Vec::new(),
            }),
            path: Some(path),
        };
        store.persist(&store.state.read())?;
        info!(path = %store.display_path(), "ballot state created");
        Ok(store)
    }

    /// Load a ballot previously written by [`BallotStore::create`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            return Err(StoreError::NotFound(path));
        }
        let json = fs::read_to_string(&path)?;
        let document: StateDocument = serde_json::from_str(&json)?;
        if document.version != STATE_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: document.version,
                expected: STATE_VERSION,
            });
        }
        document.ballot.check_consistency().map_err(StoreError::Corrupt)?;
        verify_log(&document)?;

        info!(
            path = %path.display(),
            receipts = document.receipts.len(),
            "ballot state loaded"
        );
        Ok(Self {
            state: RwLock::new(document),
            path: Some(path),
        })
    }

    /// Apply `command` for `caller` and return its receipt.
    ///
    /// Commands are serialized by the write lock, so receipts carry a gap-free
    /// sequence matching the order in which they were applied.
    pub fn submit(&self, caller: Address, command: BallotCommand) -> Result<Receipt, StoreError> {
        let mut state = self.state.write();
        let rollback = self.path.as_ref().map(|_| state.ballot.clone());

        if let Err(err) = state.ballot.execute(caller, &command) {
            warn!(caller = %caller, command = command.name(), error = %err, "command rejected");
            return Err(err.into());
        }

        let receipt = Receipt::new(state.receipts.len() as u64, caller, command);
        state.receipts.push(receipt.clone());

        if let Err(err) = self.persist(&state) {
            if let Some(previous) = rollback {
                state.ballot = previous;
            }
            state.receipts.pop();
            warn!(error = %err, "failed to persist ballot state, command undone");
            return Err(err);
        }

        debug!(
            sequence = receipt.sequence,
            caller = %caller,
            command = command.name(),
            hash = %receipt.hash,
            "command applied"
        );
        Ok(receipt)
    }

    /// Run `f` against a consistent view of the ballot.
    pub fn read<R>(&self, f: impl FnOnce(&Ballot) -> R) -> R {
        f(&self.state.read().ballot)
    }

    /// Copy of the current ballot.
    pub fn snapshot(&self) -> Ballot {
        self.state.read().ballot.clone()
    }

    pub fn receipts(&self) -> Vec<Receipt> {
        self.state.read().receipts.clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn display_path(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".to_string())
    }

    /// Write the document next to the target and rename it into place.
    fn persist(&self, document: &StateDocument) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(document)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Replay the receipt log on a fresh ballot and require it to reproduce
/// the stored one, voter weights and event log included.
fn verify_log(document: &StateDocument) -> Result<(), StoreError> {
    let stored = &document.ballot;
    let names = stored.proposals().iter().map(|p| p.name).collect();
    let mut replayed = Ballot::new(names, stored.chairperson())?;

    for (position, receipt) in document.receipts.iter().enumerate() {
        if receipt.sequence != position as u64 {
            return Err(StoreError::Corrupt(format!(
                "receipt sequence {} found at position {}",
                receipt.sequence, position
            )));
        }
        if !receipt.verify() {
            return Err(StoreError::Corrupt(format!(
                "receipt {} does not match its hash",
                receipt.sequence
            )));
        }
        replayed.execute(receipt.caller, &receipt.command).map_err(|e| {
            StoreError::Corrupt(format!("receipt {} does not replay: {}", receipt.sequence, e))
        })?;
    }

    if &replayed != stored {
        return Err(StoreError::Corrupt(
            "ballot does not match its receipt log".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BallotError;
    use ballot_types::NamePolicy;
    use tempfile::TempDir;

    fn test_address(n: u8) -> Address {
        let mut addr = [0u8; 20];
        addr[19] = n;
        Address::from_bytes(addr)
    }

    fn ballot() -> Ballot {
        Ballot::from_names(["Yes", "No"], test_address(0), NamePolicy::Reject).unwrap()
    }

    #[test]
    fn test_submit_in_memory() {
        let store = BallotStore::in_memory(ballot());
        let receipt = store
            .submit(test_address(0), BallotCommand::Vote { proposal: 1 })
            .unwrap();
        assert_eq!(receipt.sequence, 0);
        assert!(receipt.verify());
        assert_eq!(store.read(|b| b.proposal(1).unwrap().vote_count), 1);
        assert!(store.path().is_none());
    }

    #[test]
    fn test_rejected_command_leaves_no_receipt() {
        let store = BallotStore::in_memory(ballot());
        let err = store
            .submit(test_address(7), BallotCommand::Vote { proposal: 0 })
            .unwrap_err();
        assert!(matches!(err, StoreError::Ballot(BallotError::NoVotingRights)));
        assert!(store.receipts().is_empty());
        assert_eq!(store.snapshot(), ballot());
    }

    #[test]
    fn test_create_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ballot.json");

        let store = BallotStore::create(&path, ballot()).unwrap();
        store
            .submit(test_address(0), BallotCommand::GiveRightToVote { voter: test_address(1) })
            .unwrap();
        store
            .submit(test_address(1), BallotCommand::Vote { proposal: 0 })
            .unwrap();
        drop(store);

        let reopened = BallotStore::open(&path).unwrap();
        assert_eq!(reopened.receipts().len(), 2);
        assert_eq!(reopened.read(|b| b.proposal(0).unwrap().vote_count), 1);
        assert_eq!(reopened.read(|b| b.voter(&test_address(1)).vote), Some(0));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ballot.json");
        BallotStore::create(&path, ballot()).unwrap();
        let err = BallotStore::create(&path, ballot()).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn test_open_missing() {
        let dir = TempDir::new().unwrap();
        let err = BallotStore::open(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn test_open_rejects_tampered_tally() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ballot.json");
        BallotStore::create(&path, ballot()).unwrap();

        let mut doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        doc["ballot"]["proposals"][0]["vote_count"] = serde_json::json!(10);
        fs::write(&path, doc.to_string()).unwrap();

        let err = BallotStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_open_rejects_altered_weight() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ballot.json");
        BallotStore::create(&path, ballot()).unwrap();

        let chair = test_address(0).to_string();
        let mut doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        doc["ballot"]["voters"][chair.as_str()]["weight"] = serde_json::json!(10);
        fs::write(&path, doc.to_string()).unwrap();

        let err = BallotStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref msg) if msg.contains("receipt log")));
    }

    #[test]
    fn test_open_rejects_sequence_gap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ballot.json");
        let store = BallotStore::create(&path, ballot()).unwrap();
        store
            .submit(test_address(0), BallotCommand::GiveRightToVote { voter: test_address(1) })
            .unwrap();
        store
            .submit(test_address(1), BallotCommand::Vote { proposal: 0 })
            .unwrap();
        drop(store);

        // Renumber the second receipt with a valid hash for its new sequence
        let mut doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let forged = Receipt::new(2, test_address(1), BallotCommand::Vote { proposal: 0 });
        doc["receipts"][1] = serde_json::to_value(&forged).unwrap();
        fs::write(&path, doc.to_string()).unwrap();

        let err = BallotStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref msg) if msg.contains("position 1")));
    }

    #[test]
    fn test_open_rejects_unreplayable_receipt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ballot.json");
        let store = BallotStore::create(&path, ballot()).unwrap();
        store
            .submit(test_address(0), BallotCommand::Vote { proposal: 1 })
            .unwrap();
        drop(store);

        // A validly hashed receipt from a caller without rights
        let mut doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let forged = Receipt::new(0, test_address(5), BallotCommand::Vote { proposal: 1 });
        doc["receipts"][0] = serde_json::to_value(&forged).unwrap();
        fs::write(&path, doc.to_string()).unwrap();

        let err = BallotStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref msg) if msg.contains("does not replay")));
    }

    #[test]
    fn test_open_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ballot.json");
        BallotStore::create(&path, ballot()).unwrap();

        let mut doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        doc["version"] = serde_json::json!(99);
        fs::write(&path, doc.to_string()).unwrap();

        let err = BallotStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { found: 99, expected: 1 }));
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ballot.json");
        let store = BallotStore::create(&path, ballot()).unwrap();

        // A directory where the temp file should go makes the write fail
        fs::create_dir(path.with_extension("tmp")).unwrap();

        let err = store
            .submit(test_address(0), BallotCommand::Vote { proposal: 0 })
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(store.snapshot(), ballot());
        assert!(store.receipts().is_empty());
    }

    #[test]
    fn test_concurrent_submissions_are_serialized() {
        let mut ballot = ballot();
        for n in 1..=16 {
            ballot.give_right_to_vote(test_address(0), test_address(n)).unwrap();
        }
        let store = BallotStore::in_memory(ballot);

        std::thread::scope(|scope| {
            for n in 1..=16u8 {
                let store = &store;
                scope.spawn(move || {
                    store
                        .submit(test_address(n), BallotCommand::Vote { proposal: (n % 2) as usize })
                        .unwrap();
                });
            }
        });

        let receipts = store.receipts();
        assert_eq!(receipts.len(), 16);
        for (i, r) in receipts.iter().enumerate() {
            assert_eq!(r.sequence, i as u64);
        }
        assert_eq!(store.read(|b| b.tally().counts), vec![8, 8]);
    }
}
