//! CLI configuration management.
//!
//! Handles the state file location, the proposal name policy, logging and
//! the funding precheck.

use ballot_types::{Address, NamePolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallotConfig {
    /// Ballot state file
    pub state_path: PathBuf,
    /// What to do with proposal names longer than 32 bytes
    pub name_policy: NamePolicy,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Funding precheck before mutating commands
    pub funding: FundingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "warn" or "ballot_core=debug"
    pub level: String,
    /// Emit JSON lines instead of human-readable logs
    pub json: bool,
}

/// Funding precheck configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingConfig {
    /// Minimum balance a caller must hold to submit; 0 disables the check
    pub min_balance: u64,
    /// Known balances by address
    pub balances: BTreeMap<Address, u64>,
}

impl Default for BallotConfig {
    fn default() -> Self {
        Self {
            state_path: base_dir().join("ballot.json"),
            name_policy: NamePolicy::Reject,
            logging: LoggingConfig::default(),
            funding: FundingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl BallotConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one the default location is
    /// used when present, otherwise built-in defaults apply.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Self::config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: BallotConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration file path.
    pub fn config_path() -> PathBuf {
        base_dir().join("config.toml")
    }
}

fn base_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ballot")
}
