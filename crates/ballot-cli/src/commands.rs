//! CLI command implementations.

use anyhow::Context;
use ballot_core::{Ballot, BallotCommand, BallotStore};
use ballot_types::{Address, NamePolicy};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use crate::config::BallotConfig;
use crate::funding::{ensure_funded, ConfiguredBalances};
use crate::keys::Signer;
use crate::output::*;
use crate::telemetry::init_telemetry;

/// Main CLI.
#[derive(Debug, Parser)]
#[command(name = "ballot")]
#[command(about = "Delegated weighted voting ledger")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, env = "BALLOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ballot state file (overrides the configured one)
    #[arg(short, long, global = true, env = "BALLOT_STATE")]
    pub state: Option<PathBuf>,

    /// Private key (hex) commands are submitted with
    #[arg(long, global = true, env = "BALLOT_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new ballot; the submitting key becomes chairperson
    Deploy {
        /// Proposal names, in ballot order
        #[arg(required = true)]
        proposals: Vec<String>,
        /// Truncate names longer than 32 bytes instead of rejecting them
        #[arg(long)]
        truncate: bool,
    },
    /// Give an address the right to vote (chairperson only)
    GiveRight {
        /// Voter address
        voter: String,
    },
    /// Vote for a proposal
    Vote {
        /// Proposal index
        proposal: usize,
    },
    /// Delegate your vote to another voter
    Delegate {
        /// Delegate address
        to: String,
    },
    /// Show the vote count of every proposal
    Results,
    /// Show one proposal
    Proposal {
        /// Proposal index
        index: usize,
    },
    /// Show the winning proposal
    Winner,
    /// Show a voter record
    Voter {
        /// Voter address (defaults to the submitting key's address)
        address: Option<String>,
    },
    /// Show the chairperson
    Chairperson,
    /// List receipts of accepted commands
    Receipts,
    /// Generate a new key
    Keygen,
    /// Show the address of the submitting key
    Address,
    /// Configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Config commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Resolved settings for one invocation.
struct Session {
    config: BallotConfig,
    config_path: PathBuf,
    state_path: PathBuf,
    private_key: Option<String>,
}

impl Session {
    fn signer(&self) -> anyhow::Result<Signer> {
        let key = self
            .private_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No private key: pass --private-key or set BALLOT_PRIVATE_KEY"))?;
        Signer::from_hex(key)
    }

    fn open_store(&self) -> anyhow::Result<BallotStore> {
        BallotStore::open(&self.state_path)
            .with_context(|| format!("Failed to open ballot at {}", self.state_path.display()))
    }

    /// Funding precheck, then apply `command` with the session key.
    fn submit(&self, command: BallotCommand) -> anyhow::Result<()> {
        let signer = self.signer()?;
        let caller = signer.address();
        print_info(&format!("Using address {}", caller));

        let source = ConfiguredBalances::new(&self.config.funding);
        if let Some(balance) = ensure_funded(&source, &caller, self.config.funding.min_balance)? {
            print_info(&format!("Balance {}", balance));
        }

        let store = self.open_store()?;
        print_info(&format!("Attaching to ballot at {}", self.state_path.display()));
        let receipt = store.submit(caller, command)?;
        print_receipt(&receipt);
        print_success(&format!(
            "{}. Transaction completed. Hash: {}",
            capitalize(&command.to_string()),
            receipt.hash
        ));
        Ok(())
    }
}

/// Execute a parsed command line.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(BallotConfig::config_path);
    let config = BallotConfig::load(cli.config.as_deref())?;

    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    init_telemetry(level, cli.json_logs || config.logging.json)?;

    let session = Session {
        state_path: cli.state.clone().unwrap_or_else(|| config.state_path.clone()),
        config,
        config_path,
        private_key: cli.private_key.clone(),
    };
    tracing::debug!(state = %session.state_path.display(), "session ready");

    match cli.command {
        Commands::Deploy { proposals, truncate } => deploy(&session, &proposals, truncate),
        Commands::GiveRight { voter } => {
            let voter = parse_address(&voter)?;
            session.submit(BallotCommand::GiveRightToVote { voter })
        }
        Commands::Vote { proposal } => session.submit(BallotCommand::Vote { proposal }),
        Commands::Delegate { to } => {
            let to = parse_address(&to)?;
            session.submit(BallotCommand::Delegate { to })
        }
        Commands::Results => {
            let store = session.open_store()?;
            store.read(print_results);
            Ok(())
        }
        Commands::Proposal { index } => {
            let store = session.open_store()?;
            let proposal = store.read(|b| b.proposal(index).cloned())?;
            println!("{}: {} ({} votes)", index, proposal.name.to_string().bold(), proposal.vote_count);
            Ok(())
        }
        Commands::Winner => {
            let store = session.open_store()?;
            let (index, name) = store.read(|b| (b.winning_proposal(), b.winner_name()));
            println!("Winning proposal: {} ({})", name.to_string().bright_green().bold(), index);
            Ok(())
        }
        Commands::Voter { address } => {
            let address = match address {
                Some(a) => parse_address(&a)?,
                None => session.signer()?.address(),
            };
            let store = session.open_store()?;
            let (voter, resolved) = store.read(|b| (b.voter(&address), b.resolved_vote(&address)));
            print_voter(&address, &voter, resolved);
            Ok(())
        }
        Commands::Chairperson => {
            let store = session.open_store()?;
            println!("{}", store.read(Ballot::chairperson));
            Ok(())
        }
        Commands::Receipts => {
            let store = session.open_store()?;
            let receipts = store.receipts();
            if receipts.is_empty() {
                print_info("No commands applied yet");
            }
            for receipt in receipts {
                println!("{:>4}  {}  {}  {}", receipt.sequence, receipt.hash, receipt.caller.short(), receipt.command);
            }
            Ok(())
        }
        Commands::Keygen => {
            let signer = Signer::generate();
            print_warning("Keep the private key secret");
            print_address(&signer.address())?;
            println!("Public key:  {}", signer.public_key_hex());
            println!("Private key: {}", signer.secret_hex());
            Ok(())
        }
        Commands::Address => {
            print_address(&session.signer()?.address())
        }
        Commands::Config(ConfigCommands::Show) => {
            println!("# {}", session.config_path.display());
            print!("{}", toml::to_string_pretty(&session.config)?);
            Ok(())
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            if session.config_path.exists() && !force {
                anyhow::bail!(
                    "Config file {} already exists (use --force to overwrite)",
                    session.config_path.display()
                );
            }
            BallotConfig::default().save(&session.config_path)?;
            print_success(&format!("Wrote {}", session.config_path.display()));
            Ok(())
        }
    }
}

fn deploy(session: &Session, proposals: &[String], truncate: bool) -> anyhow::Result<()> {
    let signer = session.signer()?;
    let chairperson = signer.address();
    let policy = if truncate { NamePolicy::Truncate } else { session.config.name_policy };

    print_info(&format!("Deploying ballot with {} proposals", proposals.len()));
    let ballot = Ballot::from_names(proposals, chairperson, policy)?;
    for (index, proposal) in ballot.proposals().iter().enumerate() {
        if proposal.name.text() != proposals[index] {
            print_warning(&format!("Proposal {} truncated to \"{}\"", index, proposal.name));
        }
    }

    BallotStore::create(&session.state_path, ballot)
        .with_context(|| format!("Failed to create ballot at {}", session.state_path.display()))?;
    print_success(&format!("Ballot deployed at {}", session.state_path.display()));
    println!("Chairperson: {}", chairperson.to_string().bright_green());
    Ok(())
}

fn parse_address(s: &str) -> anyhow::Result<Address> {
    s.parse::<Address>()
        .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", s, e))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
