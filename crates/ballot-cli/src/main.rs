//! Ballot CLI - Command-line interface for the ballot ledger.
//!
//! Deploys a ballot to a local state file and submits grant, vote and
//! delegate commands against it with an ed25519 key.

pub mod commands;
pub mod config;
pub mod funding;
pub mod keys;
pub mod output;
pub mod telemetry;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = commands::Cli::parse();

    if let Err(e) = commands::execute(cli) {
        output::print_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
