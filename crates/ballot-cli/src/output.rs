//! Output formatting utilities.
//!
//! Pretty printing for CLI commands.

use ballot_core::{Ballot, Receipt, Voter};
use ballot_types::Address;
use colored::Colorize;
use tabled::{Table, Tabled};

/// One row of the results table.
#[derive(Debug, Tabled)]
pub struct ProposalRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Proposal")]
    pub name: String,
    #[tabled(rename = "Votes")]
    pub votes: u64,
    #[tabled(rename = "Leading")]
    pub leading: String,
}

/// Build the results table rows for a ballot.
pub fn proposal_rows(ballot: &Ballot) -> Vec<ProposalRow> {
    let leader = ballot.winning_proposal();
    ballot
        .proposals()
        .iter()
        .enumerate()
        .map(|(index, p)| ProposalRow {
            index,
            name: p.name.to_string(),
            votes: p.vote_count,
            leading: if index == leader { "*".to_string() } else { String::new() },
        })
        .collect()
}

/// Print success message.
pub fn print_success(msg: &str) {
    println!("{}", format!("✓ {}", msg).green());
}

/// Print error message.
pub fn print_error(msg: &str) {
    eprintln!("{}", format!("✗ {}", msg).red());
}

/// Print warning message.
pub fn print_warning(msg: &str) {
    println!("{}", format!("⚠ {}", msg).yellow());
}

/// Print info message.
pub fn print_info(msg: &str) {
    println!("{}", format!("ℹ {}", msg).blue());
}

/// Print the results table.
pub fn print_results(ballot: &Ballot) {
    println!("{}", "Ballot Results".bold());
    println!("{}", Table::new(proposal_rows(ballot)));
    let tally = ballot.tally();
    println!("Total votes:  {}", tally.total.to_string().bright_yellow());
    if tally.is_tied() {
        print_warning("Leading proposals are tied; the lowest index wins");
    }
}

/// Print a command receipt.
pub fn print_receipt(receipt: &Receipt) {
    println!("{}", "Receipt".bold());
    println!("{}", "=".repeat(50));
    println!("Sequence:  {}", receipt.sequence.to_string().bright_green());
    println!("Caller:    {}", receipt.caller);
    println!("Command:   {}", receipt.command);
    println!("Hash:      {}", receipt.hash.bright_cyan());
}

/// Print an address in both its hex and Bech32m forms.
pub fn print_address(address: &Address) -> anyhow::Result<()> {
    println!("Address:     {}", address.to_string().bright_green());
    println!("Bech32m:     {}", address.to_bech32()?);
    Ok(())
}

/// Print a voter record.
pub fn print_voter(address: &Address, voter: &Voter, resolved: Option<usize>) {
    println!("{}", "Voter".bold());
    println!("{}", "=".repeat(50));
    println!("Address:   {}", address);
    println!("Weight:    {}", voter.weight.to_string().bright_yellow());
    println!("Status:    {}", voter_status(voter));
    if let Some(delegate) = voter.delegate {
        println!("Delegate:  {}", delegate.short());
    }
    if let Some(index) = resolved {
        println!("Counts for proposal {}", index.to_string().bright_green());
    }
}

pub fn voter_status(voter: &Voter) -> String {
    if !voter.has_right() {
        "no right to vote".to_string()
    } else if voter.voted_directly() {
        match voter.vote {
            Some(index) => format!("voted for proposal {}", index),
            None => "voted".to_string(),
        }
    } else if voter.voted {
        "delegated".to_string()
    } else {
        "has not voted".to_string()
    }
}
