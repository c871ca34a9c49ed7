//! Funding precheck applied before a mutating command is submitted.

use ballot_types::Address;
use std::collections::BTreeMap;

use crate::config::FundingConfig;

/// Where caller balances come from.
pub trait BalanceSource {
    fn balance_of(&self, address: &Address) -> anyhow::Result<u64>;
}

/// Balances listed in the `[funding.balances]` config table.
/// Addresses not listed hold nothing.
pub struct ConfiguredBalances<'a> {
    balances: &'a BTreeMap<Address, u64>,
}

impl<'a> ConfiguredBalances<'a> {
    pub fn new(config: &'a FundingConfig) -> Self {
        Self {
            balances: &config.balances,
        }
    }
}

impl BalanceSource for ConfiguredBalances<'_> {
    fn balance_of(&self, address: &Address) -> anyhow::Result<u64> {
        Ok(self.balances.get(address).copied().unwrap_or(0))
    }
}

/// Refuse to submit when `address` holds less than `min_balance`.
///
/// Returns the balance that was checked, or `None` when the check is off.
pub fn ensure_funded(
    source: &dyn BalanceSource,
    address: &Address,
    min_balance: u64,
) -> anyhow::Result<Option<u64>> {
    if min_balance == 0 {
        return Ok(None);
    }
    let balance = source.balance_of(address)?;
    tracing::debug!(address = %address, balance, min_balance, "funding precheck");
    if balance < min_balance {
        anyhow::bail!(
            "Not enough funds: {} holds {}, at least {} required",
            address,
            balance,
            min_balance
        );
    }
    Ok(Some(balance))
}
