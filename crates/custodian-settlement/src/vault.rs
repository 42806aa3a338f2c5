//! In-memory custody vault.
//!
//! Holds the custody wallet's balance and the balances of every account
//! it has paid. A mutation either applies completely or returns an error
//! with no balance changed.

use std::collections::HashMap;

use custodian_types::{AccountId, Amount, CustodianError, Result, SettlementLedger};
use serde::{Deserialize, Serialize};

use crate::supply_conservation::SupplyConservation;

/// One account's balance in a [`VaultStatement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub account: AccountId,
    pub balance: Amount,
}

/// Point-in-time view of a vault, holdings sorted by account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStatement {
    pub custody: Amount,
    pub holdings: Vec<Holding>,
    pub total_minted: Amount,
    pub total_burned: Amount,
}

/// Custody wallet implementing [`SettlementLedger`].
#[derive(Debug, Clone, Default)]
pub struct Vault {
    custody: Amount,
    balances: HashMap<AccountId, Amount>,
    supply: SupplyConservation,
}

impl Vault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Funds held by the custody wallet.
    #[must_use]
    pub fn custody_balance(&self) -> Amount {
        self.custody
    }

    /// Funds paid out to `account` so far.
    #[must_use]
    pub fn balance_of(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Sum of the custody balance and every account balance.
    pub fn total_supply(&self) -> Result<Amount> {
        self.balances
            .values()
            .try_fold(self.custody, |acc, b| acc.checked_add(*b))
            .ok_or(CustodianError::ArithmeticOverflow {
                context: "total supply",
            })
    }

    /// Check `Σ balances == Σ minted - Σ burned`.
    pub fn verify_supply(&self) -> Result<()> {
        let actual = self.total_supply()?;
        self.supply.verify(actual).inspect_err(|err| {
            tracing::error!(error = %err, "Supply conservation violated");
        })
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    #[must_use]
    pub fn statement(&self) -> VaultStatement {
        let mut holdings: Vec<Holding> = self
            .balances
            .iter()
            .map(|(account, balance)| Holding {
                account: *account,
                balance: *balance,
            })
            .collect();
        holdings.sort_by_key(|h| h.account);
        VaultStatement {
            custody: self.custody,
            holdings,
            total_minted: self.supply.total_minted(),
            total_burned: self.supply.total_burned(),
        }
    }

    fn debit_custody(&self, amount: Amount) -> Result<Amount> {
        check_positive(amount)?;
        if self.custody < amount {
            return Err(CustodianError::InsufficientBalance {
                needed: amount,
                available: self.custody,
            });
        }
        Ok(self.custody - amount)
    }
}

impl SettlementLedger for Vault {
    fn transfer(&mut self, to: AccountId, amount: Amount) -> Result<()> {
        let custody = self.debit_custody(amount)?;
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(CustodianError::ArithmeticOverflow {
                context: "recipient balance",
            })?;
        self.custody = custody;
        self.balances.insert(to, credited);
        tracing::debug!(to = %to, amount, custody, "Vault transfer");
        Ok(())
    }

    fn mint(&mut self, amount: Amount) -> Result<()> {
        check_positive(amount)?;
        let custody = self
            .custody
            .checked_add(amount)
            .ok_or(CustodianError::ArithmeticOverflow {
                context: "custody balance",
            })?;
        self.supply.record_mint(amount)?;
        self.custody = custody;
        tracing::debug!(amount, custody, "Vault mint");
        Ok(())
    }

    fn burn(&mut self, amount: Amount) -> Result<()> {
        let custody = self.debit_custody(amount)?;
        self.supply.record_burn(amount)?;
        self.custody = custody;
        tracing::debug!(amount, custody, "Vault burn");
        Ok(())
    }
}

fn check_positive(amount: Amount) -> Result<()> {
    if amount <= 0 {
        return Err(CustodianError::SettlementFailed {
            reason: format!("amount must be positive, got {amount}"),
        });
    }
    Ok(())
}
