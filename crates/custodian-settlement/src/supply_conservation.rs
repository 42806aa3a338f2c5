//! Supply conservation invariant checker.
//!
//! Invariant enforced after every vault mutation:
//! ```text
//! Σ(balances) == Σ(minted) - Σ(burned)
//! ```
//!
//! Transfers move funds between holders and never change the total.

use custodian_types::{Amount, CustodianError, Result};

/// Running mint and burn totals since genesis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplyConservation {
    minted: Amount,
    burned: Amount,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_mint(&mut self, amount: Amount) -> Result<()> {
        self.minted = self
            .minted
            .checked_add(amount)
            .ok_or(CustodianError::ArithmeticOverflow {
                context: "total minted",
            })?;
        Ok(())
    }

    pub fn record_burn(&mut self, amount: Amount) -> Result<()> {
        self.burned = self
            .burned
            .checked_add(amount)
            .ok_or(CustodianError::ArithmeticOverflow {
                context: "total burned",
            })?;
        Ok(())
    }

    /// Expected total supply: minted - burned.
    pub fn expected_supply(&self) -> Result<Amount> {
        self.minted
            .checked_sub(self.burned)
            .ok_or(CustodianError::ArithmeticOverflow {
                context: "expected supply",
            })
    }

    /// Check that `actual_supply` (the sum of all balances) matches the
    /// expected supply.
    ///
    /// # Errors
    /// Returns [`CustodianError::SupplyInvariantViolation`] if they differ.
    pub fn verify(&self, actual_supply: Amount) -> Result<()> {
        let expected = self.expected_supply()?;
        if actual_supply != expected {
            return Err(CustodianError::SupplyInvariantViolation {
                reason: format!(
                    "actual supply {actual_supply} != expected {expected} \
                     (minted={}, burned={})",
                    self.minted, self.burned
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn total_minted(&self) -> Amount {
        self.minted
    }

    #[must_use]
    pub fn total_burned(&self) -> Amount {
        self.burned
    }
}
