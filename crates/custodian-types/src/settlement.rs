//! The settlement collaborator.
//!
//! Quota checks decide *whether* funds may move; a [`SettlementLedger`]
//! actually moves them. It is called only after every check has passed.

use crate::{AccountId, Amount, Result};

/// Executes asset movements for the custody wallet.
pub trait SettlementLedger {
    /// Move `amount` from the custody wallet to `to`.
    fn transfer(&mut self, to: AccountId, amount: Amount) -> Result<()>;

    /// Create `amount` new units in the custody wallet.
    fn mint(&mut self, amount: Amount) -> Result<()>;

    /// Destroy `amount` units held by the custody wallet.
    fn burn(&mut self, amount: Amount) -> Result<()>;
}

impl<S: SettlementLedger + ?Sized> SettlementLedger for Box<S> {
    fn transfer(&mut self, to: AccountId, amount: Amount) -> Result<()> {
        (**self).transfer(to, amount)
    }

    fn mint(&mut self, amount: Amount) -> Result<()> {
        (**self).mint(amount)
    }

    fn burn(&mut self, amount: Amount) -> Result<()> {
        (**self).burn(amount)
    }
}
