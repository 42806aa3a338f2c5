//! # custodian-settlement
//!
//! In-memory settlement for the custody wallet.
//!
//! - [`Vault`]: a [`SettlementLedger`](custodian_types::SettlementLedger)
//!   holding the custody balance and every recipient's balance
//! - [`SupplyConservation`]: checks `Σ balances == Σ minted - Σ burned`

pub mod supply_conservation;
pub mod vault;

pub use supply_conservation::SupplyConservation;
pub use vault::{Holding, Vault, VaultStatement};
