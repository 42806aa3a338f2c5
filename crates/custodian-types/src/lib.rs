//! # custodian-types
//!
//! Shared types, errors, configuration and collaborator traits for
//! **Custodian**, the windowed transfer limiter for a custody wallet.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`TransferId`]
//! - **Quota primitives**: [`Amount`], [`Operation`], [`LimitScope`], [`Timestamp`]
//! - **Views**: [`BeneficiarySnapshot`], [`TransferReceipt`]
//! - **Configuration**: [`GateConfig`], [`LimiterConfig`], [`BeneficiaryConfig`]
//! - **Errors**: [`CustodianError`] with `CU_ERR_` prefix codes
//! - **Collaborators**: [`Clock`], [`AccessAuthority`] / [`Role`], [`SettlementLedger`]
//! - **Constants**: system-wide defaults

pub mod access;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod limit;
pub mod receipt;
pub mod settlement;
pub mod time;

pub use access::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use limit::*;
pub use receipt::*;
pub use settlement::*;
pub use time::*;

// Constants are accessed via `custodian_types::constants::FOO`
// (not re-exported to avoid name collisions).
