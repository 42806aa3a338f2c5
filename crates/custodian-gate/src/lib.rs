//! # custodian-gate
//!
//! Beneficiary registry and the transfer gate that moves custody funds.
//!
//! ## Architecture
//!
//! A [`TransferGate`] owns:
//! 1. A global [`SlidingWindowLimiter`](custodian_limiter::SlidingWindowLimiter)
//!    charged by every transfer
//! 2. A [`BeneficiaryRegistry`] with one limiter and one cooldown per
//!    recipient
//! 3. Its collaborators: a [`Clock`](custodian_types::Clock), an
//!    [`AccessAuthority`](custodian_types::AccessAuthority) and a
//!    [`SettlementLedger`](custodian_types::SettlementLedger)
//!
//! A transfer succeeds only if both windows accept it and settlement
//! succeeds. Otherwise no window keeps a trace of the attempt.

pub mod gate;
pub mod registry;

pub use gate::TransferGate;
pub use registry::BeneficiaryRegistry;
