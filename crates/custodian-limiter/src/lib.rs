//! # custodian-limiter
//!
//! The sliding-window quota engine.
//!
//! - [`OrderedKeyedLedger`]: insertion-ordered arena with auto-minted,
//!   never-reused keys and O(1) removal at the head or in the interior
//! - [`SlidingWindowLimiter`]: capacity plus trailing window over a ledger
//!   of signed, timestamped operations, with lazy expiry pruning
//!
//! One limiter guards the whole custody wallet; one more guards each
//! beneficiary.

pub mod ledger;
pub mod window;

pub use ledger::{LedgerKey, OrderedKeyedLedger};
pub use window::{Recorded, SlidingWindowLimiter};
