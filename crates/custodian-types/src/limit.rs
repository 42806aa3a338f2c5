//! Quota primitives shared by the limiter and the gate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AccountId, Timestamp};

/// Signed asset quantity.
///
/// 128 bits leaves headroom for 18-decimal token amounts summed over any
/// realistic number of window entries. All arithmetic on amounts is checked.
pub type Amount = i128;

/// One quota-affecting event in a limiter's window.
///
/// Positive amounts consume capacity (transfers, temporary decreases);
/// negative amounts free capacity (temporary increases).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub amount: Amount,
    pub occurred_at: Timestamp,
}

impl Operation {
    #[must_use]
    pub fn new(amount: Amount, occurred_at: Timestamp) -> Self {
        Self {
            amount,
            occurred_at,
        }
    }

    /// Whether this operation still counts towards the window at `now`.
    ///
    /// Live iff `occurred_at > now - interval`: an entry exactly `interval`
    /// seconds old has expired. Entries dated after `now` stay live.
    #[must_use]
    pub fn is_live(&self, now: Timestamp, interval_secs: u64) -> bool {
        now.secs_since(self.occurred_at) < interval_secs
    }
}

/// Which limiter rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitScope {
    Global,
    Beneficiary(AccountId),
}

impl fmt::Display for LimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Beneficiary(id) => write!(f, "beneficiary {id}"),
        }
    }
}
