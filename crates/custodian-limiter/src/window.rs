//! Sliding-window limiter.
//!
//! A limiter keeps a chronological ledger of signed [`Operation`]s. At any
//! time `now` the amount used is the sum over operations still inside the
//! trailing window:
//!
//! ```text
//! used(now)      = Σ op.amount   for op with now - op.occurred_at < interval
//! remaining(now) = capacity - used(now)
//! ```
//!
//! Temporary capacity adjustments are just operations with the opposite
//! sign, so they expire with the window and need no timer. Expired entries
//! are pruned from the head on the next mutating call; queries skip them
//! without mutating, so a query gives the same answer whether or not a
//! prune has run.

use custodian_types::{Amount, CustodianError, Operation, Result, Timestamp};

use crate::ledger::{LedgerKey, OrderedKeyedLedger};

/// Outcome of appending an operation to a limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    /// Ledger key of the appended entry, for [`SlidingWindowLimiter::rescind`].
    pub key: LedgerKey,
    /// Whether the window was still within capacity after the append.
    pub accepted: bool,
    /// `capacity - used(now)` after the append.
    pub remaining: Amount,
}

/// Capacity plus trailing-interval accumulator.
#[derive(Debug, Clone)]
pub struct SlidingWindowLimiter {
    capacity: Amount,
    interval_secs: u64,
    ledger: OrderedKeyedLedger<Operation>,
}

impl SlidingWindowLimiter {
    /// # Errors
    /// `InvalidLimit` if `capacity` is negative, `InvalidInterval` if the
    /// interval is zero.
    pub fn new(capacity: Amount, interval_secs: u64) -> Result<Self> {
        check_capacity(capacity)?;
        if interval_secs == 0 {
            return Err(CustodianError::InvalidInterval);
        }
        Ok(Self {
            capacity,
            interval_secs,
            ledger: OrderedKeyedLedger::new(),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> Amount {
        self.capacity
    }

    #[must_use]
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Replace the capacity. Recorded operations are kept.
    pub fn set_capacity(&mut self, capacity: Amount) -> Result<()> {
        check_capacity(capacity)?;
        self.capacity = capacity;
        Ok(())
    }

    /// Record an attempted consumption of `amount` and report whether the
    /// window is still within capacity.
    ///
    /// The entry is appended whether or not it is accepted; undoing a
    /// rejected attempt is the caller's decision.
    pub fn record_consumption(&mut self, amount: Amount, now: Timestamp) -> Result<bool> {
        self.record(amount, now).map(|r| r.accepted)
    }

    /// [`record_consumption`](Self::record_consumption), returning the
    /// ledger key of the new entry.
    pub fn record(&mut self, amount: Amount, now: Timestamp) -> Result<Recorded> {
        check_non_negative(amount, "consumption")?;
        let (key, remaining) = self.append(amount, now)?;
        let accepted = remaining >= 0;
        if !accepted {
            tracing::debug!(
                amount,
                remaining,
                capacity = self.capacity,
                "Consumption exceeds window capacity"
            );
        }
        Ok(Recorded {
            key,
            accepted,
            remaining,
        })
    }

    /// Remove one previously recorded entry. Used to roll back a call that
    /// failed after recording.
    ///
    /// # Errors
    /// `UnknownLedgerKey` if the entry is gone (already rescinded or pruned).
    pub fn rescind(&mut self, key: LedgerKey) -> Result<Operation> {
        self.ledger.take(key).map(|(op, _)| op)
    }

    /// Raise capacity by `delta` until the window slides past `now`.
    pub fn temporarily_increase_limit(
        &mut self,
        delta: Amount,
        now: Timestamp,
    ) -> Result<LedgerKey> {
        check_non_negative(delta, "limit increase")?;
        self.append(-delta, now).map(|(key, _)| key)
    }

    /// Lower capacity by `delta` until the window slides past `now`.
    pub fn temporarily_decrease_limit(
        &mut self,
        delta: Amount,
        now: Timestamp,
    ) -> Result<LedgerKey> {
        check_non_negative(delta, "limit decrease")?;
        self.append(delta, now).map(|(key, _)| key)
    }

    /// Net amount recorded inside the window at `now`.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the sum leaves the `i128` range.
    pub fn used_limit(&self, now: Timestamp) -> Result<Amount> {
        self.live(now).try_fold(0, |acc: Amount, op| {
            acc.checked_add(op.amount)
                .ok_or(CustodianError::ArithmeticOverflow {
                    context: "window sum",
                })
        })
    }

    /// `capacity - used(now)`. Negative when over limit.
    pub fn remaining_limit(&self, now: Timestamp) -> Result<Amount> {
        self.capacity
            .checked_sub(self.used_limit(now)?)
            .ok_or(CustodianError::ArithmeticOverflow {
                context: "remaining limit",
            })
    }

    /// Operations inside the window at `now`, oldest first.
    #[must_use]
    pub fn operations(&self, now: Timestamp) -> Vec<Operation> {
        self.live(now).copied().collect()
    }

    /// Delete every recorded operation.
    pub fn purge_all(&mut self) {
        let purged = self.ledger.len();
        self.ledger.clear();
        if purged > 0 {
            tracing::debug!(purged, "Purged limiter ledger");
        }
    }

    /// Entries currently stored, including expired ones not yet pruned.
    #[must_use]
    pub fn stored_len(&self) -> usize {
        self.ledger.len()
    }

    /// Prune, append, and return the new key with the remaining capacity.
    /// An entry whose window sum would overflow is taken back out.
    fn append(&mut self, amount: Amount, now: Timestamp) -> Result<(LedgerKey, Amount)> {
        self.prune(now)?;
        let key = self.ledger.generate(Operation::new(amount, now))?;
        match self.remaining_limit(now) {
            Ok(remaining) => Ok((key, remaining)),
            Err(e) => {
                self.ledger.remove(key)?;
                Err(e)
            }
        }
    }

    /// Drop expired entries from the head, stopping at the first live one.
    fn prune(&mut self, now: Timestamp) -> Result<()> {
        let mut pruned = 0usize;
        let mut cursor = self.ledger.first();
        while let Some(key) = cursor {
            let live = self
                .ledger
                .get(key)
                .is_some_and(|op| op.is_live(now, self.interval_secs));
            if live {
                break;
            }
            cursor = self.ledger.remove(key)?;
            pruned += 1;
        }
        if pruned > 0 {
            tracing::debug!(pruned, now = now.as_secs(), "Pruned expired operations");
        }
        Ok(())
    }

    /// Entries are chronological, so the live ones are a suffix.
    fn live(&self, now: Timestamp) -> impl Iterator<Item = &Operation> + '_ {
        let interval = self.interval_secs;
        self.ledger
            .iter()
            .map(|(_, op)| op)
            .skip_while(move |op| !op.is_live(now, interval))
    }
}

fn check_capacity(capacity: Amount) -> Result<()> {
    if capacity < 0 {
        return Err(CustodianError::InvalidLimit {
            reason: format!("capacity {capacity} is negative"),
        });
    }
    Ok(())
}

fn check_non_negative(amount: Amount, what: &str) -> Result<()> {
    if amount < 0 {
        return Err(CustodianError::InvalidAmount {
            reason: format!("{what} of {amount} is negative"),
        });
    }
    Ok(())
}
