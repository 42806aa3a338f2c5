//! Beneficiary registry.
//!
//! Each registered beneficiary owns a [`SlidingWindowLimiter`] and an
//! activation timestamp. Entries are kept in an [`OrderedKeyedLedger`]
//! (stable registration-order listing, O(1) removal from anywhere) and
//! indexed by identity.
//!
//! Queries hand out [`BeneficiarySnapshot`]s, never references into the
//! registry.

use std::collections::HashMap;

use custodian_limiter::{LedgerKey, OrderedKeyedLedger, Recorded, SlidingWindowLimiter};
use custodian_types::{
    AccountId, Amount, BeneficiarySnapshot, CustodianError, LimitScope, Operation, Result,
    Timestamp,
};

/// A registered recipient.
#[derive(Debug, Clone)]
struct Beneficiary {
    id: AccountId,
    limiter: SlidingWindowLimiter,
    enabled_at: Timestamp,
}

impl Beneficiary {
    fn snapshot(&self, now: Timestamp) -> Result<BeneficiarySnapshot> {
        let used = self.limiter.used_limit(now)?;
        Ok(BeneficiarySnapshot {
            id: self.id,
            capacity: self.limiter.capacity(),
            interval_secs: self.limiter.interval_secs(),
            enabled_at: self.enabled_at,
            used,
            remaining: self.limiter.remaining_limit(now)?,
            observed_at: now,
        })
    }
}

/// Identity-keyed collection of beneficiaries.
#[derive(Debug, Clone)]
pub struct BeneficiaryRegistry {
    /// Window length given to every beneficiary limiter.
    interval_secs: u64,
    entries: OrderedKeyedLedger<Beneficiary>,
    index: HashMap<AccountId, LedgerKey>,
}

impl BeneficiaryRegistry {
    /// # Errors
    /// `InvalidInterval` if `interval_secs` is zero.
    pub fn new(interval_secs: u64) -> Result<Self> {
        if interval_secs == 0 {
            return Err(CustodianError::InvalidInterval);
        }
        Ok(Self {
            interval_secs,
            entries: OrderedKeyedLedger::new(),
            index: HashMap::new(),
        })
    }

    #[must_use]
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Register `id`, enabled `cooldown_secs` after `now`.
    ///
    /// # Errors
    /// `BeneficiaryAlreadyExists` if `id` is registered; `InvalidLimit` if
    /// `capacity` is negative.
    pub fn add(
        &mut self,
        id: AccountId,
        capacity: Amount,
        cooldown_secs: u64,
        now: Timestamp,
    ) -> Result<()> {
        if self.index.contains_key(&id) {
            return Err(CustodianError::BeneficiaryAlreadyExists(id));
        }
        let limiter = SlidingWindowLimiter::new(capacity, self.interval_secs)?;
        let enabled_at = now.saturating_add_secs(cooldown_secs);
        let key = self.entries.generate(Beneficiary {
            id,
            limiter,
            enabled_at,
        })?;
        self.index.insert(id, key);
        tracing::info!(
            beneficiary = %id,
            capacity,
            enabled_at = %enabled_at,
            "Beneficiary added"
        );
        Ok(())
    }

    /// Unregister `id`, purging its recorded operations first.
    pub fn remove(&mut self, id: &AccountId) -> Result<()> {
        let key = self
            .index
            .get(id)
            .copied()
            .ok_or(CustodianError::BeneficiaryNotFound(*id))?;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.limiter.purge_all();
        }
        self.entries.remove(key)?;
        self.index.remove(id);
        tracing::info!(beneficiary = %id, "Beneficiary removed");
        Ok(())
    }

    pub fn set_capacity(&mut self, id: &AccountId, capacity: Amount) -> Result<()> {
        self.entry_mut(id)?.limiter.set_capacity(capacity)
    }

    pub fn temporarily_increase_capacity(
        &mut self,
        id: &AccountId,
        delta: Amount,
        now: Timestamp,
    ) -> Result<()> {
        self.entry_mut(id)?
            .limiter
            .temporarily_increase_limit(delta, now)
            .map(|_| ())
    }

    pub fn temporarily_decrease_capacity(
        &mut self,
        id: &AccountId,
        delta: Amount,
        now: Timestamp,
    ) -> Result<()> {
        self.entry_mut(id)?
            .limiter
            .temporarily_decrease_limit(delta, now)
            .map(|_| ())
    }

    /// Record a transfer of `amount` to `id`.
    ///
    /// # Errors
    /// - `BeneficiaryNotFound` if `id` is not registered
    /// - `BeneficiaryNotYetEnabled` while `now < enabled_at`
    /// - `LimitExceeded` if the beneficiary's window is over capacity; the
    ///   attempt stays recorded
    pub fn record_transfer(
        &mut self,
        id: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<()> {
        let recorded = self.stage_transfer(id, amount, now)?;
        if recorded.accepted {
            Ok(())
        } else {
            Err(CustodianError::LimitExceeded {
                scope: LimitScope::Beneficiary(*id),
                requested: amount,
                remaining: recorded.remaining,
            })
        }
    }

    /// Cooldown and existence checks, then append to the beneficiary's
    /// window. A rejected attempt is returned, not turned into an error, so
    /// the caller can [`rescind`](Self::rescind) it.
    pub fn stage_transfer(
        &mut self,
        id: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Recorded> {
        let entry = self.entry_mut(id)?;
        if now < entry.enabled_at {
            return Err(CustodianError::BeneficiaryNotYetEnabled {
                id: *id,
                enabled_at: entry.enabled_at,
                now,
            });
        }
        entry.limiter.record(amount, now)
    }

    /// Remove one entry previously staged for `id`.
    pub fn rescind(&mut self, id: &AccountId, key: LedgerKey) -> Result<Operation> {
        self.entry_mut(id)?.limiter.rescind(key)
    }

    /// Snapshot of `id` at `now`.
    pub fn get(&self, id: &AccountId, now: Timestamp) -> Result<BeneficiarySnapshot> {
        self.entry(id)?.snapshot(now)
    }

    /// Snapshots of every beneficiary in registration order.
    pub fn list(&self, now: Timestamp) -> Result<Vec<BeneficiarySnapshot>> {
        self.entries
            .iter()
            .map(|(_, entry)| entry.snapshot(now))
            .collect()
    }

    pub fn limit(&self, id: &AccountId) -> Result<Amount> {
        Ok(self.entry(id)?.limiter.capacity())
    }

    pub fn remaining_limit(&self, id: &AccountId, now: Timestamp) -> Result<Amount> {
        self.entry(id)?.limiter.remaining_limit(now)
    }

    pub fn used_limit(&self, id: &AccountId, now: Timestamp) -> Result<Amount> {
        self.entry(id)?.limiter.used_limit(now)
    }

    /// Operations inside `id`'s window at `now`, oldest first.
    pub fn transfers(&self, id: &AccountId, now: Timestamp) -> Result<Vec<Operation>> {
        Ok(self.entry(id)?.limiter.operations(now))
    }

    #[must_use]
    pub fn contains(&self, id: &AccountId) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, id: &AccountId) -> Result<&Beneficiary> {
        self.index
            .get(id)
            .and_then(|key| self.entries.get(*key))
            .ok_or(CustodianError::BeneficiaryNotFound(*id))
    }

    fn entry_mut(&mut self, id: &AccountId) -> Result<&mut Beneficiary> {
        let key = self
            .index
            .get(id)
            .copied()
            .ok_or(CustodianError::BeneficiaryNotFound(*id))?;
        self.entries
            .get_mut(key)
            .ok_or_else(|| {
                CustodianError::Internal(format!("index points at missing entry {key} for {id}"))
            })
    }
}
