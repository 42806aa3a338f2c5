//! Point-in-time views returned by queries and committed transfers.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, Timestamp, TransferId};

/// Immutable snapshot of one beneficiary, taken at `observed_at`.
///
/// Later activity does not change a snapshot already handed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiarySnapshot {
    pub id: AccountId,
    pub capacity: Amount,
    pub interval_secs: u64,
    pub enabled_at: Timestamp,
    pub used: Amount,
    pub remaining: Amount,
    pub observed_at: Timestamp,
}

impl BeneficiarySnapshot {
    /// Whether the cooldown had elapsed when the snapshot was taken.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.observed_at >= self.enabled_at
    }
}

/// Proof that a transfer passed both limiters and was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub id: TransferId,
    pub beneficiary: AccountId,
    pub amount: Amount,
    pub executed_at: Timestamp,
    /// Global capacity left in the window right after this transfer.
    pub global_remaining: Amount,
    /// Beneficiary capacity left in the window right after this transfer.
    pub beneficiary_remaining: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_enabled_flag() {
        let mut snap = BeneficiarySnapshot {
            id: AccountId::from_label("dave"),
            capacity: 100,
            interval_secs: 60,
            enabled_at: Timestamp(50),
            used: 0,
            remaining: 100,
            observed_at: Timestamp(49),
        };
        assert!(!snap.is_enabled());
        snap.observed_at = Timestamp(50);
        assert!(snap.is_enabled());
    }

    #[test]
    fn receipt_serde_roundtrip() {
        let receipt = TransferReceipt {
            id: TransferId::new(),
            beneficiary: AccountId::from_label("erin"),
            amount: 1_000_000_000_000_000_000_000,
            executed_at: Timestamp(1_700_000_000),
            global_remaining: 5,
            beneficiary_remaining: -3,
        };
        let json = serde_json::to_string(&receipt).unwrap();
        let back: TransferReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(receipt, back);
    }
}
