//! Configuration types for a transfer gate.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, CustodianError, Result, constants};

/// Capacity and window of a single sliding-window limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum net amount per window. Must be non-negative.
    pub capacity: Amount,
    /// Trailing window length in seconds. Must be non-zero.
    pub interval_secs: u64,
}

impl LimiterConfig {
    #[must_use]
    pub fn new(capacity: Amount, interval_secs: u64) -> Self {
        Self {
            capacity,
            interval_secs,
        }
    }

    /// A limiter allowing `capacity` per day.
    #[must_use]
    pub fn daily(capacity: Amount) -> Self {
        Self::new(capacity, constants::SECONDS_PER_DAY)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity < 0 {
            return Err(CustodianError::InvalidLimit {
                reason: format!("capacity {} is negative", self.capacity),
            });
        }
        if self.interval_secs == 0 {
            return Err(CustodianError::InvalidInterval);
        }
        Ok(())
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self::new(
            constants::DEFAULT_GLOBAL_CAPACITY,
            constants::DEFAULT_INTERVAL_SECS,
        )
    }
}

/// A beneficiary registered when the gate is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficiaryConfig {
    pub account: AccountId,
    pub capacity: Amount,
    /// Falls back to [`GateConfig::default_cooldown_secs`] when absent.
    #[serde(default)]
    pub cooldown_secs: Option<u64>,
}

/// Full configuration for a transfer gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Global limiter shared by every transfer.
    pub global: LimiterConfig,
    /// Window length of every per-beneficiary limiter.
    pub beneficiary_interval_secs: u64,
    /// Cooldown applied to beneficiaries that do not specify one.
    pub default_cooldown_secs: u64,
    /// Beneficiaries registered at construction.
    pub beneficiaries: Vec<BeneficiaryConfig>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            global: LimiterConfig::default(),
            beneficiary_interval_secs: constants::DEFAULT_INTERVAL_SECS,
            default_cooldown_secs: constants::DEFAULT_COOLDOWN_SECS,
            beneficiaries: Vec::new(),
        }
    }
}

impl GateConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CustodianError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every limit and reject duplicate beneficiaries.
    pub fn validate(&self) -> Result<()> {
        self.global.validate()?;
        if self.beneficiary_interval_secs == 0 {
            return Err(CustodianError::InvalidInterval);
        }
        let mut seen = std::collections::HashSet::new();
        for b in &self.beneficiaries {
            if !seen.insert(b.account) {
                return Err(CustodianError::Configuration(format!(
                    "beneficiary {} listed twice",
                    b.account
                )));
            }
            LimiterConfig::new(b.capacity, self.beneficiary_interval_secs).validate()?;
        }
        Ok(())
    }

    /// Effective cooldown for a configured beneficiary.
    #[must_use]
    pub fn cooldown_for(&self, beneficiary: &BeneficiaryConfig) -> u64 {
        beneficiary
            .cooldown_secs
            .unwrap_or(self.default_cooldown_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = GateConfig::default();
        assert_eq!(cfg.global.interval_secs, 86_400);
        assert_eq!(cfg.beneficiary_interval_secs, 86_400);
        assert_eq!(cfg.default_cooldown_secs, 3_600);
        assert!(cfg.beneficiaries.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn negative_capacity_rejected() {
        let err = LimiterConfig::daily(-1).validate().unwrap_err();
        assert!(matches!(err, CustodianError::InvalidLimit { .. }));
    }

    #[test]
    fn zero_interval_rejected() {
        let err = LimiterConfig::new(10, 0).validate().unwrap_err();
        assert!(matches!(err, CustodianError::InvalidInterval));

        let cfg = GateConfig {
            beneficiary_interval_secs: 0,
            ..GateConfig::default()
        };
        assert!(matches!(
            cfg.validate().unwrap_err(),
            CustodianError::InvalidInterval
        ));
    }

    #[test]
    fn duplicate_beneficiaries_rejected() {
        let account = AccountId::from_label("dup");
        let entry = BeneficiaryConfig {
            account,
            capacity: 10,
            cooldown_secs: None,
        };
        let cfg = GateConfig {
            beneficiaries: vec![entry.clone(), entry],
            ..GateConfig::default()
        };
        assert!(matches!(
            cfg.validate().unwrap_err(),
            CustodianError::Configuration(_)
        ));
    }

    #[test]
    fn json_with_partial_fields() {
        let account = AccountId::from_label("alice");
        let json = format!(
            r#"{{
                "global": {{ "capacity": 1000, "interval_secs": 3600 }},
                "beneficiaries": [
                    {{ "account": "{account}", "capacity": 100 }},
                    {{ "account": "{other}", "capacity": 50, "cooldown_secs": 0 }}
                ]
            }}"#,
            other = AccountId::from_label("bob"),
        );
        let cfg = GateConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg.global, LimiterConfig::new(1000, 3600));
        assert_eq!(cfg.beneficiary_interval_secs, 86_400);
        assert_eq!(cfg.beneficiaries.len(), 2);
        assert_eq!(cfg.beneficiaries[0].account, account);
        assert_eq!(cfg.cooldown_for(&cfg.beneficiaries[0]), 3_600);
        assert_eq!(cfg.cooldown_for(&cfg.beneficiaries[1]), 0);
    }

    #[test]
    fn invalid_json_is_configuration_error() {
        let err = GateConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, CustodianError::Configuration(_)));

        let err = GateConfig::from_json_str(r#"{"global":{"capacity":-5,"interval_secs":1}}"#)
            .unwrap_err();
        assert!(matches!(err, CustodianError::InvalidLimit { .. }));
    }

    #[test]
    fn config_serde_roundtrip() {
        let cfg = GateConfig {
            global: LimiterConfig::daily(5_000),
            beneficiaries: vec![BeneficiaryConfig {
                account: AccountId::from_label("carol"),
                capacity: 250,
                cooldown_secs: Some(60),
            }],
            ..GateConfig::default()
        };
        let json = cfg.to_json_string().unwrap();
        let back = GateConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
