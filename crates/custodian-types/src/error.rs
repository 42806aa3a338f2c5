//! Error types for Custodian.
//!
//! All errors use the `CU_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Access control errors
//! - 2xx: Beneficiary errors
//! - 3xx: Limit errors
//! - 4xx: Ledger errors
//! - 5xx: Settlement errors
//! - 6xx: Arithmetic errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{AccountId, Amount, LimitScope, Role, Timestamp};

/// Central error enum for all Custodian operations.
#[derive(Debug, Error)]
pub enum CustodianError {
    // =================================================================
    // Access Control Errors (1xx)
    // =================================================================
    /// The caller does not hold the role required by the entry point.
    #[error("CU_ERR_100: Unauthorized: {caller} lacks role {role}")]
    Unauthorized { caller: AccountId, role: Role },

    // =================================================================
    // Beneficiary Errors (2xx)
    // =================================================================
    /// A beneficiary with this identity is already registered.
    #[error("CU_ERR_200: Beneficiary already exists: {0}")]
    BeneficiaryAlreadyExists(AccountId),

    /// No beneficiary with this identity is registered.
    #[error("CU_ERR_201: Beneficiary not found: {0}")]
    BeneficiaryNotFound(AccountId),

    /// The beneficiary's activation cooldown has not elapsed.
    #[error("CU_ERR_202: Beneficiary {id} not enabled until {enabled_at} (now {now})")]
    BeneficiaryNotYetEnabled {
        id: AccountId,
        enabled_at: Timestamp,
        now: Timestamp,
    },

    // =================================================================
    // Limit Errors (3xx)
    // =================================================================
    /// The request would exceed a windowed limit.
    #[error("CU_ERR_300: {scope} limit exceeded: requested {requested}, remaining {remaining}")]
    LimitExceeded {
        scope: LimitScope,
        requested: Amount,
        remaining: Amount,
    },

    /// An amount or delta argument was out of range (e.g. negative).
    #[error("CU_ERR_301: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// A capacity was out of range.
    #[error("CU_ERR_302: Invalid limit: {reason}")]
    InvalidLimit { reason: String },

    /// A window interval of zero seconds was requested.
    #[error("CU_ERR_303: Invalid interval: window must be at least one second")]
    InvalidInterval,

    // =================================================================
    // Ledger Errors (4xx)
    // =================================================================
    /// A ledger key was not present. Correct callers never trigger this.
    #[error("CU_ERR_400: Unknown ledger key: {0}")]
    UnknownLedgerKey(u64),

    // =================================================================
    // Settlement Errors (5xx)
    // =================================================================
    /// The custody wallet does not hold enough of the asset.
    #[error("CU_ERR_500: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    /// The settlement collaborator refused the operation.
    #[error("CU_ERR_501: Settlement failed: {reason}")]
    SettlementFailed { reason: String },

    /// Supply conservation invariant violated. Critical.
    #[error("CU_ERR_502: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Arithmetic Errors (6xx)
    // =================================================================
    /// Checked arithmetic overflowed.
    #[error("CU_ERR_600: Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("CU_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("CU_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("CU_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CustodianError>;

impl From<serde_json::Error> for CustodianError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl CustodianError {
    /// Whether this error came from a quota decision rather than a
    /// malformed request or a collaborator failure.
    #[must_use]
    pub fn is_quota_rejection(&self) -> bool {
        matches!(
            self,
            Self::LimitExceeded { .. } | Self::BeneficiaryNotYetEnabled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = CustodianError::BeneficiaryNotFound(AccountId::from_bytes([0; 20]));
        let msg = format!("{err}");
        assert!(msg.starts_with("CU_ERR_201"), "Got: {msg}");
    }

    #[test]
    fn limit_exceeded_display() {
        let err = CustodianError::LimitExceeded {
            scope: LimitScope::Global,
            requested: 50,
            remaining: -10,
        };
        let msg = format!("{err}");
        assert!(msg.contains("CU_ERR_300"));
        assert!(msg.contains("global"));
        assert!(msg.contains("50"));
        assert!(msg.contains("-10"));
    }

    #[test]
    fn unauthorized_names_role() {
        let err = CustodianError::Unauthorized {
            caller: AccountId::from_label("mallory"),
            role: Role::Minter,
        };
        let msg = format!("{err}");
        assert!(msg.contains("CU_ERR_100"));
        assert!(msg.contains("MINTER"));
    }

    #[test]
    fn quota_rejections_classified() {
        let id = AccountId::from_label("carol");
        assert!(
            CustodianError::BeneficiaryNotYetEnabled {
                id,
                enabled_at: Timestamp(10),
                now: Timestamp(5),
            }
            .is_quota_rejection()
        );
        assert!(!CustodianError::BeneficiaryNotFound(id).is_quota_rejection());
        assert!(!CustodianError::InvalidInterval.is_quota_rejection());
    }

    #[test]
    fn serde_errors_convert() {
        let err: CustodianError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(matches!(err, CustodianError::Serialization(_)));
    }

    #[test]
    fn all_errors_have_cu_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(CustodianError::InvalidInterval),
            Box::new(CustodianError::UnknownLedgerKey(3)),
            Box::new(CustodianError::ArithmeticOverflow { context: "used" }),
            Box::new(CustodianError::Internal("test".into())),
            Box::new(CustodianError::InsufficientBalance {
                needed: 2,
                available: 1,
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("CU_ERR_"),
                "Error missing CU_ERR_ prefix: {msg}"
            );
        }
    }
}
