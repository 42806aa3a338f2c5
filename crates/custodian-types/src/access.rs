//! Role-gated access control.
//!
//! Every mutating entry point names the [`Role`] it requires. The gate asks
//! an [`AccessAuthority`] before touching any state; [`RoleTable`] is the
//! in-memory authority used by tests and single-process deployments.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::AccountId;

/// Named permission required by a mutating entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Set and temporarily adjust global and per-beneficiary limits.
    LimitManager,
    /// Add and remove beneficiaries.
    BeneficiaryManager,
    /// Move funds from the custody wallet to a beneficiary.
    Transferer,
    /// Mint into the custody wallet.
    Minter,
    /// Burn from the custody wallet.
    Burner,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::LimitManager,
        Role::BeneficiaryManager,
        Role::Transferer,
        Role::Minter,
        Role::Burner,
    ];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LimitManager => write!(f, "LIMIT_MANAGER"),
            Self::BeneficiaryManager => write!(f, "BENEFICIARY_MANAGER"),
            Self::Transferer => write!(f, "TRANSFERER"),
            Self::Minter => write!(f, "MINTER"),
            Self::Burner => write!(f, "BURNER"),
        }
    }
}

/// Answers whether a caller holds a role.
pub trait AccessAuthority {
    fn has_role(&self, caller: &AccountId, role: Role) -> bool;
}

/// In-memory role assignments.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    holders: HashMap<Role, HashSet<AccountId>>,
}

impl RoleTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A table in which `admin` holds every role.
    #[must_use]
    pub fn with_admin(admin: AccountId) -> Self {
        let mut table = Self::new();
        for role in Role::ALL {
            table.grant(role, admin);
        }
        table
    }

    /// Grant `role` to `account`. Returns `false` if it was already held.
    pub fn grant(&mut self, role: Role, account: AccountId) -> bool {
        self.holders.entry(role).or_default().insert(account)
    }

    /// Revoke `role` from `account`. Returns `false` if it was not held.
    pub fn revoke(&mut self, role: Role, account: &AccountId) -> bool {
        self.holders
            .get_mut(&role)
            .is_some_and(|set| set.remove(account))
    }

    /// Number of accounts holding `role`.
    #[must_use]
    pub fn holder_count(&self, role: Role) -> usize {
        self.holders.get(&role).map_or(0, HashSet::len)
    }
}

impl AccessAuthority for RoleTable {
    fn has_role(&self, caller: &AccountId, role: Role) -> bool {
        self.holders
            .get(&role)
            .is_some_and(|set| set.contains(caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_and_revoke() {
        let mut table = RoleTable::new();
        let alice = AccountId::from_label("alice");

        assert!(!table.has_role(&alice, Role::Minter));
        assert!(table.grant(Role::Minter, alice));
        assert!(!table.grant(Role::Minter, alice));
        assert!(table.has_role(&alice, Role::Minter));
        assert!(!table.has_role(&alice, Role::Burner));

        assert!(table.revoke(Role::Minter, &alice));
        assert!(!table.revoke(Role::Minter, &alice));
        assert!(!table.has_role(&alice, Role::Minter));
    }

    #[test]
    fn admin_holds_everything() {
        let admin = AccountId::from_label("admin");
        let table = RoleTable::with_admin(admin);
        for role in Role::ALL {
            assert!(table.has_role(&admin, role));
            assert_eq!(table.holder_count(role), 1);
        }
        assert!(!table.has_role(&AccountId::from_label("other"), Role::Transferer));
    }

    #[test]
    fn role_serde_uses_screaming_case() {
        let json = serde_json::to_string(&Role::BeneficiaryManager).unwrap();
        assert_eq!(json, "\"BENEFICIARY_MANAGER\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::BeneficiaryManager);
    }
}
