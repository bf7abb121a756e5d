//! Capability checks shared by the fee ledger and every fee gateway.

use crate::error::FeeError;
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Role tags gating mutating operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Platform administration: channels, bounds, oracle, proposal decisions.
    PlatformAdmin,
    /// Application developer: fee proposals and collector updates.
    DeveloperAdmin,
    /// Ledger operator: may force a distribution outside its epoch.
    Operator,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::PlatformAdmin => "PLATFORM_ADMIN_ROLE",
            Role::DeveloperAdmin => "DEVELOPER_ADMIN_ROLE",
            Role::Operator => "OPERATOR_ROLE",
        };
        f.write_str(name)
    }
}

/// Authorization map from principal to the set of roles it holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    members: BTreeMap<Address, BTreeSet<Role>>,
}

impl AccessControl {
    /// Returns true if `account` holds `role`.
    pub fn has_role(&self, account: &Address, role: Role) -> bool {
        self.members
            .get(account)
            .map(|roles| roles.contains(&role))
            .unwrap_or(false)
    }

    /// Fails with [`FeeError::MissingRole`] unless `account` holds `role`.
    pub fn ensure(&self, account: &Address, role: Role) -> Result<(), FeeError> {
        if self.has_role(account, role) {
            Ok(())
        } else {
            Err(FeeError::MissingRole {
                account: *account,
                role,
            })
        }
    }

    /// Grants `role` to `account`. Returns false if it was already held.
    pub fn grant(&mut self, account: Address, role: Role) -> Result<bool, FeeError> {
        if account.is_zero() {
            return Err(FeeError::InvalidAddress);
        }
        Ok(self.members.entry(account).or_default().insert(role))
    }

    /// Revokes `role` from `account`. Returns false if it was not held.
    pub fn revoke(&mut self, account: &Address, role: Role) -> bool {
        let Some(roles) = self.members.get_mut(account) else {
            return false;
        };
        let removed = roles.remove(&role);
        if roles.is_empty() {
            self.members.remove(account);
        }
        removed
    }

    /// Accounts currently holding `role`, in address order.
    pub fn holders(&self, role: Role) -> Vec<Address> {
        self.members
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(account, _)| *account)
            .collect()
    }
}
