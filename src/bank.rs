//! Native-token balance book backing every transfer on the chain.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Address;

/// Failure to move native balance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("insufficient balance: {available} available, {requested} requested")]
pub struct InsufficientBalance {
    /// Balance held by the sender.
    pub available: U256,
    /// Amount the sender tried to move.
    pub requested: U256,
}

/// Balances keyed by account address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    balances: BTreeMap<Address, U256>,
}

impl Bank {
    /// Balance of `account`, zero when unknown.
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Credits external funds (genesis allocation or test faucet).
    pub fn deposit(&mut self, account: Address, amount: U256) {
        let entry = self.balances.entry(account).or_default();
        *entry = entry.saturating_add(amount);
    }

    /// Moves `amount` from `from` to `to`.
    pub fn move_funds(
        &mut self,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), InsufficientBalance> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(InsufficientBalance {
                available,
                requested: amount,
            });
        }
        if from == to || amount.is_zero() {
            return Ok(());
        }
        self.set(*from, available - amount);
        let credited = self.balance_of(to).saturating_add(amount);
        self.set(*to, credited);
        Ok(())
    }

    /// Total native supply held across all accounts.
    pub fn total_supply(&self) -> U256 {
        self.balances
            .values()
            .fold(U256::zero(), |acc, v| acc.saturating_add(*v))
    }

    fn set(&mut self, account: Address, amount: U256) {
        if amount.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }
}
