//! Fee ledger entry points wrapped as chain transactions.

use super::Chain;
use crate::access::Role;
use crate::error::FeeError;
use crate::events::Event;
use crate::ledger::FeeLedger;
use crate::oracle::PriceOracle;
use crate::types::Address;
use primitive_types::U256;

impl Chain {
    fn ledger_op(
        &mut self,
        op: impl FnOnce(&mut FeeLedger) -> Result<Event, FeeError>,
    ) -> Result<(), FeeError> {
        self.transact(|chain| {
            let event = op(&mut chain.state.ledger)?;
            let source = chain.state.ledger.address();
            chain.emit(source, event);
            Ok(())
        })
    }

    /// Refreshes the ledger quote if its epoch has elapsed. Permissionless;
    /// returns whether a refresh happened.
    pub fn refresh_price(&mut self) -> Result<bool, FeeError> {
        self.transact(|chain| chain.refresh_quote())
    }

    /// Native platform fee as seen by `caller` right now.
    pub fn current_native_fee(&self, caller: &Address) -> U256 {
        self.state.ledger.current_native_fee(caller, self.now)
    }

    /// Native amount per USD unit as seen by `caller` right now.
    pub fn current_native_per_usd(&self, caller: &Address) -> U256 {
        self.state.ledger.current_native_per_usd(caller, self.now)
    }

    /// Pays the ledger's own platform fee out of `value`, returning any
    /// excess to `payer`. Returns the fee retained.
    pub fn pay_platform_fee(&mut self, payer: Address, value: U256) -> Result<U256, FeeError> {
        self.transact(|chain| {
            chain.refresh_quote()?;
            let fee = chain.state.ledger.current_native_fee(&payer, chain.now);
            if value < fee {
                return Err(FeeError::InsufficientFunds {
                    balance: value,
                    required: fee,
                });
            }
            let ledger = chain.state.ledger.address();
            chain.receive_value(&payer, &ledger, value)?;
            chain.transfer(&ledger, &payer, value - fee)?;
            chain.emit(ledger, Event::PlatformFeePaid { payer, amount: fee });
            Ok(fee)
        })
    }

    /// Sweeps the ledger balance to the channels once the distribution epoch
    /// has elapsed. Permissionless. Returns the payments made.
    pub fn distribute(&mut self) -> Result<Vec<(Address, U256)>, FeeError> {
        self.transact(|chain| {
            chain.state.ledger.ensure_distribution_due(chain.now)?;
            chain.sweep()
        })
    }

    /// Sweeps regardless of the distribution epoch. Operator only.
    pub fn force_distribute(&mut self, caller: &Address) -> Result<Vec<(Address, U256)>, FeeError> {
        self.transact(|chain| {
            chain.state.ledger.ensure_operator(caller)?;
            chain.sweep()
        })
    }

    fn sweep(&mut self) -> Result<Vec<(Address, U256)>, FeeError> {
        if let Err(err) = self.state.ledger.begin_sweep() {
            tracing::warn!("distribution re-entered while a sweep is in progress");
            return Err(err);
        }
        let ledger = self.state.ledger.address();
        let balance = self.balance_of(&ledger);
        let plan = self.state.ledger.plan_distribution(balance)?;
        for (recipient, amount) in &plan {
            if amount.is_zero() {
                continue;
            }
            self.transfer(&ledger, recipient, *amount)?;
            self.emit(
                ledger,
                Event::FeeDistributed {
                    recipient: *recipient,
                    amount: *amount,
                },
            );
        }
        self.state.ledger.finish_sweep(self.now);
        Ok(plan)
    }

    /// Registers a payout channel.
    pub fn add_channel(&mut self, caller: &Address, channel: Address, weight: U256) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.add_channel(caller, channel, weight))
    }

    /// Changes a channel weight.
    pub fn adjust_channel(
        &mut self,
        caller: &Address,
        channel: Address,
        weight: U256,
    ) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.adjust_channel(caller, channel, weight))
    }

    /// Removes a channel; channel order is not preserved.
    pub fn remove_channel(&mut self, caller: &Address, channel: Address) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.remove_channel(caller, channel))
    }

    /// Sets the minimum developer fee in USD.
    pub fn set_min_fee(&mut self, caller: &Address, min_fee_usd: U256) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.set_min_fee(caller, min_fee_usd))
    }

    /// Sets the maximum developer fee in USD.
    pub fn set_max_fee(&mut self, caller: &Address, max_fee_usd: U256) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.set_max_fee(caller, max_fee_usd))
    }

    /// Sets the platform fee in USD, effective from the next refresh.
    pub fn set_fee_usd(&mut self, caller: &Address, fee_usd: U256) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.set_fee_usd(caller, fee_usd))
    }

    /// Sets the association's share of developer fees.
    pub fn set_association_share(&mut self, caller: &Address, share: U256) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.set_association_share(caller, share))
    }

    /// Sets the grace window length.
    pub fn set_grace_period(&mut self, caller: &Address, seconds: u64) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.set_grace_period(caller, seconds))
    }

    /// Sets the price refresh epoch length.
    pub fn set_fee_update_epoch(&mut self, caller: &Address, seconds: u64) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.set_fee_update_epoch(caller, seconds))
    }

    /// Sets the distribution epoch length.
    pub fn set_distribution_epoch(&mut self, caller: &Address, seconds: u64) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.set_distribution_epoch(caller, seconds))
    }

    /// Opts an application in to or out of grace pricing.
    pub fn set_grace_participant(
        &mut self,
        caller: &Address,
        application: Address,
        enabled: bool,
    ) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.set_grace_participant(caller, application, enabled))
    }

    /// Grants a ledger role.
    pub fn grant_ledger_role(&mut self, caller: &Address, role: Role, account: Address) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.grant_role(caller, role, account))
    }

    /// Revokes a ledger role.
    pub fn revoke_ledger_role(&mut self, caller: &Address, role: Role, account: Address) -> Result<(), FeeError> {
        self.ledger_op(|ledger| ledger.revoke_role(caller, role, account))
    }

    /// Replaces the oracle adapter. Platform admin only.
    ///
    /// The new adapter is used from the next refresh on; the current quote
    /// is kept.
    pub fn set_oracle(
        &mut self,
        caller: &Address,
        oracle: impl PriceOracle + 'static,
    ) -> Result<(), FeeError> {
        self.state.ledger.ensure_admin(caller)?;
        let name = oracle.name().to_string();
        self.oracle = Box::new(oracle);
        let source = self.state.ledger.address();
        self.emit(source, Event::OracleUpdated { name });
        Ok(())
    }
}
