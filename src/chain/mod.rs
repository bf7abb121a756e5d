//! Host runtime providing atomic, serialized transactions.
//!
//! [`Chain`] owns the bank, the shared fee ledger and every registered
//! application gateway in a single [`ChainState`]. Each public mutating
//! operation runs inside [`Chain::transact`]: on any error the state and the
//! event log are restored to the checkpoint taken when the operation began,
//! so callers never observe a partially applied update.
//!
//! Native transfers hand control to the recipient's [`ReceiveHook`], which
//! receives the chain itself and may call back into it. That is how untrusted
//! channel, collector and caller addresses are modelled.

mod gateway_ops;
mod ledger_ops;

use crate::bank::{Bank, InsufficientBalance};
use crate::config::LedgerConfig;
use crate::error::FeeError;
use crate::events::{Event, EventRecord};
use crate::gateway::FeeGateway;
use crate::ledger::FeeLedger;
use crate::oracle::PriceOracle;
use crate::types::{Address, Selector};
use crate::validation::selector_of;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Everything a transaction may mutate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    /// Native balances.
    pub bank: Bank,
    /// The platform-wide fee ledger.
    pub ledger: FeeLedger,
    /// Registered gateways keyed by application address.
    pub applications: BTreeMap<Address, FeeGateway>,
}

/// Code run when an address receives a native transfer.
///
/// Returning an error makes the transfer fail, which reverts the enclosing
/// transaction.
pub trait ReceiveHook: Send + Sync {
    /// Called after `amount` was credited to the hooked address.
    fn on_receive(&self, chain: &mut Chain, from: Address, amount: U256)
        -> Result<(), FeeError>;
}

impl<F> ReceiveHook for F
where
    F: Fn(&mut Chain, Address, U256) -> Result<(), FeeError> + Send + Sync,
{
    fn on_receive(
        &self,
        chain: &mut Chain,
        from: Address,
        amount: U256,
    ) -> Result<(), FeeError> {
        self(chain, from, amount)
    }
}

/// An invocation of a metered application entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Account invoking the entry point.
    pub caller: Address,
    /// Native value attached to the call.
    pub value: U256,
    /// Canonical signature of the entry point, e.g. `"mint(uint256)"`.
    pub signature: String,
    /// Whether the entry point may spend value beyond the fee.
    pub payable: bool,
}

impl Call {
    /// A call without attached value.
    pub fn new(caller: Address, signature: impl Into<String>) -> Self {
        Self {
            caller,
            value: U256::zero(),
            signature: signature.into(),
            payable: false,
        }
    }

    /// Attaches native value.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Marks the entry point payable.
    pub fn payable(mut self) -> Self {
        self.payable = true;
        self
    }
}

/// Context handed to the logic of a metered call.
///
/// Only the host builds one, so [`MeteredCall::spend`] can debit nothing but
/// the application being called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeteredCall {
    caller: Address,
    application: Address,
    selector: Selector,
    fee: U256,
    residual: U256,
}

impl MeteredCall {
    /// Account invoking the entry point.
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// Application being called.
    pub fn application(&self) -> Address {
        self.application
    }

    /// Selector of the entry point.
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// Native fee that will be collected after the logic returns.
    pub fn fee(&self) -> U256 {
        self.fee
    }

    /// Value left for the logic to spend (`value - fee` on payable entry
    /// points, zero otherwise).
    pub fn residual(&self) -> U256 {
        self.residual
    }

    /// Pays `amount` out of the application's balance to `to`.
    ///
    /// Funds the fee still needs can be spent too; the charge then fails
    /// at settlement and the whole call reverts.
    pub fn spend(
        &self,
        chain: &mut Chain,
        to: &Address,
        amount: U256,
    ) -> Result<(), FeeError> {
        chain.transfer(&self.application, to, amount)
    }
}

/// The host runtime. See the module documentation.
pub struct Chain {
    state: ChainState,
    now: u64,
    oracle: Box<dyn PriceOracle>,
    hooks: HashMap<Address, Arc<dyn ReceiveHook>>,
    events: Vec<EventRecord>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("now", &self.now)
            .field("oracle", &self.oracle.name())
            .field("hooks", &self.hooks.len())
            .field("events", &self.events.len())
            .field("state", &self.state)
            .finish()
    }
}

impl Chain {
    /// Boots a chain at time `now`, seeding the ledger quote from `oracle`.
    pub fn new(
        config: &LedgerConfig,
        oracle: impl PriceOracle + 'static,
        now: u64,
    ) -> Result<Self, FeeError> {
        let quote = oracle.consult();
        let ledger = FeeLedger::new(config, quote, now)?;
        tracing::info!(
            ledger = %ledger.address(),
            oracle = oracle.name(),
            native_per_usd = %quote,
            "fee ledger initialised"
        );
        Ok(Self::from_state(
            ChainState {
                bank: Bank::default(),
                ledger,
                applications: BTreeMap::new(),
            },
            Box::new(oracle),
            now,
        ))
    }

    pub(crate) fn from_state(state: ChainState, oracle: Box<dyn PriceOracle>, now: u64) -> Self {
        Self {
            state,
            now,
            oracle,
            hooks: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Full mutable-state view.
    pub fn state(&self) -> &ChainState {
        &self.state
    }

    /// The shared fee ledger.
    pub fn ledger(&self) -> &FeeLedger {
        &self.state.ledger
    }

    /// Gateway registered at `application`.
    pub fn gateway(&self, application: &Address) -> Result<&FeeGateway, FeeError> {
        self.state
            .applications
            .get(application)
            .ok_or(FeeError::UnknownApplication(*application))
    }

    pub(crate) fn gateway_mut(&mut self, application: &Address) -> Result<&mut FeeGateway, FeeError> {
        self.state
            .applications
            .get_mut(application)
            .ok_or(FeeError::UnknownApplication(*application))
    }

    /// Native balance of `account`.
    pub fn balance_of(&self, account: &Address) -> U256 {
        self.state.bank.balance_of(account)
    }

    /// Name of the installed oracle adapter.
    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    // ------------------------------------------------------------------
    // Clock and funding
    // ------------------------------------------------------------------

    /// Current chain time in seconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Moves the clock to `now`.
    pub fn set_time(&mut self, now: u64) {
        self.now = now;
    }

    /// Moves the clock forward by `seconds`.
    pub fn advance(&mut self, seconds: u64) {
        self.now = self.now.saturating_add(seconds);
    }

    /// Credits `amount` to `account` out of thin air (genesis or faucet).
    pub fn deposit(&mut self, account: Address, amount: U256) {
        self.state.bank.deposit(account, amount);
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Installs code to run whenever `account` receives native value.
    pub fn set_receive_hook(&mut self, account: Address, hook: impl ReceiveHook + 'static) {
        self.hooks.insert(account, Arc::new(hook));
    }

    /// Removes the hook of `account`.
    pub fn clear_receive_hook(&mut self, account: &Address) {
        self.hooks.remove(account);
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Every event committed so far, oldest first.
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Drains the event log.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, source: Address, event: Event) {
        tracing::info!(source = %source, timestamp = self.now, event = ?event, "event");
        self.events.push(EventRecord {
            source,
            timestamp: self.now,
            event,
        });
    }

    // ------------------------------------------------------------------
    // Transactions and transfers
    // ------------------------------------------------------------------

    /// Runs `op` atomically: on error every state change and every event it
    /// produced is discarded. Transactions nest; an inner failure only
    /// unwinds the inner scope.
    ///
    /// The oracle adapter and the installed hooks live outside the
    /// transactional state and are not rolled back.
    pub fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Chain) -> Result<T, FeeError>,
    ) -> Result<T, FeeError> {
        let checkpoint = self.state.clone();
        let mark = self.events.len();
        match op(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::debug!(error = %err, "transaction reverted");
                self.state = checkpoint;
                self.events.truncate(mark);
                Err(err)
            }
        }
    }

    /// Pushes `amount` from `from` to `to` and runs the recipient's hook.
    ///
    /// A missing balance or a failing hook surfaces as
    /// [`FeeError::TransferFailed`] and undoes the move. Zero amounts are
    /// skipped.
    pub(crate) fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), FeeError> {
        if amount.is_zero() {
            return Ok(());
        }
        let failed = FeeError::TransferFailed {
            recipient: *to,
            amount,
        };
        self.transact(|chain| {
            if let Err(err) = chain.state.bank.move_funds(from, to, amount) {
                tracing::warn!(from = %from, to = %to, error = %err, "native transfer failed");
                return Err(failed);
            }
            if let Some(hook) = chain.hooks.get(to).cloned() {
                if let Err(err) = hook.on_receive(chain, *from, amount) {
                    tracing::warn!(to = %to, %amount, error = %err, "recipient rejected transfer");
                    return Err(failed);
                }
            }
            Ok(())
        })
    }

    /// Moves attached call value. The payer is the transaction sender, so
    /// no hook runs and a shortfall is the sender's insufficient funds.
    pub(crate) fn receive_value(
        &mut self,
        payer: &Address,
        recipient: &Address,
        value: U256,
    ) -> Result<(), FeeError> {
        self.state
            .bank
            .move_funds(payer, recipient, value)
            .map_err(|InsufficientBalance { available, requested }| FeeError::InsufficientFunds {
                balance: available,
                required: requested,
            })
    }

    pub(crate) fn refresh_quote(&mut self) -> Result<bool, FeeError> {
        let now = self.now;
        let event = self.state.ledger.refresh_price(self.oracle.as_mut(), now)?;
        match event {
            Some(event) => {
                let source = self.state.ledger.address();
                self.emit(source, event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Metered calls
    // ------------------------------------------------------------------

    /// Native fee a call to `signature` on `application` costs right now.
    pub fn adjusted_fee(&self, application: &Address, signature: &str) -> Result<U256, FeeError> {
        self.gateway(application)?
            .adjusted_fee(&self.state.ledger, &selector_of(signature), self.now)
    }

    /// Executes `logic` as a metered entry point of `application`.
    ///
    /// The sequence is: refresh the ledger quote; price the call; receive the
    /// attached value into the application; fail with
    /// [`FeeError::InsufficientFunds`] if neither the value nor the
    /// application balance covers the fee; run `logic`; split the fee between
    /// the ledger and the developer collector; finally, if the gateway is
    /// configured to, return the application's whole remaining balance to the
    /// caller. The whole sequence is one transaction.
    pub fn call_metered<T>(
        &mut self,
        application: Address,
        call: &Call,
        logic: impl FnOnce(&mut Chain, &MeteredCall) -> Result<T, FeeError>,
    ) -> Result<T, FeeError> {
        self.transact(|chain| {
            chain.refresh_quote()?;
            let selector = selector_of(&call.signature);
            let fee = chain
                .gateway(&application)?
                .adjusted_fee(&chain.state.ledger, &selector, chain.now)?;

            chain.receive_value(&call.caller, &application, call.value)?;
            let balance = chain.balance_of(&application);
            if call.value < fee && balance < fee {
                return Err(FeeError::InsufficientFunds {
                    balance,
                    required: fee,
                });
            }
            let residual = if call.payable {
                call.value.saturating_sub(fee)
            } else {
                U256::zero()
            };
            let context = MeteredCall {
                caller: call.caller,
                application,
                selector,
                fee,
                residual,
            };

            let output = logic(chain, &context)?;
            chain.settle_fee(&application, &call.signature, fee)?;

            if chain.gateway(&application)?.refunds_remaining_balance() {
                let remaining = chain.balance_of(&application);
                chain.transfer(&application, &call.caller, remaining)?;
            }
            Ok(output)
        })
    }

    fn settle_fee(&mut self, application: &Address, signature: &str, fee: U256) -> Result<(), FeeError> {
        if fee.is_zero() {
            return Ok(());
        }
        let gateway = self.gateway(application)?;
        let (platform_share, developer_share) = gateway.split_fee(&self.state.ledger, fee)?;
        let collector = gateway.fee_collector();
        let ledger = self.state.ledger.address();

        self.transfer(application, &ledger, platform_share)?;
        self.transfer(application, &collector, developer_share)?;
        self.emit(
            *application,
            Event::FeeCharged {
                signature: signature.to_string(),
                platform_share,
                developer_share,
            },
        );
        Ok(())
    }
}
