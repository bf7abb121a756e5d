//! Platform-wide fee ledger.
//!
//! The ledger owns the oracle-derived quote, the developer-fee bounds and the
//! weighted payout channels. It is a pure state machine: native-token
//! movement and event delivery are the host's job (see [`crate::chain`]),
//! which lets every precondition be checked here before anything is applied.
//!
//! ## Quote lifecycle
//!
//! * `refresh_price` is permissionless and a no-op until `now` passes
//!   `next_refresh_at`. A refresh shifts the current quote into the
//!   "previous" slot, recomputes `native_fee = quote * fee_usd / SCALE`,
//!   advances `next_refresh_at` by exactly one epoch and opens a grace
//!   window of `grace_period` seconds.
//! * Grace participants read `min(current, previous)` while the window is
//!   open, so a call priced just before a refresh never pays more than the
//!   quote it could have observed.
//!
//! ## Channel ordering
//!
//! Channels live in a single vector and are removed with swap-and-pop, so the
//! position of a channel is not stable across removals.

use crate::access::{AccessControl, Role};
use crate::config::LedgerConfig;
use crate::error::FeeError;
use crate::events::Event;
use crate::oracle::PriceOracle;
use crate::types::Address;
use crate::units::{mul_div, scale_by, SCALE};
use crate::validation::ensure_nonzero;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum number of payout channels.
pub const MAX_CHANNELS: usize = 10;

/// Oracle-derived prices for the current and previous pricing epochs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Price of the platform's own metered action, in USD.
    pub fee_usd: U256,
    /// Native amount equal to one USD unit.
    pub native_per_usd: U256,
    /// `native_per_usd` before the last refresh.
    pub native_per_usd_previous: U256,
    /// `fee_usd` converted to native tokens.
    pub native_fee: U256,
    /// `native_fee` before the last refresh.
    pub native_fee_previous: U256,
    /// A refresh is permitted once `now` exceeds this timestamp.
    pub next_refresh_at: u64,
    /// Grace pricing applies while `now` is below this timestamp.
    pub grace_ends_at: u64,
}

/// A weighted payout destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Payout address.
    pub address: Address,
    /// Relative weight, always non-zero.
    pub weight: U256,
}

/// Developer-fee bounds and the association's share of each charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevFeeBounds {
    /// Lowest non-zero USD fee a function may carry.
    pub min_dev_fee_usd: U256,
    /// Highest USD fee a function may carry.
    pub max_dev_fee_usd: U256,
    /// Fraction of a developer charge routed to the ledger.
    pub association_share: U256,
}

/// The platform-wide ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeLedger {
    address: Address,
    quote: FeeQuote,
    bounds: DevFeeBounds,
    channels: Vec<Channel>,
    total_shares: U256,
    last_distribution_at: u64,
    fee_update_epoch: u64,
    distribution_epoch: u64,
    grace_period: u64,
    grace_participants: BTreeSet<Address>,
    access: AccessControl,
    #[serde(skip)]
    sweeping: bool,
}

impl FeeLedger {
    /// Builds the ledger from `config`, seeding both quote slots from the
    /// oracle's `initial_quote`.
    pub fn new(config: &LedgerConfig, initial_quote: U256, now: u64) -> Result<Self, FeeError> {
        config.validate()?;
        let native_fee = scale_by(initial_quote, config.fee_usd)?;
        let mut access = AccessControl::default();
        access.grant(config.admin, Role::PlatformAdmin)?;
        if let Some(operator) = config.operator {
            access.grant(operator, Role::Operator)?;
        }
        let channels: Vec<Channel> = config
            .channels
            .iter()
            .map(|c| Channel {
                address: c.address,
                weight: U256::from(c.weight),
            })
            .collect();
        let total_shares = channels
            .iter()
            .fold(U256::zero(), |acc, c| acc.saturating_add(c.weight));
        Ok(Self {
            address: config.address,
            quote: FeeQuote {
                fee_usd: config.fee_usd,
                native_per_usd: initial_quote,
                native_per_usd_previous: initial_quote,
                native_fee,
                native_fee_previous: native_fee,
                next_refresh_at: now.saturating_add(config.fee_update_epoch),
                grace_ends_at: now,
            },
            bounds: DevFeeBounds {
                min_dev_fee_usd: config.min_dev_fee_usd,
                max_dev_fee_usd: config.max_dev_fee_usd,
                association_share: config.association_share,
            },
            channels,
            total_shares,
            last_distribution_at: now,
            fee_update_epoch: config.fee_update_epoch,
            distribution_epoch: config.distribution_epoch,
            grace_period: config.grace_period,
            grace_participants: config.grace_participants.iter().copied().collect(),
            access,
            sweeping: false,
        })
    }

    /// Address holding the ledger's native balance.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current quote state.
    pub fn quote(&self) -> &FeeQuote {
        &self.quote
    }

    /// Developer-fee bounds and association share.
    pub fn bounds(&self) -> &DevFeeBounds {
        &self.bounds
    }

    /// Payout channels in storage order (not stable across removals).
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Sum of all channel weights.
    pub fn total_shares(&self) -> U256 {
        self.total_shares
    }

    /// Timestamp of the last completed distribution.
    pub fn last_distribution_at(&self) -> u64 {
        self.last_distribution_at
    }

    /// Seconds between permitted oracle refreshes.
    pub fn fee_update_epoch(&self) -> u64 {
        self.fee_update_epoch
    }

    /// Seconds between permissionless distributions.
    pub fn distribution_epoch(&self) -> u64 {
        self.distribution_epoch
    }

    /// Length of the grace window opened by each refresh.
    pub fn grace_period(&self) -> u64 {
        self.grace_period
    }

    /// Role assignments on the ledger.
    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// Whether `application` receives grace pricing.
    pub fn is_grace_participant(&self, application: &Address) -> bool {
        self.grace_participants.contains(application)
    }

    fn in_grace(&self, caller: &Address, now: u64) -> bool {
        now < self.quote.grace_ends_at && self.grace_participants.contains(caller)
    }

    /// Refreshes the quote from `oracle` once the refresh epoch has passed.
    ///
    /// Returns `None` when the epoch has not elapsed yet.
    pub fn refresh_price(
        &mut self,
        oracle: &mut dyn PriceOracle,
        now: u64,
    ) -> Result<Option<Event>, FeeError> {
        if now <= self.quote.next_refresh_at {
            tracing::debug!(now, next_refresh_at = self.quote.next_refresh_at, "price refresh not due");
            return Ok(None);
        }
        if !oracle.refresh() {
            tracing::warn!(oracle = oracle.name(), "oracle refresh reported failure; using its last quote");
        }
        let price = oracle.consult();
        if price.is_zero() {
            tracing::warn!(oracle = oracle.name(), "oracle quoted zero native per USD");
        }
        let native_fee = scale_by(price, self.quote.fee_usd)?;

        let quote = &mut self.quote;
        quote.native_fee_previous = quote.native_fee;
        quote.native_per_usd_previous = quote.native_per_usd;
        quote.native_fee = native_fee;
        quote.native_per_usd = price;
        quote.next_refresh_at = quote.next_refresh_at.saturating_add(self.fee_update_epoch);
        quote.grace_ends_at = now.saturating_add(self.grace_period);

        Ok(Some(Event::PriceUpdated {
            native_fee,
            native_per_usd: price,
            next_refresh_at: quote.next_refresh_at,
            grace_ends_at: quote.grace_ends_at,
        }))
    }

    /// Native price of the platform fee as seen by `caller`.
    pub fn current_native_fee(&self, caller: &Address, now: u64) -> U256 {
        if self.in_grace(caller, now) {
            self.quote.native_fee.min(self.quote.native_fee_previous)
        } else {
            self.quote.native_fee
        }
    }

    /// Native amount per USD unit as seen by `caller`.
    pub fn current_native_per_usd(&self, caller: &Address, now: u64) -> U256 {
        if self.in_grace(caller, now) {
            self.quote
                .native_per_usd
                .min(self.quote.native_per_usd_previous)
        } else {
            self.quote.native_per_usd
        }
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    fn channel_index(&self, address: &Address) -> Option<usize> {
        self.channels.iter().position(|c| &c.address == address)
    }

    /// Registers a new payout channel.
    pub fn add_channel(
        &mut self,
        caller: &Address,
        channel: Address,
        weight: U256,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        ensure_nonzero(&channel)?;
        if weight.is_zero() {
            return Err(FeeError::InvalidWeight);
        }
        if self.channel_index(&channel).is_some() {
            return Err(FeeError::ChannelExists(channel));
        }
        if self.channels.len() >= MAX_CHANNELS {
            return Err(FeeError::ChannelLimitReached {
                limit: MAX_CHANNELS,
            });
        }
        let total_shares = self
            .total_shares
            .checked_add(weight)
            .ok_or(FeeError::Overflow)?;
        self.channels.push(Channel {
            address: channel,
            weight,
        });
        self.total_shares = total_shares;
        Ok(Event::ChannelAdded {
            channel,
            weight,
            total_shares,
        })
    }

    /// Replaces the weight of an existing channel.
    pub fn adjust_channel(
        &mut self,
        caller: &Address,
        channel: Address,
        weight: U256,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        if weight.is_zero() {
            return Err(FeeError::InvalidWeight);
        }
        let idx = self
            .channel_index(&channel)
            .ok_or(FeeError::ChannelNotFound(channel))?;
        let total_shares = (self.total_shares - self.channels[idx].weight)
            .checked_add(weight)
            .ok_or(FeeError::Overflow)?;
        self.channels[idx].weight = weight;
        self.total_shares = total_shares;
        Ok(Event::ChannelAdjusted {
            channel,
            weight,
            total_shares,
        })
    }

    /// Removes a channel with swap-and-pop; the last channel takes its slot.
    pub fn remove_channel(&mut self, caller: &Address, channel: Address) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        let idx = self
            .channel_index(&channel)
            .ok_or(FeeError::ChannelNotFound(channel))?;
        let removed = self.channels.swap_remove(idx);
        self.total_shares -= removed.weight;
        Ok(Event::ChannelRemoved {
            channel,
            weight: removed.weight,
            total_shares: self.total_shares,
        })
    }

    // ------------------------------------------------------------------
    // Distribution
    // ------------------------------------------------------------------

    /// Fails unless the distribution epoch has elapsed at `now`.
    pub fn ensure_distribution_due(&self, now: u64) -> Result<(), FeeError> {
        let ready_at = self
            .last_distribution_at
            .saturating_add(self.distribution_epoch);
        if now > ready_at {
            Ok(())
        } else {
            Err(FeeError::EpochNotElapsed { ready_at, now })
        }
    }

    /// Fails unless `caller` may force a distribution.
    pub fn ensure_operator(&self, caller: &Address) -> Result<(), FeeError> {
        self.access.ensure(caller, Role::Operator)
    }

    /// Fails unless `caller` is a platform admin.
    pub fn ensure_admin(&self, caller: &Address) -> Result<(), FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)
    }

    /// Splits `balance` pro rata over the channels.
    ///
    /// Each channel receives `balance * weight / total_shares`, truncated. The
    /// rounding remainder is not assigned and stays with the ledger.
    pub fn plan_distribution(&self, balance: U256) -> Result<Vec<(Address, U256)>, FeeError> {
        if self.channels.is_empty() {
            return Err(FeeError::NoChannels);
        }
        self.channels
            .iter()
            .map(|c| Ok((c.address, mul_div(balance, c.weight, self.total_shares)?)))
            .collect()
    }

    /// Marks a sweep as in progress, rejecting nested sweeps.
    pub fn begin_sweep(&mut self) -> Result<(), FeeError> {
        if self.sweeping {
            return Err(FeeError::Reentrancy);
        }
        self.sweeping = true;
        Ok(())
    }

    /// Completes a sweep and stamps the distribution time.
    ///
    /// A failed sweep never reaches this point; the host rolls the whole
    /// ledger back, marker included.
    pub fn finish_sweep(&mut self, now: u64) {
        self.sweeping = false;
        self.last_distribution_at = now;
    }

    // ------------------------------------------------------------------
    // Admin setters
    // ------------------------------------------------------------------

    /// Sets the minimum developer fee; must not exceed the maximum.
    pub fn set_min_fee(&mut self, caller: &Address, min_fee_usd: U256) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        if min_fee_usd > self.bounds.max_dev_fee_usd {
            return Err(FeeError::InvalidFeeAmount {
                amount: min_fee_usd,
                min: U256::zero(),
                max: self.bounds.max_dev_fee_usd,
            });
        }
        self.bounds.min_dev_fee_usd = min_fee_usd;
        Ok(Event::MinFeeUpdated { min_fee_usd })
    }

    /// Sets the maximum developer fee; must not fall below the minimum.
    pub fn set_max_fee(&mut self, caller: &Address, max_fee_usd: U256) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        if max_fee_usd < self.bounds.min_dev_fee_usd {
            return Err(FeeError::InvalidFeeAmount {
                amount: max_fee_usd,
                min: self.bounds.min_dev_fee_usd,
                max: U256::MAX,
            });
        }
        self.bounds.max_dev_fee_usd = max_fee_usd;
        Ok(Event::MaxFeeUpdated { max_fee_usd })
    }

    /// Sets the platform fee in USD. The native fee follows at the next refresh.
    pub fn set_fee_usd(&mut self, caller: &Address, fee_usd: U256) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        self.quote.fee_usd = fee_usd;
        Ok(Event::FeeUsdUpdated { fee_usd })
    }

    /// Sets the association's fraction of developer charges.
    pub fn set_association_share(
        &mut self,
        caller: &Address,
        share: U256,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        if share > SCALE {
            return Err(FeeError::InvalidFraction(share));
        }
        self.bounds.association_share = share;
        Ok(Event::AssociationShareUpdated { share })
    }

    /// Sets the grace window length.
    pub fn set_grace_period(&mut self, caller: &Address, seconds: u64) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        self.grace_period = seconds;
        Ok(Event::GracePeriodUpdated { seconds })
    }

    /// Sets the price refresh epoch length.
    pub fn set_fee_update_epoch(
        &mut self,
        caller: &Address,
        seconds: u64,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        self.fee_update_epoch = seconds;
        Ok(Event::FeeUpdateEpochUpdated { seconds })
    }

    /// Sets the distribution epoch length.
    pub fn set_distribution_epoch(
        &mut self,
        caller: &Address,
        seconds: u64,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        self.distribution_epoch = seconds;
        Ok(Event::DistributionEpochUpdated { seconds })
    }

    /// Opts `application` in to or out of grace pricing.
    pub fn set_grace_participant(
        &mut self,
        caller: &Address,
        application: Address,
        enabled: bool,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        ensure_nonzero(&application)?;
        if enabled {
            self.grace_participants.insert(application);
        } else {
            self.grace_participants.remove(&application);
        }
        Ok(Event::GraceParticipantUpdated {
            application,
            enabled,
        })
    }

    /// Grants a ledger role.
    pub fn grant_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        self.access.grant(account, role)?;
        Ok(Event::RoleGranted {
            role,
            account,
            sender: *caller,
        })
    }

    /// Revokes a ledger role.
    pub fn revoke_role(
        &mut self,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        self.access.revoke(&account, role);
        Ok(Event::RoleRevoked {
            role,
            account,
            sender: *caller,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ManualOracle;
    use crate::units::whole;
    use proptest::prelude::*;

    const ADMIN: Address = Address([1u8; 20]);
    const APP: Address = Address([0xaa; 20]);

    fn ledger_at(now: u64) -> FeeLedger {
        let mut config = LedgerConfig::new(Address([0xfe; 20]), ADMIN);
        config.fee_update_epoch = 100;
        config.grace_period = 30;
        config.distribution_epoch = 1_000;
        FeeLedger::new(&config, whole(2), now).unwrap()
    }

    #[test]
    fn initial_quote_seeds_both_slots() {
        let ledger = ledger_at(10);
        let quote = ledger.quote();
        assert_eq!(quote.native_per_usd, whole(2));
        assert_eq!(quote.native_per_usd_previous, whole(2));
        assert_eq!(quote.native_fee, whole(2));
        assert_eq!(quote.next_refresh_at, 110);
        assert_eq!(ledger.last_distribution_at(), 10);
    }

    #[test]
    fn refresh_is_gated_and_advances_by_one_epoch() {
        let mut ledger = ledger_at(0);
        let mut oracle = ManualOracle::new("manual", whole(3));
        assert!(ledger.refresh_price(&mut oracle, 100).unwrap().is_none());
        assert_eq!(oracle.refreshes(), 0);

        let event = ledger.refresh_price(&mut oracle, 150).unwrap().unwrap();
        assert!(matches!(event, Event::PriceUpdated { next_refresh_at: 200, grace_ends_at: 180, .. }));
        let quote = ledger.quote();
        assert_eq!(quote.native_per_usd, whole(3));
        assert_eq!(quote.native_per_usd_previous, whole(2));
        assert_eq!(quote.native_fee, whole(3));
        assert_eq!(quote.native_fee_previous, whole(2));

        assert!(ledger.refresh_price(&mut oracle, 199).unwrap().is_none());
        assert!(ledger.refresh_price(&mut oracle, 201).unwrap().is_some());
        assert_eq!(ledger.quote().next_refresh_at, 300);
    }

    #[test]
    fn grace_applies_only_to_participants_inside_the_window() {
        let mut ledger = ledger_at(0);
        ledger.set_grace_participant(&ADMIN, APP, true).unwrap();
        let mut oracle = ManualOracle::new("manual", whole(5));
        ledger.refresh_price(&mut oracle, 101).unwrap();

        let outsider = Address([0xbb; 20]);
        assert_eq!(ledger.current_native_per_usd(&APP, 110), whole(2));
        assert_eq!(ledger.current_native_per_usd(&outsider, 110), whole(5));
        assert_eq!(ledger.current_native_fee(&APP, 110), whole(2));
        assert_eq!(ledger.current_native_per_usd(&APP, 131), whole(5));
    }

    #[test]
    fn channel_preconditions() {
        let mut ledger = ledger_at(0);
        let chan = Address::from_low_u64(0xc1);
        assert_eq!(
            ledger.add_channel(&chan, chan, U256::one()),
            Err(FeeError::MissingRole {
                account: chan,
                role: Role::PlatformAdmin
            })
        );
        assert_eq!(
            ledger.add_channel(&ADMIN, Address::ZERO, U256::one()),
            Err(FeeError::InvalidAddress)
        );
        assert_eq!(
            ledger.add_channel(&ADMIN, chan, U256::zero()),
            Err(FeeError::InvalidWeight)
        );
        ledger.add_channel(&ADMIN, chan, U256::one()).unwrap();
        assert_eq!(
            ledger.add_channel(&ADMIN, chan, U256::one()),
            Err(FeeError::ChannelExists(chan))
        );
        let missing = Address::from_low_u64(0xc9);
        assert_eq!(
            ledger.adjust_channel(&ADMIN, missing, U256::one()),
            Err(FeeError::ChannelNotFound(missing))
        );
        assert_eq!(
            ledger.remove_channel(&ADMIN, missing),
            Err(FeeError::ChannelNotFound(missing))
        );
    }

    #[test]
    fn channel_limit_is_enforced() {
        let mut ledger = ledger_at(0);
        for i in 0..MAX_CHANNELS as u64 {
            ledger
                .add_channel(&ADMIN, Address::from_low_u64(100 + i), U256::one())
                .unwrap();
        }
        assert_eq!(
            ledger.add_channel(&ADMIN, Address::from_low_u64(999), U256::one()),
            Err(FeeError::ChannelLimitReached {
                limit: MAX_CHANNELS
            })
        );
    }

    #[test]
    fn remove_swaps_last_into_place() {
        let mut ledger = ledger_at(0);
        let (a, b, c) = (
            Address::from_low_u64(1),
            Address::from_low_u64(2),
            Address::from_low_u64(3),
        );
        for (addr, w) in [(a, 1u64), (b, 2), (c, 3)] {
            ledger.add_channel(&ADMIN, addr, U256::from(w)).unwrap();
        }
        let event = ledger.remove_channel(&ADMIN, a).unwrap();
        assert_eq!(
            event,
            Event::ChannelRemoved {
                channel: a,
                weight: U256::one(),
                total_shares: U256::from(5)
            }
        );
        let order: Vec<_> = ledger.channels().iter().map(|ch| ch.address).collect();
        assert_eq!(order, vec![c, b]);
    }

    #[test]
    fn distribution_plan_leaves_dust() {
        let mut ledger = ledger_at(0);
        ledger
            .add_channel(&ADMIN, Address::from_low_u64(1), U256::one())
            .unwrap();
        ledger
            .add_channel(&ADMIN, Address::from_low_u64(2), U256::one())
            .unwrap();
        let plan = ledger.plan_distribution(U256::from(101)).unwrap();
        assert_eq!(plan[0].1, U256::from(50));
        assert_eq!(plan[1].1, U256::from(50));
    }

    #[test]
    fn distribution_epoch_gate() {
        let ledger = ledger_at(0);
        assert_eq!(
            ledger.ensure_distribution_due(1_000),
            Err(FeeError::EpochNotElapsed {
                ready_at: 1_000,
                now: 1_000
            })
        );
        assert!(ledger.ensure_distribution_due(1_001).is_ok());
        assert_eq!(
            ledger.plan_distribution(U256::from(10)),
            Err(FeeError::NoChannels)
        );
    }

    #[test]
    fn nested_sweep_is_rejected() {
        let mut ledger = ledger_at(0);
        ledger.begin_sweep().unwrap();
        assert_eq!(ledger.begin_sweep(), Err(FeeError::Reentrancy));
        ledger.finish_sweep(42);
        assert_eq!(ledger.last_distribution_at(), 42);
        assert!(ledger.begin_sweep().is_ok());
    }

    #[test]
    fn bounds_stay_ordered() {
        let mut ledger = ledger_at(0);
        ledger.set_max_fee(&ADMIN, whole(3)).unwrap();
        ledger.set_min_fee(&ADMIN, whole(1)).unwrap();
        assert!(ledger.set_min_fee(&ADMIN, whole(4)).is_err());
        assert!(ledger.set_max_fee(&ADMIN, whole(1) / 2).is_err());
        assert!(ledger.set_association_share(&ADMIN, SCALE + 1).is_err());
        assert_eq!(ledger.bounds().min_dev_fee_usd, whole(1));
        assert_eq!(ledger.bounds().max_dev_fee_usd, whole(3));
    }

    #[test]
    fn set_fee_usd_waits_for_refresh() {
        let mut ledger = ledger_at(0);
        ledger.set_fee_usd(&ADMIN, whole(10)).unwrap();
        assert_eq!(ledger.quote().native_fee, whole(2));
        let mut oracle = ManualOracle::new("manual", whole(2));
        ledger.refresh_price(&mut oracle, 101).unwrap();
        assert_eq!(ledger.quote().native_fee, whole(20));
    }

    #[derive(Debug, Clone)]
    enum ChannelOp {
        Add(u8, u64),
        Adjust(u8, u64),
        Remove(u8),
    }

    fn channel_op() -> impl Strategy<Value = ChannelOp> {
        prop_oneof![
            (1u8..16, 0u64..1_000).prop_map(|(a, w)| ChannelOp::Add(a, w)),
            (1u8..16, 0u64..1_000).prop_map(|(a, w)| ChannelOp::Adjust(a, w)),
            (1u8..16).prop_map(ChannelOp::Remove),
        ]
    }

    proptest! {
        #[test]
        fn total_shares_tracks_weights(ops in prop::collection::vec(channel_op(), 0..64)) {
            let mut ledger = ledger_at(0);
            for op in ops {
                let _ = match op {
                    ChannelOp::Add(a, w) => ledger.add_channel(&ADMIN, Address::from_low_u64(a as u64), U256::from(w)),
                    ChannelOp::Adjust(a, w) => ledger.adjust_channel(&ADMIN, Address::from_low_u64(a as u64), U256::from(w)),
                    ChannelOp::Remove(a) => ledger.remove_channel(&ADMIN, Address::from_low_u64(a as u64)),
                };
                let sum = ledger.channels().iter().fold(U256::zero(), |acc, c| acc + c.weight);
                prop_assert_eq!(ledger.total_shares(), sum);
                prop_assert!(ledger.channels().len() <= MAX_CHANNELS);
            }
        }

        #[test]
        fn distribution_loses_less_than_total_shares(
            balance in any::<u128>(),
            weights in prop::collection::vec(1u64..10_000, 1..=MAX_CHANNELS),
        ) {
            let mut ledger = ledger_at(0);
            for (i, w) in weights.iter().enumerate() {
                ledger.add_channel(&ADMIN, Address::from_low_u64(i as u64 + 1), U256::from(*w)).unwrap();
            }
            let balance = U256::from(balance);
            let plan = ledger.plan_distribution(balance).unwrap();
            let paid = plan.iter().fold(U256::zero(), |acc, (_, amount)| acc + *amount);
            prop_assert!(paid <= balance);
            prop_assert!(balance - paid < ledger.total_shares());
        }

        #[test]
        fn grace_never_exceeds_the_higher_quote(old in 1u64..1_000_000, new in 1u64..1_000_000, offset in 0u64..60) {
            let mut ledger = ledger_at(0);
            ledger.set_grace_participant(&ADMIN, APP, true).unwrap();
            let mut oracle = ManualOracle::new("manual", U256::from(old));
            ledger.refresh_price(&mut oracle, 101).unwrap();
            oracle.set_price(U256::from(new));
            ledger.refresh_price(&mut oracle, 202).unwrap();
            let now = 202 + offset;
            let seen = ledger.current_native_per_usd(&APP, now);
            prop_assert!(seen <= U256::from(old.max(new)));
            if now >= 232 {
                prop_assert_eq!(seen, U256::from(new));
            } else {
                prop_assert_eq!(seen, U256::from(old.min(new)));
            }
        }
    }
}
