//! Per-application developer fee gateway.
//!
//! A gateway stores the USD price of each metered function, runs the
//! propose → approve/reject workflow between the developer and the
//! platform, and prices calls against the shared [`FeeLedger`] quote. Value
//! movement for a charge happens in [`crate::chain::Chain::call_metered`].
//!
//! Proposal indices refer to the current queue and are invalidated by every
//! decision: a decided entry is replaced by the last one (swap-and-pop).

use crate::access::{AccessControl, Role};
use crate::config::GatewayConfig;
use crate::error::FeeError;
use crate::events::Event;
use crate::ledger::{DevFeeBounds, FeeLedger};
use crate::types::{Address, Selector};
use crate::units::scale_by;
use crate::validation::{
    check_fee_bounds, clamp_fee, ensure_nonzero, ensure_paired_lengths, selector_of,
};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pending fee proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposed USD fee.
    pub usd_fee: U256,
    /// Function signature the fee applies to.
    pub signature: String,
}

/// Read-only view of a queued proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalView {
    /// Current queue position.
    pub index: usize,
    /// Selector derived from the signature.
    pub selector: Selector,
    /// Human-readable function signature.
    pub signature: String,
    /// Proposed USD fee.
    pub usd_fee: U256,
}

/// Fee state embedded in one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeGateway {
    application: Address,
    association: Address,
    developer: Address,
    fee_collector: Address,
    refund_remaining_balance: bool,
    fees: BTreeMap<Selector, U256>,
    signatures: BTreeMap<Selector, String>,
    proposals: Vec<Proposal>,
    access: AccessControl,
}

impl FeeGateway {
    /// Creates a gateway, installing seeded fees checked against `bounds`.
    pub fn new(config: &GatewayConfig, bounds: &DevFeeBounds) -> Result<Self, FeeError> {
        config.validate(bounds.min_dev_fee_usd, bounds.max_dev_fee_usd)?;
        let mut access = AccessControl::default();
        access.grant(config.association, Role::PlatformAdmin)?;
        access.grant(config.developer, Role::DeveloperAdmin)?;
        let mut gateway = Self {
            application: config.application,
            association: config.association,
            developer: config.developer,
            fee_collector: config.fee_collector,
            refund_remaining_balance: config.refund_remaining_balance,
            fees: BTreeMap::new(),
            signatures: BTreeMap::new(),
            proposals: Vec::new(),
            access,
        };
        for seed in &config.fees {
            gateway.write_fee(&seed.signature, seed.usd_fee);
        }
        Ok(gateway)
    }

    /// Address of the application embedding this gateway.
    pub fn application(&self) -> Address {
        self.application
    }

    /// Platform association address.
    pub fn association(&self) -> Address {
        self.association
    }

    /// Developer address.
    pub fn developer(&self) -> Address {
        self.developer
    }

    /// Recipient of the developer share.
    pub fn fee_collector(&self) -> Address {
        self.fee_collector
    }

    /// Whether metered calls sweep the application balance back to the caller.
    pub fn refunds_remaining_balance(&self) -> bool {
        self.refund_remaining_balance
    }

    /// Role assignments on this gateway.
    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    fn write_fee(&mut self, signature: &str, usd_fee: U256) -> Selector {
        let selector = selector_of(signature);
        self.fees.insert(selector, usd_fee);
        self.signatures.insert(selector, signature.to_string());
        selector
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// Configured USD fee for `selector`; zero when none is set.
    pub fn fee_usd(&self, selector: &Selector) -> U256 {
        self.fees.get(selector).copied().unwrap_or_default()
    }

    /// Configured USD fee for a function signature.
    pub fn fee_usd_for(&self, signature: &str) -> U256 {
        self.fee_usd(&selector_of(signature))
    }

    /// Signature recorded for `selector`, if a fee was ever set for it.
    pub fn signature_of(&self, selector: &Selector) -> Option<&str> {
        self.signatures.get(selector).map(String::as_str)
    }

    /// Native amount a call to `selector` costs at `now`.
    ///
    /// Applies the same clamp and grace-aware quote as a real charge, so a
    /// client can supply exactly this value.
    pub fn adjusted_fee(
        &self,
        ledger: &FeeLedger,
        selector: &Selector,
        now: u64,
    ) -> Result<U256, FeeError> {
        let bounds = ledger.bounds();
        let usd = clamp_fee(
            self.fee_usd(selector),
            bounds.min_dev_fee_usd,
            bounds.max_dev_fee_usd,
        );
        if usd.is_zero() {
            return Ok(U256::zero());
        }
        scale_by(usd, ledger.current_native_per_usd(&self.application, now))
    }

    /// Splits a native fee into `(association share, developer share)`.
    pub fn split_fee(&self, ledger: &FeeLedger, fee: U256) -> Result<(U256, U256), FeeError> {
        let platform = scale_by(fee, ledger.bounds().association_share)?;
        let developer = fee.checked_sub(platform).ok_or(FeeError::Overflow)?;
        Ok((platform, developer))
    }

    /// Snapshot of the proposal queue.
    pub fn pending_proposals(&self) -> Vec<ProposalView> {
        self.proposals
            .iter()
            .enumerate()
            .map(|(index, p)| ProposalView {
                index,
                selector: selector_of(&p.signature),
                signature: p.signature.clone(),
                usd_fee: p.usd_fee,
            })
            .collect()
    }

    /// Number of decisions still owed.
    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    // ------------------------------------------------------------------
    // Proposals
    // ------------------------------------------------------------------

    /// Queues a fee proposal after checking it against the current bounds.
    pub fn propose_fee(
        &mut self,
        caller: &Address,
        bounds: &DevFeeBounds,
        usd_fee: U256,
        signature: &str,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::DeveloperAdmin)?;
        check_fee_bounds(usd_fee, bounds.min_dev_fee_usd, bounds.max_dev_fee_usd)?;
        self.proposals.push(Proposal {
            usd_fee,
            signature: signature.to_string(),
        });
        Ok(Event::FeeProposed {
            signature: signature.to_string(),
            usd_fee,
        })
    }

    /// Queues several proposals; all are checked before any is queued.
    pub fn propose_fees(
        &mut self,
        caller: &Address,
        bounds: &DevFeeBounds,
        usd_fees: &[U256],
        signatures: &[String],
    ) -> Result<Vec<Event>, FeeError> {
        self.access.ensure(caller, Role::DeveloperAdmin)?;
        ensure_paired_lengths(signatures.len(), usd_fees.len())?;
        for fee in usd_fees {
            check_fee_bounds(*fee, bounds.min_dev_fee_usd, bounds.max_dev_fee_usd)?;
        }
        let events = signatures
            .iter()
            .zip(usd_fees)
            .map(|(signature, usd_fee)| {
                self.proposals.push(Proposal {
                    usd_fee: *usd_fee,
                    signature: signature.clone(),
                });
                Event::FeeProposed {
                    signature: signature.clone(),
                    usd_fee: *usd_fee,
                }
            })
            .collect();
        Ok(events)
    }

    fn take_proposal(&mut self, index: usize) -> Result<Proposal, FeeError> {
        if index >= self.proposals.len() {
            return Err(FeeError::IndexOutOfBounds {
                index,
                len: self.proposals.len(),
            });
        }
        Ok(self.proposals.swap_remove(index))
    }

    fn decide(&mut self, proposal: Proposal, approve: bool) -> Event {
        if approve {
            self.write_fee(&proposal.signature, proposal.usd_fee);
            Event::FeeSet {
                signature: proposal.signature,
                usd_fee: proposal.usd_fee,
            }
        } else {
            Event::FeeRejected {
                signature: proposal.signature,
                usd_fee: proposal.usd_fee,
            }
        }
    }

    /// Approves the proposal at `index`, writing it into the fee table.
    pub fn approve_fee(&mut self, caller: &Address, index: usize) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        let proposal = self.take_proposal(index)?;
        Ok(self.decide(proposal, true))
    }

    /// Rejects the proposal at `index`.
    pub fn reject_fee(&mut self, caller: &Address, index: usize) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        let proposal = self.take_proposal(index)?;
        Ok(self.decide(proposal, false))
    }

    /// Approves every queued proposal in queue order.
    pub fn approve_all_fees(&mut self, caller: &Address) -> Result<Vec<Event>, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        let queue = std::mem::take(&mut self.proposals);
        Ok(queue.into_iter().map(|p| self.decide(p, true)).collect())
    }

    /// Rejects every queued proposal.
    pub fn reject_all_fees(&mut self, caller: &Address) -> Result<Vec<Event>, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        let queue = std::mem::take(&mut self.proposals);
        Ok(queue.into_iter().map(|p| self.decide(p, false)).collect())
    }

    /// Applies one decision per queued proposal (`true` approves).
    ///
    /// `decisions` must match the queue length exactly; the whole queue is
    /// cleared on success.
    pub fn review_fees(
        &mut self,
        caller: &Address,
        decisions: &[bool],
    ) -> Result<Vec<Event>, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        ensure_paired_lengths(self.proposals.len(), decisions.len())?;
        let queue = std::mem::take(&mut self.proposals);
        Ok(queue
            .into_iter()
            .zip(decisions)
            .map(|(p, approve)| self.decide(p, *approve))
            .collect())
    }

    /// Zeroes the fee of `selector` without a proposal round.
    pub fn remove_fee_admin(
        &mut self,
        caller: &Address,
        selector: Selector,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        let usd_fee = self.fee_usd(&selector);
        self.fees.insert(selector, U256::zero());
        Ok(Event::AdminRemovedFee { selector, usd_fee })
    }

    // ------------------------------------------------------------------
    // Identities and roles
    // ------------------------------------------------------------------

    /// Replaces the association, moving the platform-admin role with it.
    pub fn set_association(
        &mut self,
        caller: &Address,
        association: Address,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        ensure_nonzero(&association)?;
        let previous = self.association;
        self.access.revoke(&previous, Role::PlatformAdmin);
        self.access.grant(association, Role::PlatformAdmin)?;
        self.association = association;
        Ok(Event::AssociationUpdated {
            previous,
            current: association,
        })
    }

    /// Replaces the developer, moving the developer-admin role with it.
    pub fn set_developer(&mut self, caller: &Address, developer: Address) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::PlatformAdmin)?;
        ensure_nonzero(&developer)?;
        let previous = self.developer;
        self.access.revoke(&previous, Role::DeveloperAdmin);
        self.access.grant(developer, Role::DeveloperAdmin)?;
        self.developer = developer;
        Ok(Event::DeveloperUpdated {
            previous,
            current: developer,
        })
    }

    /// Replaces the developer fee collector.
    pub fn set_fee_collector(
        &mut self,
        caller: &Address,
        fee_collector: Address,
    ) -> Result<Event, FeeError> {
        self.access.ensure(caller, Role::DeveloperAdmin)?;
        ensure_nonzero(&fee_collector)?;
        let previous = self.fee_collector;
        self.fee_collector = fee_collector;
        Ok(Event::FeeCollectorUpdated {
            previous,
            current: fee_collector,
        })
    }

    /// Grants a gateway role.
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

    /// Revokes a gateway role.
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
