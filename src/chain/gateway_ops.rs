//! Application registry and fee gateway entry points.

use super::Chain;
use crate::access::Role;
use crate::config::GatewayConfig;
use crate::error::FeeError;
use crate::events::Event;
use crate::gateway::{FeeGateway, ProposalView};
use crate::ledger::DevFeeBounds;
use crate::types::{Address, Selector};
use primitive_types::U256;

impl Chain {
    fn gateway_op<R>(
        &mut self,
        application: &Address,
        op: impl FnOnce(&mut FeeGateway, &DevFeeBounds) -> Result<R, FeeError>,
        into_events: impl FnOnce(R) -> Vec<Event>,
    ) -> Result<(), FeeError> {
        self.transact(|chain| {
            let bounds = chain.state.ledger.bounds().clone();
            let outcome = op(chain.gateway_mut(application)?, &bounds)?;
            for event in into_events(outcome) {
                chain.emit(*application, event);
            }
            Ok(())
        })
    }

    fn single(
        &mut self,
        application: &Address,
        op: impl FnOnce(&mut FeeGateway) -> Result<Event, FeeError>,
    ) -> Result<(), FeeError> {
        self.gateway_op(application, |gateway, _| op(gateway), |event| vec![event])
    }

    fn batch(
        &mut self,
        application: &Address,
        op: impl FnOnce(&mut FeeGateway) -> Result<Vec<Event>, FeeError>,
    ) -> Result<(), FeeError> {
        self.gateway_op(application, |gateway, _| op(gateway), |events| events)
    }

    /// Deploys a gateway for `config.application`, installing any seeded
    /// fees against the ledger's current bounds.
    pub fn register_application(&mut self, config: &GatewayConfig) -> Result<(), FeeError> {
        self.transact(|chain| {
            let application = config.application;
            if chain.state.applications.contains_key(&application) {
                return Err(FeeError::ApplicationExists(application));
            }
            let gateway = FeeGateway::new(config, chain.state.ledger.bounds())?;
            chain.state.applications.insert(application, gateway);
            chain.emit(
                application,
                Event::ApplicationRegistered {
                    application,
                    developer: config.developer,
                },
            );
            for seed in &config.fees {
                chain.emit(
                    application,
                    Event::FeeSet {
                        signature: seed.signature.clone(),
                        usd_fee: seed.usd_fee,
                    },
                );
            }
            Ok(())
        })
    }

    /// Addresses of every registered application.
    pub fn applications(&self) -> impl Iterator<Item = &Address> {
        self.state.applications.keys()
    }

    /// USD fee configured for `signature` on `application`.
    pub fn fee_usd(&self, application: &Address, signature: &str) -> Result<U256, FeeError> {
        Ok(self.gateway(application)?.fee_usd_for(signature))
    }

    /// Queue snapshot of `application`.
    pub fn pending_proposals(&self, application: &Address) -> Result<Vec<ProposalView>, FeeError> {
        Ok(self.gateway(application)?.pending_proposals())
    }

    /// Queues a fee proposal. Developer admin only.
    pub fn propose_fee(
        &mut self,
        application: &Address,
        caller: &Address,
        usd_fee: U256,
        signature: &str,
    ) -> Result<(), FeeError> {
        self.gateway_op(
            application,
            |gateway, bounds| gateway.propose_fee(caller, bounds, usd_fee, signature),
            |event| vec![event],
        )
    }

    /// Queues several fee proposals. Developer admin only.
    pub fn propose_fees(
        &mut self,
        application: &Address,
        caller: &Address,
        usd_fees: &[U256],
        signatures: &[String],
    ) -> Result<(), FeeError> {
        self.gateway_op(
            application,
            |gateway, bounds| gateway.propose_fees(caller, bounds, usd_fees, signatures),
            |events| events,
        )
    }

    /// Approves the proposal at `index`. Platform admin only.
    pub fn approve_fee(&mut self, application: &Address, caller: &Address, index: usize) -> Result<(), FeeError> {
        self.single(application, |gateway| gateway.approve_fee(caller, index))
    }

    /// Rejects the proposal at `index`. Platform admin only.
    pub fn reject_fee(&mut self, application: &Address, caller: &Address, index: usize) -> Result<(), FeeError> {
        self.single(application, |gateway| gateway.reject_fee(caller, index))
    }

    /// Approves the whole queue. Platform admin only.
    pub fn approve_all_fees(&mut self, application: &Address, caller: &Address) -> Result<(), FeeError> {
        self.batch(application, |gateway| gateway.approve_all_fees(caller))
    }

    /// Rejects the whole queue. Platform admin only.
    pub fn reject_all_fees(&mut self, application: &Address, caller: &Address) -> Result<(), FeeError> {
        self.batch(application, |gateway| gateway.reject_all_fees(caller))
    }

    /// Decides the whole queue, one flag per entry. Platform admin only.
    pub fn review_fees(
        &mut self,
        application: &Address,
        caller: &Address,
        decisions: &[bool],
    ) -> Result<(), FeeError> {
        self.batch(application, |gateway| gateway.review_fees(caller, decisions))
    }

    /// Zeroes a function fee directly. Platform admin only.
    pub fn remove_fee_admin(
        &mut self,
        application: &Address,
        caller: &Address,
        selector: Selector,
    ) -> Result<(), FeeError> {
        self.single(application, |gateway| gateway.remove_fee_admin(caller, selector))
    }

    /// Replaces the association of `application`.
    pub fn set_association(
        &mut self,
        application: &Address,
        caller: &Address,
        association: Address,
    ) -> Result<(), FeeError> {
        self.single(application, |gateway| gateway.set_association(caller, association))
    }

    /// Replaces the developer of `application`.
    pub fn set_developer(
        &mut self,
        application: &Address,
        caller: &Address,
        developer: Address,
    ) -> Result<(), FeeError> {
        self.single(application, |gateway| gateway.set_developer(caller, developer))
    }

    /// Replaces the developer fee collector of `application`.
    pub fn set_fee_collector(
        &mut self,
        application: &Address,
        caller: &Address,
        fee_collector: Address,
    ) -> Result<(), FeeError> {
        self.single(application, |gateway| gateway.set_fee_collector(caller, fee_collector))
    }

    /// Grants a gateway role on `application`.
    pub fn grant_gateway_role(
        &mut self,
        application: &Address,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<(), FeeError> {
        self.single(application, |gateway| gateway.grant_role(caller, role, account))
    }

    /// Revokes a gateway role on `application`.
    pub fn revoke_gateway_role(
        &mut self,
        application: &Address,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<(), FeeError> {
        self.single(application, |gateway| gateway.revoke_role(caller, role, account))
    }
}
