//! Notifications emitted for off-chain indexers and user interfaces.

use crate::access::Role;
use crate::types::{Address, Selector};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// A single notification. Amounts are raw 18-decimal integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// The ledger refreshed its oracle quote.
    PriceUpdated {
        /// New native-token price of the platform fee.
        native_fee: U256,
        /// New native amount per USD unit.
        native_per_usd: U256,
        /// Next timestamp after which a refresh is allowed.
        next_refresh_at: u64,
        /// End of the grace window opened by this refresh.
        grace_ends_at: u64,
    },
    /// A client paid the platform's own metered fee.
    PlatformFeePaid {
        /// Paying account.
        payer: Address,
        /// Native amount retained by the ledger.
        amount: U256,
    },
    /// Minimum developer fee changed.
    MinFeeUpdated {
        /// New lower bound in USD.
        min_fee_usd: U256,
    },
    /// Maximum developer fee changed.
    MaxFeeUpdated {
        /// New upper bound in USD.
        max_fee_usd: U256,
    },
    /// The oracle adapter was replaced.
    OracleUpdated {
        /// Label of the new adapter.
        name: String,
    },
    /// The platform fee in USD changed.
    FeeUsdUpdated {
        /// New fee in USD.
        fee_usd: U256,
    },
    /// The association's share of developer fees changed.
    AssociationShareUpdated {
        /// New fixed-point fraction.
        share: U256,
    },
    /// Grace window length changed.
    GracePeriodUpdated {
        /// New length in seconds.
        seconds: u64,
    },
    /// Price refresh epoch length changed.
    FeeUpdateEpochUpdated {
        /// New length in seconds.
        seconds: u64,
    },
    /// Distribution epoch length changed.
    DistributionEpochUpdated {
        /// New length in seconds.
        seconds: u64,
    },
    /// An application opted in to or out of grace pricing.
    GraceParticipantUpdated {
        /// Application address.
        application: Address,
        /// Whether grace pricing applies.
        enabled: bool,
    },
    /// A payout channel was added.
    ChannelAdded {
        /// Channel address.
        channel: Address,
        /// Channel weight.
        weight: U256,
        /// Sum of weights after the change.
        total_shares: U256,
    },
    /// A payout channel's weight changed.
    ChannelAdjusted {
        /// Channel address.
        channel: Address,
        /// New weight.
        weight: U256,
        /// Sum of weights after the change.
        total_shares: U256,
    },
    /// A payout channel was removed.
    ChannelRemoved {
        /// Channel address.
        channel: Address,
        /// Weight the channel held.
        weight: U256,
        /// Sum of weights after the change.
        total_shares: U256,
    },
    /// One channel payment out of a distribution sweep.
    FeeDistributed {
        /// Channel paid.
        recipient: Address,
        /// Native amount paid.
        amount: U256,
    },
    /// A metered call was charged.
    FeeCharged {
        /// Function signature of the metered entry point.
        signature: String,
        /// Native amount routed to the ledger.
        platform_share: U256,
        /// Native amount routed to the developer collector.
        developer_share: U256,
    },
    /// A developer queued a fee proposal.
    FeeProposed {
        /// Function signature.
        signature: String,
        /// Proposed USD fee.
        usd_fee: U256,
    },
    /// A proposal was approved and written into the live fee table.
    FeeSet {
        /// Function signature.
        signature: String,
        /// Approved USD fee.
        usd_fee: U256,
    },
    /// A proposal was rejected.
    FeeRejected {
        /// Function signature.
        signature: String,
        /// Rejected USD fee.
        usd_fee: U256,
    },
    /// A platform admin zeroed a function fee directly.
    AdminRemovedFee {
        /// Selector whose fee was removed.
        selector: Selector,
        /// USD fee in force before removal.
        usd_fee: U256,
    },
    /// A gateway instance was registered on the chain.
    ApplicationRegistered {
        /// Application address.
        application: Address,
        /// Developer of the application.
        developer: Address,
    },
    /// The association address of a gateway changed.
    AssociationUpdated {
        /// Previous association.
        previous: Address,
        /// New association.
        current: Address,
    },
    /// The developer address of a gateway changed.
    DeveloperUpdated {
        /// Previous developer.
        previous: Address,
        /// New developer.
        current: Address,
    },
    /// The developer fee collector of a gateway changed.
    FeeCollectorUpdated {
        /// Previous collector.
        previous: Address,
        /// New collector.
        current: Address,
    },
    /// A role was granted.
    RoleGranted {
        /// Role granted.
        role: Role,
        /// Account receiving the role.
        account: Address,
        /// Account that granted it.
        sender: Address,
    },
    /// A role was revoked.
    RoleRevoked {
        /// Role revoked.
        role: Role,
        /// Account losing the role.
        account: Address,
        /// Account that revoked it.
        sender: Address,
    },
}

/// An event together with the component that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Address of the emitting ledger or application.
    pub source: Address,
    /// Chain time at emission.
    pub timestamp: u64,
    /// The notification itself.
    pub event: Event,
}
