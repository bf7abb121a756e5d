#![deny(missing_docs)]

//! # fee_ledger
//!
//! **fee_ledger** meters application entry points in USD and settles the
//! charges in a chain's native token. It has two cooperating components:
//!
//! * a single platform-wide [`FeeLedger`] holding the oracle-derived
//!   native/USD quote (with a grace window after every refresh), the bounds
//!   every developer fee must respect, and the weighted payout channels the
//!   platform's share is periodically distributed to;
//! * one [`FeeGateway`] per application, holding a function-selector fee
//!   table that developers change through a propose → approve/reject
//!   workflow decided by the platform.
//!
//! Both are pure state machines. The [`Chain`] host owns them together with
//! the native balance book, runs every operation as an all-or-nothing
//! transaction, and delivers native transfers to hookable recipients so that
//! untrusted channel, collector and caller code can be modelled.
//!
//! ## Numeric convention
//!
//! USD amounts, fractions and native amounts are [`U256`] fixed-point values
//! with 18 decimals ([`units::SCALE`]). Every product goes through a 512-bit
//! intermediate and divisions truncate toward zero.
//!
//! ## Usage
//!
//! ```rust
//! use fee_ledger::{units::whole, Address, Call, Chain, GatewayConfig, LedgerConfig, ManualOracle};
//!
//! let admin = Address::from_low_u64(1);
//! let ledger = Address::from_low_u64(0xfe);
//! let app = Address::from_low_u64(0xaa);
//! let user = Address::from_low_u64(0x10);
//!
//! // One USD is worth two native tokens.
//! let oracle = ManualOracle::new("manual", whole(2));
//! let mut chain = Chain::new(&LedgerConfig::new(ledger, admin), oracle, 0)?;
//! chain.register_application(
//!     &GatewayConfig::new(app, admin, Address::from_low_u64(3), Address::from_low_u64(4))
//!         .with_fee("increment()", whole(1)),
//! )?;
//! chain.deposit(user, whole(10));
//!
//! let fee = chain.adjusted_fee(&app, "increment()")?;
//! assert_eq!(fee, whole(2));
//! chain.call_metered(app, &Call::new(user, "increment()").with_value(fee), |_, _| Ok(()))?;
//! // The default association share is one half.
//! assert_eq!(chain.balance_of(&ledger), whole(1));
//! # Ok::<(), fee_ledger::FeeError>(())
//! ```

pub mod access;
pub mod bank;
pub mod chain;
pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod ledger;
pub mod oracle;
pub mod snapshot;
pub mod types;
pub mod units;
pub mod validation;

pub use access::{AccessControl, Role};
pub use bank::Bank;
pub use chain::{Call, Chain, ChainState, MeteredCall, ReceiveHook};
pub use config::{ChannelConfig, ConfigError, GatewayConfig, LedgerConfig, SeedFee};
pub use error::FeeError;
pub use events::{Event, EventRecord};
pub use gateway::{FeeGateway, Proposal, ProposalView};
pub use ledger::{Channel, DevFeeBounds, FeeLedger, FeeQuote, MAX_CHANNELS};
pub use oracle::{ManualOracle, PriceOracle};
pub use primitive_types::U256;
pub use snapshot::{migrate, read_state, write_state, SnapshotError, StateBlob, STATE_SCHEMA};
pub use types::{Address, Selector};
pub use validation::selector_of;
