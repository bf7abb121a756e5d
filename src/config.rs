//! Deployment parameters for the fee ledger and for application gateways.
//!
//! Both configs deserialize from JSON. USD amounts and fractions are written
//! as decimal strings (`"0.5"` is half a USD, or a 50% share):
//!
//! ```json
//! {
//!   "address": "0x00000000000000000000000000000000000000fe",
//!   "admin": "0x0000000000000000000000000000000000000001",
//!   "fee_usd": "1",
//!   "min_dev_fee_usd": "0.1",
//!   "max_dev_fee_usd": "100",
//!   "association_share": "0.3",
//!   "channels": [{ "address": "0x00000000000000000000000000000000000000c1", "weight": 1 }]
//! }
//! ```

use crate::error::FeeError;
use crate::ledger::MAX_CHANNELS;
use crate::types::Address;
use crate::units::{self, whole, SCALE};
use crate::validation::{check_fee_bounds, ensure_nonzero};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    /// Filesystem failure.
    Io(String),
    #[error("config decode error: {0}")]
    /// JSON could not be decoded into the config type.
    Decode(String),
    #[error("invalid config: {0}")]
    /// Decoded values violate a ledger invariant.
    Invalid(#[from] FeeError),
}

fn default_fee_usd() -> U256 {
    whole(1)
}

fn default_max_dev_fee_usd() -> U256 {
    whole(1_000)
}

fn default_association_share() -> U256 {
    SCALE / 2
}

fn default_fee_update_epoch() -> u64 {
    60 * 60
}

fn default_distribution_epoch() -> u64 {
    24 * 60 * 60
}

fn default_grace_period() -> u64 {
    5 * 60
}

/// A payout channel declared at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel address.
    pub address: Address,
    /// Relative weight.
    pub weight: u64,
}

/// Parameters of the platform-wide fee ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Address at which the ledger holds its native balance.
    pub address: Address,
    /// Initial platform admin.
    pub admin: Address,
    /// Optional operator allowed to force distributions.
    #[serde(default)]
    pub operator: Option<Address>,
    /// Price of the platform's own metered action, in USD.
    #[serde(with = "units::decimal", default = "default_fee_usd")]
    pub fee_usd: U256,
    /// Lower bound for developer fees, in USD.
    #[serde(with = "units::decimal", default)]
    pub min_dev_fee_usd: U256,
    /// Upper bound for developer fees, in USD.
    #[serde(with = "units::decimal", default = "default_max_dev_fee_usd")]
    pub max_dev_fee_usd: U256,
    /// Fraction of each developer charge routed to the ledger.
    #[serde(with = "units::decimal", default = "default_association_share")]
    pub association_share: U256,
    /// Minimum seconds between oracle refreshes.
    #[serde(default = "default_fee_update_epoch")]
    pub fee_update_epoch: u64,
    /// Minimum seconds between permissionless distributions.
    #[serde(default = "default_distribution_epoch")]
    pub distribution_epoch: u64,
    /// Seconds after a refresh during which grace pricing applies.
    #[serde(default = "default_grace_period")]
    pub grace_period: u64,
    /// Payout channels installed at genesis.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    /// Applications opted in to grace pricing at genesis.
    #[serde(default)]
    pub grace_participants: Vec<Address>,
}

impl LedgerConfig {
    /// Config with default economics for the given ledger and admin addresses.
    pub fn new(address: Address, admin: Address) -> Self {
        Self {
            address,
            admin,
            operator: None,
            fee_usd: default_fee_usd(),
            min_dev_fee_usd: U256::zero(),
            max_dev_fee_usd: default_max_dev_fee_usd(),
            association_share: default_association_share(),
            fee_update_epoch: default_fee_update_epoch(),
            distribution_epoch: default_distribution_epoch(),
            grace_period: default_grace_period(),
            channels: Vec::new(),
            grace_participants: Vec::new(),
        }
    }

    /// Loads and validates a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::from_json(&contents)
    }

    /// Decodes and validates a JSON document.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(contents).map_err(|err| ConfigError::Decode(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks addresses, fee bounds, share and channel limits.
    pub fn validate(&self) -> Result<(), FeeError> {
        ensure_nonzero(&self.address)?;
        ensure_nonzero(&self.admin)?;
        if let Some(operator) = &self.operator {
            ensure_nonzero(operator)?;
        }
        if self.min_dev_fee_usd > self.max_dev_fee_usd {
            return Err(FeeError::InvalidFeeAmount {
                amount: self.min_dev_fee_usd,
                min: U256::zero(),
                max: self.max_dev_fee_usd,
            });
        }
        if self.association_share > SCALE {
            return Err(FeeError::InvalidFraction(self.association_share));
        }
        if self.channels.len() > MAX_CHANNELS {
            return Err(FeeError::ChannelLimitReached {
                limit: MAX_CHANNELS,
            });
        }
        for (idx, channel) in self.channels.iter().enumerate() {
            ensure_nonzero(&channel.address)?;
            if channel.weight == 0 {
                return Err(FeeError::InvalidWeight);
            }
            if self.channels[..idx]
                .iter()
                .any(|prior| prior.address == channel.address)
            {
                return Err(FeeError::ChannelExists(channel.address));
            }
        }
        for participant in &self.grace_participants {
            ensure_nonzero(participant)?;
        }
        Ok(())
    }
}

/// A function fee seeded at application registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFee {
    /// Canonical function signature, e.g. `"mint(uint256)"`.
    pub signature: String,
    /// USD price.
    #[serde(with = "units::decimal")]
    pub usd_fee: U256,
}

/// Parameters of one application's fee gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address of the application embedding the gateway.
    pub application: Address,
    /// Platform association; receives the platform-admin role.
    pub association: Address,
    /// Application developer; receives the developer-admin role.
    pub developer: Address,
    /// Recipient of the developer share of each charge.
    pub fee_collector: Address,
    /// Return the application's whole remaining balance to the caller after
    /// each metered call. Never enable this for applications that hold
    /// balances across calls.
    #[serde(default)]
    pub refund_remaining_balance: bool,
    /// Function fees installed without a proposal round.
    #[serde(default)]
    pub fees: Vec<SeedFee>,
}

impl GatewayConfig {
    /// Config with no seeded fees and refunds disabled.
    pub fn new(
        application: Address,
        association: Address,
        developer: Address,
        fee_collector: Address,
    ) -> Self {
        Self {
            application,
            association,
            developer,
            fee_collector,
            refund_remaining_balance: false,
            fees: Vec::new(),
        }
    }

    /// Adds a seeded function fee.
    pub fn with_fee(mut self, signature: impl Into<String>, usd_fee: U256) -> Self {
        self.fees.push(SeedFee {
            signature: signature.into(),
            usd_fee,
        });
        self
    }

    /// Enables the refund-remaining-balance sweep.
    pub fn refunding(mut self) -> Self {
        self.refund_remaining_balance = true;
        self
    }

    /// Loads a JSON config file. Bounds are checked at registration, when
    /// the ledger's limits are known.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        serde_json::from_str(&contents).map_err(|err| ConfigError::Decode(err.to_string()))
    }

    /// Checks addresses and seeded fees against the given bounds.
    pub fn validate(&self, min: U256, max: U256) -> Result<(), FeeError> {
        ensure_nonzero(&self.application)?;
        ensure_nonzero(&self.association)?;
        ensure_nonzero(&self.developer)?;
        ensure_nonzero(&self.fee_collector)?;
        for seed in &self.fees {
            check_fee_bounds(seed.usd_fee, min, max)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SAMPLE: &str = r#"{
        "address": "0x00000000000000000000000000000000000000fe",
        "admin": "0x0000000000000000000000000000000000000001",
        "fee_usd": "2.5",
        "min_dev_fee_usd": "1",
        "max_dev_fee_usd": "3",
        "association_share": "0.25",
        "channels": [
            { "address": "0x00000000000000000000000000000000000000c1", "weight": 1 },
            { "address": "0x00000000000000000000000000000000000000c2", "weight": 3 }
        ]
    }"#;

    #[test]
    fn decodes_decimal_strings_and_defaults() {
        let config = LedgerConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.fee_usd, SCALE * 5 / 2);
        assert_eq!(config.min_dev_fee_usd, whole(1));
        assert_eq!(config.association_share, SCALE / 4);
        assert_eq!(config.fee_update_epoch, 3_600);
        assert_eq!(config.distribution_epoch, 86_400);
        assert_eq!(config.grace_period, 300);
        assert_eq!(config.channels.len(), 2);
        assert!(config.operator.is_none());
    }

    #[test]
    fn rejects_inverted_bounds() {
        let raw = SAMPLE.replace("\"min_dev_fee_usd\": \"1\"", "\"min_dev_fee_usd\": \"4\"");
        assert!(matches!(
            LedgerConfig::from_json(&raw),
            Err(ConfigError::Invalid(FeeError::InvalidFeeAmount { .. }))
        ));
    }

    #[test]
    fn rejects_share_above_one() {
        let raw = SAMPLE.replace("\"0.25\"", "\"1.5\"");
        assert!(matches!(
            LedgerConfig::from_json(&raw),
            Err(ConfigError::Invalid(FeeError::InvalidFraction(_)))
        ));
    }

    #[test]
    fn rejects_duplicate_channels() {
        let raw = SAMPLE.replace("c2", "c1");
        assert!(matches!(
            LedgerConfig::from_json(&raw),
            Err(ConfigError::Invalid(FeeError::ChannelExists(_)))
        ));
    }

    #[test]
    fn gateway_config_round_trips_through_file() {
        let config = GatewayConfig::new(
            Address::from_low_u64(10),
            Address::from_low_u64(1),
            Address::from_low_u64(2),
            Address::from_low_u64(3),
        )
        .with_fee("increment()", SCALE / 2);
        let mut path = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!("gateway_config_{nanos}.json"));
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
        let loaded = GatewayConfig::from_path(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(loaded.validate(whole(1), whole(3)).is_err());
        assert!(loaded.validate(U256::zero(), whole(3)).is_ok());
    }
}
