//! Account addresses and function selectors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of an account address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Length of a function selector in bytes.
pub const SELECTOR_LENGTH: usize = 4;

/// A 20-byte account address, rendered as lowercase `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_LENGTH]);

impl Address {
    /// The zero address; never a valid participant.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Returns true for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Builds a deterministic address whose last eight bytes hold `n`.
    ///
    /// Handy for fixtures and genesis files where readable addresses matter
    /// more than derivation.
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 8..].copy_from_slice(&n.to_be_bytes());
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Failure to decode an address or selector from hex.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {reason}")]
pub struct ParseHexError {
    kind: &'static str,
    reason: String,
}

fn decode_prefixed<const N: usize>(input: &str, kind: &'static str) -> Result<[u8; N], ParseHexError> {
    let trimmed = input.trim();
    let raw = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| ParseHexError {
            kind,
            reason: "missing 0x prefix".into(),
        })?;
    let bytes = hex::decode(raw).map_err(|err| ParseHexError {
        kind,
        reason: err.to_string(),
    })?;
    bytes.as_slice().try_into().map_err(|_| ParseHexError {
        kind,
        reason: format!("expected {N} bytes, got {}", bytes.len()),
    })
}

impl FromStr for Address {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed::<ADDRESS_LENGTH>(s, "address").map(Address)
    }
}

impl TryFrom<String> for Address {
    type Error = ParseHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

/// The first four bytes of the Keccak-256 hash of a function signature.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector(pub [u8; SELECTOR_LENGTH]);

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({self})")
    }
}

impl FromStr for Selector {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_prefixed::<SELECTOR_LENGTH>(s, "selector").map(Selector)
    }
}

impl TryFrom<String> for Selector {
    type Error = ParseHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Selector> for String {
    fn from(value: Selector) -> Self {
        value.to_string()
    }
}
