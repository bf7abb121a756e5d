//! Pure checks and conversions shared by the ledger and the gateways.

use crate::error::FeeError;
use crate::types::{Address, Selector, SELECTOR_LENGTH};
use primitive_types::U256;
use sha3::{Digest, Keccak256};

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Derives the 4-byte selector of a function signature such as
/// `"transfer(address,uint256)"`.
///
/// The signature is hashed verbatim; callers are expected to pass the
/// canonical form without spaces or parameter names.
pub fn selector_of(signature: &str) -> Selector {
    let digest = keccak256(signature.as_bytes());
    let mut out = [0u8; SELECTOR_LENGTH];
    out.copy_from_slice(&digest[..SELECTOR_LENGTH]);
    Selector(out)
}

/// Fails with [`FeeError::InvalidAddress`] for the zero address.
pub fn ensure_nonzero(address: &Address) -> Result<(), FeeError> {
    if address.is_zero() {
        Err(FeeError::InvalidAddress)
    } else {
        Ok(())
    }
}

/// Accepts `fee` when it is zero or lies within `[min, max]`.
pub fn check_fee_bounds(fee: U256, min: U256, max: U256) -> Result<(), FeeError> {
    if fee.is_zero() || (fee >= min && fee <= max) {
        Ok(())
    } else {
        Err(FeeError::InvalidFeeAmount {
            amount: fee,
            min,
            max,
        })
    }
}

/// Clamps a configured USD fee into `[min, max]`.
///
/// Zero means "no fee" and is returned unchanged.
pub fn clamp_fee(fee: U256, min: U256, max: U256) -> U256 {
    if fee.is_zero() {
        fee
    } else if fee < min {
        min
    } else if fee > max {
        max
    } else {
        fee
    }
}

/// Ensures paired inputs have equal, non-zero lengths.
pub fn ensure_paired_lengths(expected: usize, actual: usize) -> Result<(), FeeError> {
    if expected == 0 || actual == 0 {
        return Err(FeeError::EmptyInput);
    }
    if expected != actual {
        return Err(FeeError::ArrayLengthMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::whole;
    use proptest::prelude::*;

    #[test]
    fn known_selectors() {
        assert_eq!(
            selector_of("transfer(address,uint256)").to_string(),
            "0xa9059cbb"
        );
        assert_eq!(selector_of("balanceOf(address)").to_string(), "0x70a08231");
    }

    #[test]
    fn bounds_exempt_zero() {
        let (min, max) = (whole(1), whole(3));
        assert!(check_fee_bounds(U256::zero(), min, max).is_ok());
        assert!(check_fee_bounds(whole(2), min, max).is_ok());
        assert!(check_fee_bounds(whole(3), min, max).is_ok());
        assert_eq!(
            check_fee_bounds(whole(5), min, max),
            Err(FeeError::InvalidFeeAmount {
                amount: whole(5),
                min,
                max
            })
        );
        assert!(check_fee_bounds(whole(1) / 2, min, max).is_err());
    }

    #[test]
    fn clamp_raises_floor_and_caps() {
        let (min, max) = (whole(1), whole(3));
        assert_eq!(clamp_fee(whole(1) / 2, min, max), min);
        assert_eq!(clamp_fee(whole(5), min, max), max);
        assert_eq!(clamp_fee(whole(2), min, max), whole(2));
        assert_eq!(clamp_fee(U256::zero(), min, max), U256::zero());
    }

    #[test]
    fn paired_lengths() {
        assert!(ensure_paired_lengths(2, 2).is_ok());
        assert_eq!(ensure_paired_lengths(0, 0), Err(FeeError::EmptyInput));
        assert_eq!(
            ensure_paired_lengths(2, 3),
            Err(FeeError::ArrayLengthMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    proptest! {
        #[test]
        fn clamp_is_idempotent(fee in any::<u64>(), lo in 1u64..1_000, span in 0u64..1_000) {
            let (min, max) = (U256::from(lo), U256::from(lo + span));
            let once = clamp_fee(U256::from(fee), min, max);
            prop_assert_eq!(clamp_fee(once, min, max), once);
            if fee == 0 {
                prop_assert!(once.is_zero());
            } else {
                prop_assert!(once >= min && once <= max);
            }
        }
    }
}
