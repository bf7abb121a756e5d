//! Named failure conditions raised by the fee ledger and fee gateways.

use crate::access::Role;
use crate::types::Address;
use primitive_types::U256;
use thiserror::Error;

/// Every failure the core surfaces to a caller.
///
/// Preconditions are checked before any state is touched, and the host
/// reverts the whole transaction on any of these, so a caller observing an
/// error can assume nothing was applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeError {
    #[error("insufficient funds: balance {balance}, required {required}")]
    /// Supplied value and contract balance are both below the required fee.
    InsufficientFunds {
        /// Balance observed when the check failed.
        balance: U256,
        /// Native amount that was required.
        required: U256,
    },
    #[error("invalid fee amount {amount} (bounds {min}..={max})")]
    /// A USD fee falls outside the configured developer-fee bounds.
    InvalidFeeAmount {
        /// Offending USD amount.
        amount: U256,
        /// Lower bound in force.
        min: U256,
        /// Upper bound in force.
        max: U256,
    },
    #[error("invalid fraction {0}: must not exceed 1.0")]
    /// A fixed-point fraction above `SCALE`.
    InvalidFraction(U256),
    #[error("invalid address: zero address not allowed")]
    /// The zero address was supplied where a participant is required.
    InvalidAddress,
    #[error("array length mismatch: expected {expected}, got {actual}")]
    /// Paired inputs differ in length.
    ArrayLengthMismatch {
        /// Length the operation required.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },
    #[error("empty input where at least one element is required")]
    /// A batch input was empty.
    EmptyInput,
    #[error("index {index} out of bounds for queue of length {len}")]
    /// A proposal index at or beyond the queue length.
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Queue length at the time of the call.
        len: usize,
    },
    #[error("channel {0} not found")]
    /// Channel mutation targeted an unknown address.
    ChannelNotFound(Address),
    #[error("channel {0} already registered")]
    /// Channel addresses are unique.
    ChannelExists(Address),
    #[error("channel limit of {limit} reached")]
    /// The channel table is full.
    ChannelLimitReached {
        /// Maximum number of channels.
        limit: usize,
    },
    #[error("channel weight must be greater than zero")]
    /// A zero channel weight.
    InvalidWeight,
    #[error("no payout channels configured")]
    /// Distribution requested with an empty channel table.
    NoChannels,
    #[error("fee transfer of {amount} to {recipient} failed")]
    /// A native-token push transfer did not succeed.
    TransferFailed {
        /// Intended recipient.
        recipient: Address,
        /// Amount that could not be delivered.
        amount: U256,
    },
    #[error("epoch not elapsed: next allowed after {ready_at} (now {now})")]
    /// A gated operation attempted before its epoch elapsed.
    EpochNotElapsed {
        /// Timestamp that must be exceeded.
        ready_at: u64,
        /// Timestamp observed by the call.
        now: u64,
    },
    #[error("account {account} is missing role {role}")]
    /// Caller lacks the role an operation requires.
    MissingRole {
        /// Calling account.
        account: Address,
        /// Role that was required.
        role: Role,
    },
    #[error("reentrant call rejected")]
    /// A guarded operation was re-entered before it completed.
    Reentrancy,
    #[error("no application registered at {0}")]
    /// Gateway lookup failed.
    UnknownApplication(Address),
    #[error("application already registered at {0}")]
    /// Gateway registration collided with an existing instance.
    ApplicationExists(Address),
    #[error("arithmetic overflow")]
    /// A fixed-point product did not fit in 256 bits.
    Overflow,
    #[error("division by zero")]
    /// A fixed-point quotient with a zero denominator.
    DivisionByZero,
    #[error("invalid fixed-point value: {0}")]
    /// A decimal string could not be parsed as an 18-decimal value.
    InvalidFixedPoint(String),
    #[error("rejected: {0}")]
    /// Failure raised by application logic or a receive hook.
    Rejected(String),
}
