//! Ledger error types.

use shared_types::Address;
use thiserror::Error;

/// Account ledger error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No account exists at the address.
    #[error("unknown account: {0}")]
    UnknownAccount(Address),

    /// Deposit/withdraw amount must be positive.
    #[error("amount must be positive")]
    InvalidAmount,

    /// Free balance (balance - locked) cannot cover the request.
    #[error("insufficient available balance: need {need}, have {available}")]
    InsufficientAvailable { need: u128, available: u128 },

    /// Attempted to unlock more collateral than is locked.
    #[error("unlock {amount} exceeds locked collateral {locked}")]
    InsufficientLocked { amount: u128, locked: u128 },

    /// Required initial margin exceeds available balance.
    #[error("insufficient margin: required {required}, available {available}")]
    InsufficientMargin { required: u128, available: u128 },

    /// The resulting position would exceed the market's maximum.
    #[error("position {would_be} would exceed max {max}")]
    MaxPosition { would_be: u64, max: u64 },

    /// Aggregate notional over total balance would exceed max leverage.
    #[error("leverage would exceed {max_leverage}x")]
    LeverageExceeded { max_leverage: u32 },

    /// Transaction nonce is not strictly increasing.
    #[error("replayed nonce {got}: account nonce is already {current}")]
    ReplayedNonce { got: u64, current: u64 },
}
