//! Market registry error types.

use crate::market::MarketStatus;
use thiserror::Error;

/// Market registry error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MarketError {
    /// No market registered under the symbol.
    #[error("unknown market: {0}")]
    UnknownMarket(String),

    /// A market already exists under the symbol.
    #[error("duplicate market: {0}")]
    DuplicateMarket(String),

    /// Market parameters violate a structural invariant.
    #[error("invalid market parameters for {symbol}: {reason}")]
    InvalidParameters { symbol: String, reason: String },

    /// The requested status change is not a legal transition.
    #[error("invalid status transition for {symbol}: {from:?} -> {to:?}")]
    InvalidStatusTransition {
        symbol: String,
        from: MarketStatus,
        to: MarketStatus,
    },

    /// The market is not accepting orders.
    #[error("market {symbol} is not active (status {status:?})")]
    MarketInactive {
        symbol: String,
        status: MarketStatus,
    },

    /// Order price or quantity is zero.
    #[error("order price and quantity must be positive")]
    NonPositiveOrder,

    /// Order size is outside the market's min/max bounds.
    #[error("order size {qty} outside bounds [{min}, {max}]")]
    SizeOutOfBounds { qty: u64, min: u64, max: u64 },

    /// Order notional is below the market minimum.
    #[error("order notional {notional} below minimum {min}")]
    NotionalTooSmall { notional: u128, min: u128 },
}
