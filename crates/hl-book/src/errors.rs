//! Order book error types.

use hl_markets::MarketError;
use thiserror::Error;

/// Order book error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BookError {
    /// The order failed market validation.
    #[error("invalid order: {0}")]
    InvalidOrder(MarketError),

    /// The market is not accepting orders.
    #[error("market inactive: {0}")]
    MarketInactive(String),

    /// An add-liquidity-only order would have taken liquidity.
    #[error("ALO order would cross the book")]
    AloCrossed,

    /// An order with this id is already resting in the book.
    #[error("duplicate order id: {0}")]
    DuplicateOrderId(u64),
}

impl From<MarketError> for BookError {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::MarketInactive { symbol, .. } => BookError::MarketInactive(symbol),
            other => BookError::InvalidOrder(other),
        }
    }
}
