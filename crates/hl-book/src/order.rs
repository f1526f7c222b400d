//! Order domain entities.

use serde::{Deserialize, Serialize};
use shared_types::Address;

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Signed direction: +1 for buy, -1 for sell.
    pub fn sign(&self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

/// Order time-in-force / liquidity class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Good-til-cancelled: match, then rest any remainder.
    Gtc,
    /// Immediate-or-cancel: match, discard any remainder.
    Ioc,
    /// Add-liquidity-only: must never take; rejected if it would cross.
    Alo,
}

/// An order as submitted to the book.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub symbol: String,
    pub side: Side,
    /// Limit price in integer ticks.
    pub price: u64,
    /// Quantity in integer lots.
    pub qty: u64,
    pub order_type: OrderType,
    pub owner: Address,
}

/// An order resting at a price level, reduced to what matching needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub id: u64,
    pub owner: Address,
    pub qty: u64,
}

/// A match between an aggressive (taker) and a resting (maker) order.
///
/// The fill always executes at the maker's price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub taker_order_id: u64,
    pub maker_order_id: u64,
    /// Execution price in ticks (the maker's level).
    pub price: u64,
    pub qty: u64,
    pub taker: Address,
    pub maker: Address,
    /// The taker's side; the maker took the opposite.
    pub taker_side: Side,
}

/// A resting order removed by `cancel`, with enough context for the
/// caller to release its collateral lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancelledOrder {
    pub id: u64,
    pub owner: Address,
    pub side: Side,
    pub price: u64,
    pub remaining_qty: u64,
}
