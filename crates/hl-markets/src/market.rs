//! Market domain entities.

use crate::errors::MarketError;
use serde::{Deserialize, Serialize};

/// Instrument kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Perpetual,
    Future,
    Spot,
}

/// Market lifecycle status.
///
/// Legal transitions: `Active <-> Paused`, `Active -> Settling`,
/// `Paused -> Settling`, `Settling -> Settled`. `Settled` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    Active,
    Paused,
    Settling,
    Settled,
}

impl MarketStatus {
    /// Whether a transition from `self` to `to` is legal.
    pub fn can_transition_to(&self, to: MarketStatus) -> bool {
        use MarketStatus::*;
        matches!(
            (*self, to),
            (Active, Paused) | (Paused, Active) | (Active, Settling) | (Paused, Settling)
                | (Settling, Settled)
        )
    }
}

/// Per-symbol trading parameters.
///
/// Prices are integer ticks, quantities integer lots; `tick_size` and
/// `lot_size` define the external value per unit. Margin rates are basis
/// points of notional; `maker_fee_bps` may be negative (rebate).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub market_type: MarketType,
    pub status: MarketStatus,
    pub tick_size: u64,
    pub lot_size: u64,
    pub min_notional: u128,
    pub max_leverage: u32,
    pub initial_margin_bps: u32,
    pub maintenance_margin_bps: u32,
    pub min_order_size: u64,
    pub max_order_size: u64,
    pub max_position: u64,
    pub maker_fee_bps: i32,
    pub taker_fee_bps: i32,
}

impl Market {
    /// A perpetual with the reference defaults: 10x leverage, 1% initial /
    /// 0.5% maintenance margin, 2 bps taker fee, 0.5 bps maker rebate.
    pub fn perpetual(symbol: impl Into<String>, base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            base_asset: base.into(),
            quote_asset: quote.into(),
            market_type: MarketType::Perpetual,
            status: MarketStatus::Active,
            tick_size: 1,
            lot_size: 1,
            min_notional: 1,
            max_leverage: 10,
            initial_margin_bps: 1_000,
            maintenance_margin_bps: 50,
            min_order_size: 1,
            max_order_size: 1_000_000,
            max_position: 10_000_000,
            maker_fee_bps: -1,
            taker_fee_bps: 2,
        }
    }

    /// Validate the structural invariants of the parameters.
    pub fn validate(&self) -> Result<(), MarketError> {
        let fail = |reason: &str| {
            Err(MarketError::InvalidParameters {
                symbol: self.symbol.clone(),
                reason: reason.to_string(),
            })
        };

        if self.symbol.is_empty() {
            return fail("empty symbol");
        }
        if self.tick_size == 0 || self.lot_size == 0 {
            return fail("tick_size and lot_size must be positive");
        }
        if self.min_order_size == 0 || self.max_order_size < self.min_order_size {
            return fail("order size bounds must satisfy 0 < min <= max");
        }
        if self.max_position < self.max_order_size {
            return fail("max_position must be >= max_order_size");
        }
        if self.initial_margin_bps == 0 || self.initial_margin_bps > 10_000 {
            return fail("initial_margin_bps must be in (0, 10000]");
        }
        if self.maintenance_margin_bps > self.initial_margin_bps {
            return fail("maintenance_margin_bps must be <= initial_margin_bps");
        }
        if self.max_leverage == 0 {
            return fail("max_leverage must be positive");
        }
        // max_leverage must agree with the initial margin rate within a
        // factor of two: leverage * imr in [5000, 20000] bps.
        let product = self.max_leverage as u64 * self.initial_margin_bps as u64;
        if !(5_000..=20_000).contains(&product) {
            return fail("max_leverage inconsistent with initial_margin_bps");
        }
        if self.taker_fee_bps < 0 {
            return fail("taker_fee_bps must be non-negative");
        }
        Ok(())
    }

    /// Validate an order's price/quantity against this market. Called at
    /// the order-book boundary.
    pub fn validate_order(&self, price: u64, qty: u64) -> Result<(), MarketError> {
        if self.status != MarketStatus::Active {
            return Err(MarketError::MarketInactive {
                symbol: self.symbol.clone(),
                status: self.status,
            });
        }
        if price == 0 || qty == 0 {
            return Err(MarketError::NonPositiveOrder);
        }
        if qty < self.min_order_size || qty > self.max_order_size {
            return Err(MarketError::SizeOutOfBounds {
                qty,
                min: self.min_order_size,
                max: self.max_order_size,
            });
        }
        let notional = price as u128 * qty as u128;
        if notional < self.min_notional {
            return Err(MarketError::NotionalTooSmall {
                notional,
                min: self.min_notional,
            });
        }
        Ok(())
    }

    /// Required initial margin for a notional change:
    /// `price * |qty| * initial_margin_bps / 10000`, truncating.
    pub fn initial_margin(&self, price: u64, qty: u64) -> u128 {
        price as u128 * qty as u128 * self.initial_margin_bps as u128 / 10_000
    }

    /// Maintenance margin for a position of `|size|` lots marked at `price`.
    pub fn maintenance_margin(&self, price: u64, size_abs: u64) -> u128 {
        price as u128 * size_abs as u128 * self.maintenance_margin_bps as u128 / 10_000
    }
}
