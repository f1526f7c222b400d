//! # Order Book - Price Levels and Matching
//!
//! ## Data Structures
//!
//! - `bids` / `asks`: price -> FIFO of resting orders
//! - `bid_prices` / `ask_prices`: heaps of live level prices (max / min)
//! - `index`: O(1) order-id -> (side, price) lookup
//!
//! ## Invariants Enforced
//!
//! - A price level exists iff its FIFO is non-empty iff the price is in
//!   the side's heap. Every level mutation goes through `push_resting` /
//!   `remove_level_if_empty`; the heaps and maps are never exposed
//!   separately.
//! - Every live order id appears in `index` exactly once, at exactly one
//!   price level.
//! - At rest, `best_bid < best_ask` (or one side is empty): matching
//!   consumes all crossing liquidity before anything rests.

use crate::errors::BookError;
use crate::order::{CancelledOrder, Fill, Order, OrderType, RestingOrder, Side};
use hl_markets::Market;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};

/// Outcome of placing an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaceResult {
    pub order_id: u64,
    pub fills: Vec<Fill>,
    /// Quantity left resting in the book (0 for IOC residue or full fill).
    pub resting_qty: u64,
}

impl PlaceResult {
    /// Total quantity matched.
    pub fn filled_qty(&self) -> u64 {
        self.fills.iter().map(|f| f.qty).sum()
    }
}

/// A single-symbol central-limit order book.
#[derive(Debug, Default)]
pub struct OrderBook {
    symbol: String,
    bids: HashMap<u64, VecDeque<RestingOrder>>,
    asks: HashMap<u64, VecDeque<RestingOrder>>,
    bid_prices: BinaryHeap<u64>,
    ask_prices: BinaryHeap<Reverse<u64>>,
    index: HashMap<u64, (Side, u64)>,
    last_traded_price: u64,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Best bid price, if any bids rest.
    pub fn best_bid(&self) -> Option<u64> {
        self.bid_prices.peek().copied()
    }

    /// Best ask price, if any asks rest.
    pub fn best_ask(&self) -> Option<u64> {
        self.ask_prices.peek().map(|Reverse(p)| *p)
    }

    /// Arithmetic mid price; zero when either side is empty.
    pub fn mid_price(&self) -> u64 {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => (b + a) / 2,
            _ => 0,
        }
    }

    /// Price of the most recent fill; zero before any trade.
    pub fn last_traded_price(&self) -> u64 {
        self.last_traded_price
    }

    /// Number of live orders.
    pub fn open_orders(&self) -> usize {
        self.index.len()
    }

    /// `(price, total_qty)` per bid level, best (highest) first.
    pub fn bid_levels(&self) -> Vec<(u64, u64)> {
        let mut prices: Vec<u64> = self.bids.keys().copied().collect();
        prices.sort_unstable_by(|a, b| b.cmp(a));
        prices
            .into_iter()
            .map(|p| (p, self.bids[&p].iter().map(|o| o.qty).sum()))
            .collect()
    }

    /// `(price, total_qty)` per ask level, best (lowest) first.
    pub fn ask_levels(&self) -> Vec<(u64, u64)> {
        let mut prices: Vec<u64> = self.asks.keys().copied().collect();
        prices.sort_unstable();
        prices
            .into_iter()
            .map(|p| (p, self.asks[&p].iter().map(|o| o.qty).sum()))
            .collect()
    }

    /// Top `n` levels of each side, best first.
    pub fn depth(&self, n: usize) -> (Vec<(u64, u64)>, Vec<(u64, u64)>) {
        let mut bids = self.bid_levels();
        let mut asks = self.ask_levels();
        bids.truncate(n);
        asks.truncate(n);
        (bids, asks)
    }

    /// Place an order against this book.
    ///
    /// Validates against the market, matches crossing liquidity at maker
    /// prices in price-time order, then applies the residue policy of the
    /// order type. ALO orders are rejected outright if any match would
    /// occur.
    pub fn place(&mut self, order: Order, market: &Market) -> Result<PlaceResult, BookError> {
        market.validate_order(order.price, order.qty)?;
        if self.index.contains_key(&order.id) {
            return Err(BookError::DuplicateOrderId(order.id));
        }

        if order.order_type == OrderType::Alo {
            if self.crosses(order.side, order.price) {
                return Err(BookError::AloCrossed);
            }
            self.push_resting(
                order.side,
                order.price,
                RestingOrder {
                    id: order.id,
                    owner: order.owner,
                    qty: order.qty,
                },
            );
            return Ok(PlaceResult {
                order_id: order.id,
                fills: Vec::new(),
                resting_qty: order.qty,
            });
        }

        let mut remaining = order.qty;
        let mut fills = Vec::new();

        while remaining > 0 {
            let Some(best) = self.best_opposite(order.side) else {
                break;
            };
            let crossed = match order.side {
                Side::Buy => best <= order.price,
                Side::Sell => best >= order.price,
            };
            if !crossed {
                break;
            }

            let maker_side = order.side.opposite();
            let queue = match maker_side {
                Side::Buy => self.bids.get_mut(&best),
                Side::Sell => self.asks.get_mut(&best),
            }
            .expect("heap price has a live level");

            let maker = queue.front_mut().expect("level FIFO is non-empty");
            let traded = remaining.min(maker.qty);
            maker.qty -= traded;
            remaining -= traded;
            fills.push(Fill {
                taker_order_id: order.id,
                maker_order_id: maker.id,
                price: best,
                qty: traded,
                taker: order.owner,
                maker: maker.owner,
                taker_side: order.side,
            });
            self.last_traded_price = best;

            if queue.front().map(|o| o.qty) == Some(0) {
                let done = queue.pop_front().expect("checked front");
                self.index.remove(&done.id);
                self.remove_level_if_empty(maker_side, best);
            }
        }

        let resting_qty = match order.order_type {
            OrderType::Gtc if remaining > 0 => {
                self.push_resting(
                    order.side,
                    order.price,
                    RestingOrder {
                        id: order.id,
                        owner: order.owner,
                        qty: remaining,
                    },
                );
                remaining
            }
            _ => 0,
        };

        Ok(PlaceResult {
            order_id: order.id,
            fills,
            resting_qty,
        })
    }

    /// Cancel a resting order by id. Returns `None` if the id is not live.
    ///
    /// Lookup is O(1) via the index; removal is linear within the level's
    /// FIFO (queues are short in practice).
    pub fn cancel(&mut self, id: u64) -> Option<CancelledOrder> {
        let (side, price) = self.index.remove(&id)?;
        let queue = match side {
            Side::Buy => self.bids.get_mut(&price),
            Side::Sell => self.asks.get_mut(&price),
        }?;
        let pos = queue.iter().position(|o| o.id == id)?;
        let removed = queue.remove(pos).expect("position just found");
        self.remove_level_if_empty(side, price);
        Some(CancelledOrder {
            id,
            owner: removed.owner,
            side,
            price,
            remaining_qty: removed.qty,
        })
    }

    fn best_opposite(&self, taker_side: Side) -> Option<u64> {
        match taker_side {
            Side::Buy => self.best_ask(),
            Side::Sell => self.best_bid(),
        }
    }

    /// Whether an order at `price` on `side` would take liquidity.
    fn crosses(&self, side: Side, price: u64) -> bool {
        match (side, self.best_opposite(side)) {
            (Side::Buy, Some(ask)) => ask <= price,
            (Side::Sell, Some(bid)) => bid >= price,
            _ => false,
        }
    }

    /// Sole entry point for adding a resting order. Creates the level and
    /// heap entry together when the price is new.
    fn push_resting(&mut self, side: Side, price: u64, order: RestingOrder) {
        self.index.insert(order.id, (side, price));
        let (levels, is_new) = match side {
            Side::Buy => {
                let is_new = !self.bids.contains_key(&price);
                (self.bids.entry(price).or_default(), is_new)
            }
            Side::Sell => {
                let is_new = !self.asks.contains_key(&price);
                (self.asks.entry(price).or_default(), is_new)
            }
        };
        levels.push_back(order);
        if is_new {
            match side {
                Side::Buy => self.bid_prices.push(price),
                Side::Sell => self.ask_prices.push(Reverse(price)),
            }
        }
    }

    /// Sole entry point for deleting a level. Drops the map entry and the
    /// heap entry together once the FIFO drains.
    fn remove_level_if_empty(&mut self, side: Side, price: u64) {
        let empty = match side {
            Side::Buy => self.bids.get(&price).map(|q| q.is_empty()).unwrap_or(false),
            Side::Sell => self.asks.get(&price).map(|q| q.is_empty()).unwrap_or(false),
        };
        if !empty {
            return;
        }
        match side {
            Side::Buy => {
                self.bids.remove(&price);
                self.bid_prices.retain(|p| *p != price);
            }
            Side::Sell => {
                self.asks.remove(&price);
                self.ask_prices.retain(|Reverse(p)| *p != price);
            }
        }
    }

    /// Structural self-check used by tests: level/heap/index coherence and
    /// the uncrossed-at-rest property.
    #[doc(hidden)]
    pub fn check_invariants(&self) -> bool {
        let heap_bids: Vec<u64> = self.bid_prices.iter().copied().collect();
        let heap_asks: Vec<u64> = self.ask_prices.iter().map(|Reverse(p)| *p).collect();
        if heap_bids.len() != self.bids.len() || heap_asks.len() != self.asks.len() {
            return false;
        }
        for p in &heap_bids {
            if self.bids.get(p).map(|q| q.is_empty()).unwrap_or(true) {
                return false;
            }
        }
        for p in &heap_asks {
            if self.asks.get(p).map(|q| q.is_empty()).unwrap_or(true) {
                return false;
            }
        }
        let live: usize = self.bids.values().map(|q| q.len()).sum::<usize>()
            + self.asks.values().map(|q| q.len()).sum::<usize>();
        if live != self.index.len() {
            return false;
        }
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => b < a,
            _ => true,
        }
    }
}
