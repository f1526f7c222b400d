//! The application: order books + ledger behind the consensus bridge.

use crate::errors::ExecError;
use crate::hash::compute_app_hash;
use hl_book::{Order, OrderBook, PlaceResult};
use hl_codec::{
    check_deadline, verify_envelope, DelegationRegistry, ParsedCancel, ParsedOrder, TypedDomain,
    VerifiedTx,
};
use hl_ledger::Ledger;
use hl_markets::{Market, MarketRegistry};
use hl_mempool::Mempool;
use parking_lot::Mutex;
use shared_types::{Address, Block, Hash, Height, TradeRecord};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Number of recent block executions memoized for idempotent re-commit.
const EXECUTED_MEMO_DEPTH: u64 = 64;

/// Application parameters.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Chain id bound into every typed-data digest.
    pub chain_id: u64,
    /// Verifying-contract address of the typed-data domain.
    pub verifying_contract: Address,
    /// Byte budget for proposal payloads.
    pub max_payload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chain_id: 1337,
            verifying_contract: Address::ZERO,
            max_payload_bytes: 1 << 20,
        }
    }
}

/// Collateral locked for a live order.
#[derive(Clone, Debug)]
struct OrderLock {
    owner: Address,
    symbol: String,
    remaining_qty: u64,
    remaining_margin: u128,
}

/// Order lifecycle events for the runtime's persistence of open orders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderEvent {
    /// An order came to rest in a book.
    Rested(Order),
    /// A resting order left its book (filled out or cancelled).
    Removed { owner: Address, order_id: u64 },
}

/// Mutable application state. One mutex serializes block execution; the
/// reference execution path is serial within a block.
struct AppState {
    books: BTreeMap<String, OrderBook>,
    ledger: Ledger,
    next_order_id: u64,
    next_trade_id: u64,
    order_locks: HashMap<u64, OrderLock>,
    /// `block_hash -> (app_hash, height)` memo for idempotent on_commit.
    executed: HashMap<Hash, (Hash, Height)>,
    /// Trades settled since the last drain.
    trades: Vec<TradeRecord>,
    /// Order lifecycle events since the last drain.
    order_events: Vec<OrderEvent>,
}

/// The exchange application. Exposes the two consensus bridge operations
/// (`prepare_payload`, `on_commit`) plus read queries for the runtime.
pub struct App {
    domain: TypedDomain,
    registry: Arc<MarketRegistry>,
    delegations: Arc<DelegationRegistry>,
    mempool: Arc<Mempool>,
    max_payload_bytes: usize,
    state: Mutex<AppState>,
}

impl App {
    pub fn new(
        config: AppConfig,
        registry: Arc<MarketRegistry>,
        delegations: Arc<DelegationRegistry>,
        mempool: Arc<Mempool>,
    ) -> Self {
        Self {
            domain: TypedDomain::hyperlicked(config.chain_id, config.verifying_contract),
            registry,
            delegations,
            mempool,
            max_payload_bytes: config.max_payload_bytes,
            state: Mutex::new(AppState {
                books: BTreeMap::new(),
                ledger: Ledger::new(),
                next_order_id: 1,
                next_trade_id: 1,
                order_locks: HashMap::new(),
                executed: HashMap::new(),
                trades: Vec::new(),
                order_events: Vec::new(),
            }),
        }
    }

    pub fn domain(&self) -> &TypedDomain {
        &self.domain
    }

    pub fn registry(&self) -> &Arc<MarketRegistry> {
        &self.registry
    }

    pub fn delegations(&self) -> &Arc<DelegationRegistry> {
        &self.delegations
    }

    /// Credit genesis balances.
    pub fn apply_genesis(&self, allocations: &[(Address, u128)]) {
        let mut state = self.state.lock();
        for (addr, amount) in allocations {
            if *amount > 0 {
                // Positive amounts cannot fail deposit.
                let _ = state.ledger.deposit(*addr, *amount);
            }
        }
    }

    /// Bridge: select up to the byte budget of ordered transactions from
    /// the mempool, in fixed priority order.
    pub fn prepare_payload(&self, _parent: &Block, _next_height: Height) -> Vec<Vec<u8>> {
        self.mempool.select_for_proposal(self.max_payload_bytes)
    }

    /// Bridge: apply a block's payload and return the resulting app hash.
    ///
    /// Idempotent for recently executed blocks: re-committing a known
    /// block returns the memoized hash without replaying effects.
    pub fn on_commit(&self, block: &Block) -> Hash {
        let mut state = self.state.lock();
        let block_hash = block.hash();
        if let Some((app_hash, _)) = state.executed.get(&block_hash) {
            return *app_hash;
        }

        for (index, raw) in block.payload.iter().enumerate() {
            if let Err(err) = self.execute_tx(&mut state, raw, block.timestamp, block.height) {
                debug!(
                    height = block.height,
                    index,
                    error = %err,
                    "transaction dropped"
                );
            }
        }

        self.liquidation_pass(&mut state, block.height);

        let app_hash = compute_app_hash(block.height, block.timestamp, &state.books);
        state.executed.insert(block_hash, (app_hash, block.height));
        let horizon = block.height.saturating_sub(EXECUTED_MEMO_DEPTH);
        state.executed.retain(|_, (_, h)| *h >= horizon);
        app_hash
    }

    fn execute_tx(
        &self,
        state: &mut AppState,
        raw: &[u8],
        timestamp: u64,
        height: Height,
    ) -> Result<(), ExecError> {
        match verify_envelope(raw, &self.domain, &self.delegations, timestamp)? {
            VerifiedTx::Order(order) => self.exec_order(state, order, timestamp, height),
            VerifiedTx::Cancel(cancel) => self.exec_cancel(state, cancel),
        }
    }

    fn exec_order(
        &self,
        state: &mut AppState,
        order: ParsedOrder,
        timestamp: u64,
        height: Height,
    ) -> Result<(), ExecError> {
        check_deadline(order.deadline, timestamp)?;
        let market = self.registry.get(&order.symbol)?;
        state.ledger.bump_nonce(order.owner, order.nonce)?;

        let size_delta = order.qty as i64 * order.side.sign();
        state
            .ledger
            .check_margin_requirement(&order.owner, &market, order.price, size_delta)?;

        let lock = market.initial_margin(order.price, order.qty);
        state.ledger.lock_collateral(&order.owner, lock)?;

        let order_id = state.next_order_id;
        state.next_order_id += 1;

        let book = state
            .books
            .entry(order.symbol.clone())
            .or_insert_with(|| OrderBook::new(order.symbol.clone()));
        let placed = Order {
            id: order_id,
            symbol: order.symbol.clone(),
            side: order.side,
            price: order.price,
            qty: order.qty,
            order_type: order.order_type,
            owner: order.owner,
        };
        let result = match book.place(placed, &market) {
            Ok(result) => result,
            Err(err) => {
                state.ledger.unlock_collateral(&order.owner, lock)?;
                return Err(err.into());
            }
        };

        self.settle_fills(state, &order, &market, lock, &result, timestamp, height)
    }

    /// Settle the fills of a placement: positions, fees, volume, trades,
    /// and the migration of order collateral into position margin.
    #[allow(clippy::too_many_arguments)]
    fn settle_fills(
        &self,
        state: &mut AppState,
        order: &ParsedOrder,
        market: &Market,
        lock: u128,
        result: &PlaceResult,
        timestamp: u64,
        height: Height,
    ) -> Result<(), ExecError> {
        let mut lock_remaining = lock;
        let mut qty_remaining = order.qty;

        for fill in &result.fills {
            // Slices of the collateral locks this fill consumes. The last
            // fill divides exactly, so no dust is left behind.
            let taker_slice = lock_remaining * fill.qty as u128 / qty_remaining as u128;
            lock_remaining -= taker_slice;
            qty_remaining -= fill.qty;

            let maker_slice = match state.order_locks.get_mut(&fill.maker_order_id) {
                Some(maker_lock) => {
                    let slice =
                        maker_lock.remaining_margin * fill.qty as u128 / maker_lock.remaining_qty as u128;
                    maker_lock.remaining_margin -= slice;
                    maker_lock.remaining_qty -= fill.qty;
                    if maker_lock.remaining_qty == 0 {
                        state.order_locks.remove(&fill.maker_order_id);
                        state.order_events.push(OrderEvent::Removed {
                            owner: fill.maker,
                            order_id: fill.maker_order_id,
                        });
                    }
                    slice
                }
                None => 0,
            };

            let taker_delta = fill.qty as i64 * fill.taker_side.sign();
            state
                .ledger
                .update_position(&fill.taker, &order.symbol, taker_delta, fill.price, taker_slice)?;
            state
                .ledger
                .update_position(&fill.maker, &order.symbol, -taker_delta, fill.price, maker_slice)?;

            let notional = fill.price as u128 * fill.qty as u128;
            let taker_fee = notional as i128 * market.taker_fee_bps as i128 / 10_000;
            let maker_fee = notional as i128 * market.maker_fee_bps as i128 / 10_000;
            state.ledger.apply_fees(&fill.taker, -taker_fee)?;
            state.ledger.apply_fees(&fill.maker, -maker_fee)?;
            state.ledger.record_trade(&fill.taker, notional)?;
            state.ledger.record_trade(&fill.maker, notional)?;

            let trade_id = state.next_trade_id;
            state.next_trade_id += 1;
            state.trades.push(TradeRecord {
                symbol: order.symbol.clone(),
                trade_id,
                taker: fill.taker,
                maker: fill.maker,
                price: fill.price,
                qty: fill.qty,
                height,
                timestamp,
            });
        }

        if result.resting_qty > 0 {
            state.order_locks.insert(
                result.order_id,
                OrderLock {
                    owner: order.owner,
                    symbol: order.symbol.clone(),
                    remaining_qty: result.resting_qty,
                    remaining_margin: lock_remaining,
                },
            );
            state.order_events.push(OrderEvent::Rested(Order {
                id: result.order_id,
                symbol: order.symbol.clone(),
                side: order.side,
                price: order.price,
                qty: result.resting_qty,
                order_type: order.order_type,
                owner: order.owner,
            }));
        } else if lock_remaining > 0 {
            // IOC residue: the unfilled remainder releases its collateral.
            state.ledger.unlock_collateral(&order.owner, lock_remaining)?;
        }
        Ok(())
    }

    fn exec_cancel(&self, state: &mut AppState, cancel: ParsedCancel) -> Result<(), ExecError> {
        state.ledger.bump_nonce(cancel.owner, cancel.nonce)?;

        let owned = state
            .order_locks
            .get(&cancel.order_id)
            .map(|l| l.owner == cancel.owner && l.symbol == cancel.symbol)
            .unwrap_or(false);
        if !owned {
            return Err(ExecError::UnknownOrder(cancel.order_id));
        }

        let book = state
            .books
            .get_mut(&cancel.symbol)
            .ok_or(ExecError::UnknownOrder(cancel.order_id))?;
        book.cancel(cancel.order_id)
            .ok_or(ExecError::UnknownOrder(cancel.order_id))?;

        let lock = state
            .order_locks
            .remove(&cancel.order_id)
            .ok_or(ExecError::UnknownOrder(cancel.order_id))?;
        state
            .ledger
            .unlock_collateral(&cancel.owner, lock.remaining_margin)?;
        state.order_events.push(OrderEvent::Removed {
            owner: cancel.owner,
            order_id: cancel.order_id,
        });
        Ok(())
    }

    /// Mark every account with open exposure against the books' own
    /// prices and force-close the ones below maintenance.
    fn liquidation_pass(&self, state: &mut AppState, height: Height) {
        let mut marks = BTreeMap::new();
        let mut markets = BTreeMap::new();
        for (symbol, book) in &state.books {
            let mark = match book.last_traded_price() {
                0 => book.mid_price(),
                last => last,
            };
            if mark == 0 {
                continue;
            }
            if let Ok(market) = self.registry.get(symbol) {
                marks.insert(symbol.clone(), mark);
                markets.insert(symbol.clone(), market);
            }
        }
        if marks.is_empty() {
            return;
        }

        // Sorted account iteration keeps the pass deterministic.
        let exposed: Vec<Address> = state
            .ledger
            .accounts()
            .filter(|a| a.positions.values().any(|p| !p.is_flat()))
            .map(|a| a.address)
            .collect();

        for addr in exposed {
            let Ok(status) = state.ledger.check_liquidation(&addr, &markets, &marks) else {
                continue;
            };
            if !status.should_liquidate {
                continue;
            }
            if let Ok(outcome) = state.ledger.liquidate(&addr, &marks) {
                info!(
                    account = %addr,
                    height,
                    equity = status.equity,
                    maintenance = status.maintenance_margin,
                    deficit = outcome.deficit,
                    "account liquidated"
                );
            }
        }
    }

    /// Drain trades settled since the last call (runtime persistence).
    pub fn drain_trades(&self) -> Vec<TradeRecord> {
        std::mem::take(&mut self.state.lock().trades)
    }

    /// Drain order lifecycle events since the last call (runtime
    /// persistence of open orders).
    pub fn drain_order_events(&self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.state.lock().order_events)
    }

    // === Read queries ===

    pub fn account(&self, addr: &Address) -> Option<hl_ledger::Account> {
        self.state.lock().ledger.account(addr).cloned()
    }

    pub fn best_bid(&self, symbol: &str) -> Option<u64> {
        self.state.lock().books.get(symbol).and_then(|b| b.best_bid())
    }

    pub fn best_ask(&self, symbol: &str) -> Option<u64> {
        self.state.lock().books.get(symbol).and_then(|b| b.best_ask())
    }

    pub fn last_traded_price(&self, symbol: &str) -> Option<u64> {
        self.state
            .lock()
            .books
            .get(symbol)
            .map(|b| b.last_traded_price())
    }

    /// Top `n` levels of both sides.
    pub fn depth(&self, symbol: &str, n: usize) -> (Vec<(u64, u64)>, Vec<(u64, u64)>) {
        self.state
            .lock()
            .books
            .get(symbol)
            .map(|b| b.depth(n))
            .unwrap_or_default()
    }

    /// Number of live orders a user has resting across all books.
    pub fn open_orders(&self, owner: &Address) -> usize {
        self.state
            .lock()
            .order_locks
            .values()
            .filter(|l| l.owner == *owner)
            .count()
    }
}
