//! Ledger operations.
//!
//! A single writer mutates the ledger during block execution; the caller
//! holds the lock. Every branch below preserves the account invariants
//! `locked_collateral <= balance` and `Σ position.margin <= locked_collateral`.

use crate::account::{Account, Position};
use crate::errors::LedgerError;
use hl_markets::Market;
use shared_types::Address;
use std::collections::BTreeMap;

/// Result of applying one fill to a position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionUpdate {
    /// P&L realized on the closed portion (zero for pure increases).
    pub realized_pnl: i128,
    /// Collateral released back to the free balance.
    pub unlocked: u128,
    pub new_size: i64,
}

/// Outcome of `check_liquidation`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiquidationStatus {
    pub should_liquidate: bool,
    /// Free balance plus unrealized P&L at the mark prices.
    pub equity: i128,
    /// Maintenance requirement across all positions.
    pub maintenance_margin: u128,
}

/// Outcome of a forced liquidation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiquidationOutcome {
    /// `(symbol, closed_size, close_price)` per closed position.
    pub closed: Vec<(String, i64, u64)>,
    pub realized_pnl: i128,
    pub margin_released: u128,
    /// Shortfall owed to an external insurance fund after the balance is
    /// clamped to zero.
    pub deficit: u128,
}

/// The account ledger: all user accounts, keyed by address.
///
/// A sorted map so that any future iteration feeding the state hash is
/// deterministic by construction.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: BTreeMap<Address, Account>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, addr: &Address) -> Option<&Account> {
        self.accounts.get(addr)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn get_or_create(&mut self, addr: Address) -> &mut Account {
        self.accounts.entry(addr).or_insert_with(|| Account::new(addr))
    }

    fn get_mut(&mut self, addr: &Address) -> Result<&mut Account, LedgerError> {
        self.accounts
            .get_mut(addr)
            .ok_or(LedgerError::UnknownAccount(*addr))
    }

    /// Credit a deposit. Creates the account on first use.
    pub fn deposit(&mut self, addr: Address, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.get_or_create(addr).balance += amount;
        Ok(())
    }

    /// Debit a withdrawal from the free balance.
    pub fn withdraw(&mut self, addr: &Address, amount: u128) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let account = self.get_mut(addr)?;
        let available = account.available();
        if available < amount {
            return Err(LedgerError::InsufficientAvailable {
                need: amount,
                available,
            });
        }
        account.balance -= amount;
        Ok(())
    }

    /// Lock free balance as collateral.
    pub fn lock_collateral(&mut self, addr: &Address, amount: u128) -> Result<(), LedgerError> {
        let account = self.get_mut(addr)?;
        let available = account.available();
        if available < amount {
            return Err(LedgerError::InsufficientAvailable {
                need: amount,
                available,
            });
        }
        account.locked_collateral += amount;
        Ok(())
    }

    /// Release locked collateral back to the free balance.
    pub fn unlock_collateral(&mut self, addr: &Address, amount: u128) -> Result<(), LedgerError> {
        let account = self.get_mut(addr)?;
        if account.locked_collateral < amount {
            return Err(LedgerError::InsufficientLocked {
                amount,
                locked: account.locked_collateral,
            });
        }
        account.locked_collateral -= amount;
        Ok(())
    }

    /// Enforce strictly-increasing nonces. Creates the account on first
    /// use so that a brand-new address can submit its first transaction.
    pub fn bump_nonce(&mut self, addr: Address, nonce: u64) -> Result<(), LedgerError> {
        let account = self.get_or_create(addr);
        if nonce <= account.nonce {
            return Err(LedgerError::ReplayedNonce {
                got: nonce,
                current: account.nonce,
            });
        }
        account.nonce = nonce;
        Ok(())
    }

    /// Apply one fill to a position.
    ///
    /// `margin_delta` is the slice of the order's collateral lock that this
    /// fill consumes. The four cases form the sign-triplet algebra over
    /// `(sign old, sign delta, sign new)`:
    ///
    /// - same direction (or opening): volume-weighted entry update, the
    ///   margin slice attaches to the position and stays locked;
    /// - reducing: P&L realized on the closed portion, a proportional part
    ///   of the position margin AND the incoming slice unlock;
    /// - fully closing: as reducing, with the whole margin released;
    /// - flipping: the old side closes entirely, the position re-opens at
    ///   the fill price with the incoming slice as its margin.
    pub fn update_position(
        &mut self,
        addr: &Address,
        symbol: &str,
        size_delta: i64,
        fill_price: u64,
        margin_delta: u128,
    ) -> Result<PositionUpdate, LedgerError> {
        if size_delta == 0 {
            return Ok(PositionUpdate::default());
        }
        let account = self.get_mut(addr)?;
        let pos = account
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position {
                symbol: symbol.to_string(),
                ..Default::default()
            });

        let old = pos.size;
        let new = old + size_delta;
        let mut realized: i128 = 0;
        let mut unlocked: u128 = 0;

        match (old.signum(), size_delta.signum(), new.signum()) {
            // Opening or adding in the same direction: VWAP the entry.
            (0, _, _) | (1, 1, _) | (-1, -1, _) => {
                let old_abs = old.unsigned_abs() as u128;
                let delta_abs = size_delta.unsigned_abs() as u128;
                let new_abs = new.unsigned_abs() as u128;
                pos.entry_price = ((pos.entry_price as u128 * old_abs
                    + fill_price as u128 * delta_abs)
                    / new_abs) as u64;
                pos.margin += margin_delta;
                pos.size = new;
            }
            // Reducing without crossing zero.
            (o, _, n) if n == o || n == 0 => {
                let closed = size_delta.unsigned_abs() as u128;
                let old_abs = old.unsigned_abs() as u128;
                realized =
                    (fill_price as i128 - pos.entry_price as i128) * closed as i128 * o as i128;
                let released = if new == 0 {
                    pos.margin
                } else {
                    pos.margin * closed / old_abs
                };
                pos.margin -= released;
                unlocked = released + margin_delta;
                pos.size = new;
                if new == 0 {
                    pos.entry_price = 0;
                }
            }
            // Flipping through zero: close the old side, open the new.
            (o, _, _) => {
                let closed = old.unsigned_abs() as u128;
                realized =
                    (fill_price as i128 - pos.entry_price as i128) * closed as i128 * o as i128;
                unlocked = pos.margin;
                pos.size = new;
                pos.entry_price = fill_price;
                pos.margin = margin_delta;
            }
        }

        account.realized_pnl += realized;
        Self::settle(account, realized, unlocked)?;

        Ok(PositionUpdate {
            realized_pnl: realized,
            unlocked,
            new_size: new,
        })
    }

    /// Apply a fee delta: negative for taker fees, positive for maker
    /// rebates.
    pub fn apply_fees(&mut self, addr: &Address, delta: i128) -> Result<(), LedgerError> {
        let account = self.get_mut(addr)?;
        if delta >= 0 {
            account.fees_earned += delta as u128;
            account.balance += delta as u128;
        } else {
            let fee = delta.unsigned_abs();
            account.fees_paid += fee;
            account.balance = account.balance.saturating_sub(fee);
            account.locked_collateral = account.locked_collateral.min(account.balance);
        }
        Ok(())
    }

    /// Record traded notional for account statistics.
    pub fn record_trade(&mut self, addr: &Address, notional: u128) -> Result<(), LedgerError> {
        let account = self.get_mut(addr)?;
        account.volume += notional;
        account.trade_count += 1;
        Ok(())
    }

    /// Pre-trade margin check for a proposed size change at `price`.
    pub fn check_margin_requirement(
        &self,
        addr: &Address,
        market: &Market,
        price: u64,
        size_delta: i64,
    ) -> Result<(), LedgerError> {
        let account = self
            .accounts
            .get(addr)
            .ok_or(LedgerError::UnknownAccount(*addr))?;

        let required = market.initial_margin(price, size_delta.unsigned_abs());
        let available = account.available();
        if required > available {
            return Err(LedgerError::InsufficientMargin {
                required,
                available,
            });
        }

        let current = account
            .positions
            .get(&market.symbol)
            .map(|p| p.size)
            .unwrap_or(0);
        let would_be = (current + size_delta).unsigned_abs();
        if would_be > market.max_position {
            return Err(LedgerError::MaxPosition {
                would_be,
                max: market.max_position,
            });
        }

        // Aggregate notional across all positions plus the proposed change,
        // bounded by max_leverage times the total balance.
        let mut notional: u128 = account
            .positions
            .values()
            .map(|p| p.entry_price as u128 * p.size.unsigned_abs() as u128)
            .sum();
        notional += price as u128 * size_delta.unsigned_abs() as u128;
        if notional > market.max_leverage as u128 * account.balance {
            return Err(LedgerError::LeverageExceeded {
                max_leverage: market.max_leverage,
            });
        }
        Ok(())
    }

    /// Evaluate the liquidation condition at the given mark prices.
    ///
    /// Equity is the free balance plus unrealized P&L; positions without a
    /// mark price contribute nothing.
    pub fn check_liquidation(
        &self,
        addr: &Address,
        markets: &BTreeMap<String, Market>,
        mark_prices: &BTreeMap<String, u64>,
    ) -> Result<LiquidationStatus, LedgerError> {
        let account = self
            .accounts
            .get(addr)
            .ok_or(LedgerError::UnknownAccount(*addr))?;

        let mut equity = account.available() as i128;
        let mut maintenance: u128 = 0;
        for pos in account.positions.values() {
            if pos.is_flat() {
                continue;
            }
            let Some(&mark) = mark_prices.get(&pos.symbol) else {
                continue;
            };
            equity += pos.unrealized_pnl(mark);
            if let Some(market) = markets.get(&pos.symbol) {
                maintenance += market.maintenance_margin(mark, pos.size.unsigned_abs());
            }
        }

        Ok(LiquidationStatus {
            should_liquidate: equity < maintenance as i128,
            equity,
            maintenance_margin: maintenance,
        })
    }

    /// Force-close every position at the provided mark prices.
    ///
    /// Realizes P&L, releases all position margin, and clamps the balance
    /// at zero; the clamped magnitude is reported as `deficit` (owed to an
    /// external insurance fund).
    pub fn liquidate(
        &mut self,
        addr: &Address,
        mark_prices: &BTreeMap<String, u64>,
    ) -> Result<LiquidationOutcome, LedgerError> {
        let account = self.get_mut(addr)?;
        let mut outcome = LiquidationOutcome::default();

        for pos in account.positions.values_mut() {
            if pos.is_flat() {
                continue;
            }
            let Some(&mark) = mark_prices.get(&pos.symbol) else {
                continue;
            };
            outcome.realized_pnl += pos.unrealized_pnl(mark);
            outcome.margin_released += pos.margin;
            outcome.closed.push((pos.symbol.clone(), pos.size, mark));
            pos.size = 0;
            pos.entry_price = 0;
            pos.margin = 0;
        }

        account.realized_pnl += outcome.realized_pnl;
        account.locked_collateral = account
            .locked_collateral
            .saturating_sub(outcome.margin_released);

        let settled = account.balance as i128 + outcome.realized_pnl;
        if settled < 0 {
            outcome.deficit = settled.unsigned_abs();
            account.balance = 0;
        } else {
            account.balance = settled as u128;
        }
        account.locked_collateral = account.locked_collateral.min(account.balance);

        Ok(outcome)
    }

    /// Apply a realized-P&L delta and a collateral release together,
    /// preserving the balance/lock invariants.
    fn settle(account: &mut Account, realized: i128, unlocked: u128) -> Result<(), LedgerError> {
        if account.locked_collateral < unlocked {
            return Err(LedgerError::InsufficientLocked {
                amount: unlocked,
                locked: account.locked_collateral,
            });
        }
        account.locked_collateral -= unlocked;
        let settled = account.balance as i128 + realized;
        account.balance = settled.max(0) as u128;
        account.locked_collateral = account.locked_collateral.min(account.balance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address([b; 20])
    }

    fn market() -> Market {
        Market::perpetual("HYPL-USDC", "HYPL", "USDC")
    }

    fn funded(ledger: &mut Ledger, b: u8, amount: u128) -> Address {
        let a = addr(b);
        ledger.deposit(a, amount).unwrap();
        a
    }

    #[test]
    fn deposit_withdraw_and_locks() {
        let mut ledger = Ledger::new();
        let a = funded(&mut ledger, 1, 1_000_000);

        ledger.lock_collateral(&a, 400_000).unwrap();
        assert_eq!(ledger.account(&a).unwrap().available(), 600_000);

        // Withdrawal bounded by the free balance.
        assert!(matches!(
            ledger.withdraw(&a, 700_000),
            Err(LedgerError::InsufficientAvailable { .. })
        ));
        ledger.withdraw(&a, 600_000).unwrap();
        assert_eq!(ledger.account(&a).unwrap().balance, 400_000);

        ledger.unlock_collateral(&a, 400_000).unwrap();
        assert!(matches!(
            ledger.unlock_collateral(&a, 1),
            Err(LedgerError::InsufficientLocked { .. })
        ));

        assert!(matches!(
            ledger.deposit(a, 0),
            Err(LedgerError::InvalidAmount)
        ));
    }

    #[test]
    fn nonces_strictly_increase() {
        let mut ledger = Ledger::new();
        let a = addr(1);
        ledger.bump_nonce(a, 5).unwrap();
        assert!(matches!(
            ledger.bump_nonce(a, 5),
            Err(LedgerError::ReplayedNonce { got: 5, current: 5 })
        ));
        assert!(matches!(
            ledger.bump_nonce(a, 3),
            Err(LedgerError::ReplayedNonce { .. })
        ));
        ledger.bump_nonce(a, 6).unwrap();
        assert_eq!(ledger.account(&a).unwrap().nonce, 6);
    }

    #[test]
    fn vwap_entry_on_same_direction_adds() {
        let mut ledger = Ledger::new();
        let a = funded(&mut ledger, 1, 10_000_000);
        ledger.lock_collateral(&a, 1_500_000).unwrap();

        ledger.update_position(&a, "HYPL-USDC", 100, 50_000, 500_000).unwrap();
        ledger.update_position(&a, "HYPL-USDC", 50, 56_000, 280_000).unwrap();

        let pos = &ledger.account(&a).unwrap().positions["HYPL-USDC"];
        assert_eq!(pos.size, 150);
        // (50_000*100 + 56_000*50) / 150 = 52_000
        assert_eq!(pos.entry_price, 52_000);
        assert_eq!(pos.margin, 780_000);
    }

    #[test]
    fn reducing_realizes_proportional_pnl() {
        let mut ledger = Ledger::new();
        let a = funded(&mut ledger, 1, 10_000_000);
        ledger.lock_collateral(&a, 500_000).unwrap();
        ledger.update_position(&a, "HYPL-USDC", 100, 50_000, 500_000).unwrap();

        // Sell 40 at 51_000: realized = (51_000 - 50_000) * 40 = +40_000.
        let update = ledger
            .update_position(&a, "HYPL-USDC", -40, 51_000, 0)
            .unwrap();
        assert_eq!(update.realized_pnl, 40_000);
        assert_eq!(update.new_size, 60);
        // 40% of the margin released.
        assert_eq!(update.unlocked, 200_000);

        let account = ledger.account(&a).unwrap();
        assert_eq!(account.balance, 10_040_000);
        assert_eq!(account.locked_collateral, 300_000);
        assert_eq!(account.realized_pnl, 40_000);
        let pos = &account.positions["HYPL-USDC"];
        assert_eq!(pos.entry_price, 50_000);
        assert_eq!(pos.margin, 300_000);
    }

    #[test]
    fn short_reduction_flips_pnl_sign() {
        let mut ledger = Ledger::new();
        let a = funded(&mut ledger, 1, 10_000_000);
        ledger.lock_collateral(&a, 500_000).unwrap();
        ledger.update_position(&a, "HYPL-USDC", -100, 50_000, 500_000).unwrap();

        // Buy back 100 at 48_000: short gains (50_000 - 48_000) * 100.
        let update = ledger
            .update_position(&a, "HYPL-USDC", 100, 48_000, 0)
            .unwrap();
        assert_eq!(update.realized_pnl, 200_000);
        assert_eq!(update.new_size, 0);
        assert_eq!(update.unlocked, 500_000);

        let pos = &ledger.account(&a).unwrap().positions["HYPL-USDC"];
        assert!(pos.is_flat());
        assert_eq!(pos.entry_price, 0);
        assert_eq!(pos.margin, 0);
    }

    #[test]
    fn sign_flip_resets_entry_and_margin() {
        let mut ledger = Ledger::new();
        let a = funded(&mut ledger, 1, 10_000_000);
        ledger.lock_collateral(&a, 1_300_000).unwrap();
        ledger.update_position(&a, "HYPL-USDC", 100, 50_000, 500_000).unwrap();

        // Sell 160 at 49_000: closes 100 (realizing -100_000), opens -60.
        let update = ledger
            .update_position(&a, "HYPL-USDC", -160, 49_000, 800_000)
            .unwrap();
        assert_eq!(update.realized_pnl, -100_000);
        assert_eq!(update.new_size, -60);
        assert_eq!(update.unlocked, 500_000);

        let account = ledger.account(&a).unwrap();
        let pos = &account.positions["HYPL-USDC"];
        assert_eq!(pos.size, -60);
        assert_eq!(pos.entry_price, 49_000);
        assert_eq!(pos.margin, 800_000);
        assert_eq!(account.balance, 10_000_000 - 100_000);
        assert_eq!(account.locked_collateral, 800_000);
    }

    #[test]
    fn fees_and_rebates() {
        let mut ledger = Ledger::new();
        let a = funded(&mut ledger, 1, 1_000);
        ledger.apply_fees(&a, -30).unwrap();
        ledger.apply_fees(&a, 10).unwrap();
        let account = ledger.account(&a).unwrap();
        assert_eq!(account.balance, 980);
        assert_eq!(account.fees_paid, 30);
        assert_eq!(account.fees_earned, 10);
    }

    #[test]
    fn margin_requirement_checks() {
        let mut ledger = Ledger::new();
        let m = market();
        let a = funded(&mut ledger, 1, 1_000_000);

        // required = 50_000 * 100 * 1000 / 10000 = 500_000 <= 1_000_000
        assert!(ledger.check_margin_requirement(&a, &m, 50_000, 100).is_ok());
        // 300 lots needs 1_500_000.
        assert!(matches!(
            ledger.check_margin_requirement(&a, &m, 50_000, 300),
            Err(LedgerError::InsufficientMargin { .. })
        ));
        assert!(matches!(
            ledger.check_margin_requirement(&addr(9), &m, 50_000, 1),
            Err(LedgerError::UnknownAccount(_))
        ));
    }

    #[test]
    fn max_position_and_leverage_bounds() {
        let mut ledger = Ledger::new();
        let mut m = market();
        m.max_position = 150;
        m.max_order_size = 150;
        let a = funded(&mut ledger, 1, 100_000_000_000);
        ledger.lock_collateral(&a, 500_000).unwrap();
        ledger.update_position(&a, "HYPL-USDC", 100, 50_000, 500_000).unwrap();

        assert!(matches!(
            ledger.check_margin_requirement(&a, &m, 50_000, 60),
            Err(LedgerError::MaxPosition { would_be: 160, .. })
        ));
        // Reducing away from the cap is fine.
        assert!(ledger.check_margin_requirement(&a, &m, 50_000, -60).is_ok());

        // Leverage: a 5x market with 10% initial margin leaves a window
        // where the margin check passes but aggregate notional exceeds
        // max_leverage times the balance.
        let mut conservative = market();
        conservative.max_leverage = 5;
        let mut ledger = Ledger::new();
        let b = funded(&mut ledger, 2, 10_000);
        // notional 70_000 > 5 * 10_000, while required margin 7_000 fits.
        assert!(matches!(
            ledger.check_margin_requirement(&b, &conservative, 100, 700),
            Err(LedgerError::LeverageExceeded { max_leverage: 5 })
        ));
        assert!(ledger
            .check_margin_requirement(&b, &conservative, 100, 400)
            .is_ok());
    }

    #[test]
    fn liquidation_scenario_at_the_boundary() {
        // +100 long at entry 50_000, 100_000 margin locked, 100_000 free.
        let mut ledger = Ledger::new();
        let a = funded(&mut ledger, 1, 200_000);
        ledger.lock_collateral(&a, 100_000).unwrap();
        ledger.update_position(&a, "HYPL-USDC", 100, 50_000, 100_000).unwrap();

        let mut markets = BTreeMap::new();
        markets.insert("HYPL-USDC".to_string(), market());
        let mut marks = BTreeMap::new();
        marks.insert("HYPL-USDC".to_string(), 49_000u64);

        let status = ledger.check_liquidation(&a, &markets, &marks).unwrap();
        // equity = 100_000 free + (49_000 - 50_000) * 100 = 0
        assert_eq!(status.equity, 0);
        // maintenance = 100 * 49_000 * 50 / 10_000 = 24_500
        assert_eq!(status.maintenance_margin, 24_500);
        assert!(status.should_liquidate);

        let outcome = ledger.liquidate(&a, &marks).unwrap();
        assert_eq!(outcome.realized_pnl, -100_000);
        assert_eq!(outcome.margin_released, 100_000);
        assert_eq!(outcome.deficit, 0);

        let account = ledger.account(&a).unwrap();
        assert_eq!(account.balance, 100_000);
        assert_eq!(account.locked_collateral, 0);
        assert!(account.positions["HYPL-USDC"].is_flat());
    }

    #[test]
    fn liquidation_at_entry_price_is_neutral() {
        let mut ledger = Ledger::new();
        let a = funded(&mut ledger, 1, 200_000);
        ledger.lock_collateral(&a, 100_000).unwrap();
        ledger.update_position(&a, "HYPL-USDC", 100, 50_000, 100_000).unwrap();

        let mut marks = BTreeMap::new();
        marks.insert("HYPL-USDC".to_string(), 50_000u64);
        let outcome = ledger.liquidate(&a, &marks).unwrap();

        assert_eq!(outcome.realized_pnl, 0);
        assert_eq!(outcome.deficit, 0);
        let account = ledger.account(&a).unwrap();
        // Balance unchanged, margin merely unlocked.
        assert_eq!(account.balance, 200_000);
        assert_eq!(account.locked_collateral, 0);
    }

    #[test]
    fn liquidation_deficit_clamps_balance() {
        let mut ledger = Ledger::new();
        let a = funded(&mut ledger, 1, 100_000);
        ledger.lock_collateral(&a, 100_000).unwrap();
        ledger.update_position(&a, "HYPL-USDC", 100, 50_000, 100_000).unwrap();

        // Mark collapses: loss of 200_000 against a 100_000 balance.
        let mut marks = BTreeMap::new();
        marks.insert("HYPL-USDC".to_string(), 48_000u64);
        let outcome = ledger.liquidate(&a, &marks).unwrap();

        assert_eq!(outcome.realized_pnl, -200_000);
        assert_eq!(outcome.deficit, 100_000);
        let account = ledger.account(&a).unwrap();
        assert_eq!(account.balance, 0);
        assert_eq!(account.locked_collateral, 0);
    }
}
