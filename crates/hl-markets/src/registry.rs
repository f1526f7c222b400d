//! Thread-safe symbol -> market map.

use crate::errors::MarketError;
use crate::market::{Market, MarketStatus};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Thread-safe market registry.
///
/// Backed by a `BTreeMap` so that symbol iteration is always sorted: the
/// state-hash path iterates markets in symbol order and must never observe
/// hash-map ordering.
#[derive(Debug, Default)]
pub struct MarketRegistry {
    markets: RwLock<BTreeMap<String, Market>>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a market. Validates parameters and rejects duplicates.
    pub fn register(&self, market: Market) -> Result<(), MarketError> {
        market.validate()?;
        let mut markets = self.markets.write();
        if markets.contains_key(&market.symbol) {
            return Err(MarketError::DuplicateMarket(market.symbol));
        }
        markets.insert(market.symbol.clone(), market);
        Ok(())
    }

    /// Fetch a market by symbol.
    pub fn get(&self, symbol: &str) -> Result<Market, MarketError> {
        self.markets
            .read()
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketError::UnknownMarket(symbol.to_string()))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.markets.read().contains_key(symbol)
    }

    /// All symbols in ascending order.
    pub fn symbols(&self) -> Vec<String> {
        self.markets.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.markets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.read().is_empty()
    }

    /// Drive the status machine for a symbol.
    pub fn set_status(&self, symbol: &str, to: MarketStatus) -> Result<(), MarketError> {
        let mut markets = self.markets.write();
        let market = markets
            .get_mut(symbol)
            .ok_or_else(|| MarketError::UnknownMarket(symbol.to_string()))?;
        if !market.status.can_transition_to(to) {
            return Err(MarketError::InvalidStatusTransition {
                symbol: symbol.to_string(),
                from: market.status,
                to,
            });
        }
        market.status = to;
        Ok(())
    }

    /// Validate an order against a symbol's market. Convenience for the
    /// order-book boundary.
    pub fn validate_order(&self, symbol: &str, price: u64, qty: u64) -> Result<(), MarketError> {
        self.get(symbol)?.validate_order(price, qty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(symbol: &str) -> MarketRegistry {
        let reg = MarketRegistry::new();
        reg.register(Market::perpetual(symbol, "HYPL", "USDC")).unwrap();
        reg
    }

    #[test]
    fn register_get_and_duplicates() {
        let reg = registry_with("HYPL-USDC");
        assert!(reg.contains("HYPL-USDC"));
        assert_eq!(reg.get("HYPL-USDC").unwrap().symbol, "HYPL-USDC");
        assert!(matches!(
            reg.register(Market::perpetual("HYPL-USDC", "HYPL", "USDC")),
            Err(MarketError::DuplicateMarket(_))
        ));
        assert!(matches!(
            reg.get("NOPE-USDC"),
            Err(MarketError::UnknownMarket(_))
        ));
    }

    #[test]
    fn symbols_are_sorted() {
        let reg = MarketRegistry::new();
        for s in ["ZZZ-USDC", "AAA-USDC", "MMM-USDC"] {
            reg.register(Market::perpetual(s, "B", "USDC")).unwrap();
        }
        assert_eq!(reg.symbols(), vec!["AAA-USDC", "MMM-USDC", "ZZZ-USDC"]);
    }

    #[test]
    fn status_transitions_enforced() {
        let reg = registry_with("HYPL-USDC");
        reg.set_status("HYPL-USDC", MarketStatus::Paused).unwrap();
        reg.set_status("HYPL-USDC", MarketStatus::Settling).unwrap();
        reg.set_status("HYPL-USDC", MarketStatus::Settled).unwrap();
        assert!(matches!(
            reg.set_status("HYPL-USDC", MarketStatus::Active),
            Err(MarketError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn paused_market_rejects_orders() {
        let reg = registry_with("HYPL-USDC");
        assert!(reg.validate_order("HYPL-USDC", 50_000, 10).is_ok());
        reg.set_status("HYPL-USDC", MarketStatus::Paused).unwrap();
        assert!(matches!(
            reg.validate_order("HYPL-USDC", 50_000, 10),
            Err(MarketError::MarketInactive { .. })
        ));
    }
}
