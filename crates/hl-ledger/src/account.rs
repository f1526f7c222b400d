//! Account and position entities.

use serde::{Deserialize, Serialize};
use shared_types::Address;
use std::collections::BTreeMap;

/// A directional position in one market.
///
/// `size > 0` long, `< 0` short, `= 0` flat. Flat positions are retained
/// (zeroed) for auditing. `entry_price` is the volume-weighted average of
/// the fills that built the current exposure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed size in lots.
    pub size: i64,
    /// Volume-weighted entry price in ticks; zero when flat.
    pub entry_price: u64,
    /// Collateral attributed to this position, in quote units.
    pub margin: u128,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        self.size == 0
    }

    /// Unrealized P&L at a mark price: `(mark - entry) * size`, negative
    /// for underwater longs and in-the-money shorts alike.
    pub fn unrealized_pnl(&self, mark: u64) -> i128 {
        (mark as i128 - self.entry_price as i128) * self.size as i128
    }
}

/// A user account.
///
/// Invariants (checked by the ledger's mutation paths):
/// - `locked_collateral <= balance`
/// - `Σ position.margin <= locked_collateral`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    /// Strictly increasing replay-protection counter.
    pub nonce: u64,
    /// Total balance in quote units, including locked collateral.
    pub balance: u128,
    /// Portion of `balance` locked for open orders and position margin.
    pub locked_collateral: u128,
    /// Positions by symbol. Sorted map: iteration order is part of the
    /// determinism contract.
    pub positions: BTreeMap<String, Position>,
    pub realized_pnl: i128,
    pub fees_paid: u128,
    pub fees_earned: u128,
    /// Cumulative traded notional.
    pub volume: u128,
    pub trade_count: u64,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Balance not locked as collateral.
    pub fn available(&self) -> u128 {
        self.balance - self.locked_collateral
    }

    /// Sum of margin across positions.
    pub fn position_margin(&self) -> u128 {
        self.positions.values().map(|p| p.margin).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrealized_pnl_signs() {
        let long = Position {
            symbol: "HYPL-USDC".into(),
            size: 100,
            entry_price: 50_000,
            margin: 500_000,
        };
        assert_eq!(long.unrealized_pnl(51_000), 100_000);
        assert_eq!(long.unrealized_pnl(49_000), -100_000);

        let short = Position {
            size: -100,
            ..long.clone()
        };
        assert_eq!(short.unrealized_pnl(49_000), 100_000);
        assert_eq!(short.unrealized_pnl(51_000), -100_000);
        assert_eq!(short.unrealized_pnl(50_000), 0);
    }

    #[test]
    fn account_serde_round_trip() {
        let mut account = Account::new(Address([7u8; 20]));
        account.nonce = 9;
        account.balance = 1_000_000;
        account.locked_collateral = 300_000;
        account.realized_pnl = -1_234;
        account.fees_paid = 600;
        account.volume = 3_000_000;
        account.trade_count = 2;
        account.positions.insert(
            "HYPL-USDC".to_string(),
            Position {
                symbol: "HYPL-USDC".into(),
                size: -60,
                entry_price: 50_000,
                margin: 300_000,
            },
        );

        let bytes = bincode::serialize(&account).unwrap();
        let back: Account = bincode::deserialize(&bytes).unwrap();
        assert_eq!(account, back);
    }
}
