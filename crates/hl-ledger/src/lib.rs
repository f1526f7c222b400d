//! # Account Ledger
//!
//! Balances, collateral locking, positions with volume-weighted entry
//! prices, realized P&L, fee accrual, margin requirement checks and
//! liquidation. All amounts are integers; divisions truncate toward zero.
//! Nothing in this crate touches floating point.

pub mod account;
pub mod errors;
pub mod ledger;

pub use account::{Account, Position};
pub use errors::LedgerError;
pub use ledger::{Ledger, LiquidationOutcome, LiquidationStatus, PositionUpdate};
