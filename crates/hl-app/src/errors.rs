//! Execution error types.
//!
//! These never escape a block application: a failing transaction is
//! dropped and logged, and execution continues with the next one.

use hl_book::BookError;
use hl_codec::CodecError;
use hl_ledger::LedgerError;
use hl_markets::MarketError;
use thiserror::Error;

/// Why a single transaction was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Market(#[from] MarketError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Book(#[from] BookError),

    /// Cancel referenced an order the sender does not own (or that does
    /// not exist).
    #[error("order {0} not found for sender")]
    UnknownOrder(u64),
}
