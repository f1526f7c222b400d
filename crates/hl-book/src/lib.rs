//! # Order Book
//!
//! Central-limit order book with strict price-time priority, integer
//! prices (ticks) and quantities (lots). One `OrderBook` per symbol; the
//! execution pipeline holds one lock per book.

pub mod book;
pub mod errors;
pub mod order;

pub use book::{OrderBook, PlaceResult};
pub use errors::BookError;
pub use order::{CancelledOrder, Fill, Order, OrderType, RestingOrder, Side};
