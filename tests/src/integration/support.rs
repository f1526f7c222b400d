//! Shared fixtures for the integration flows.

use hl_book::{OrderType, Side};
use hl_codec::{sign_cancel, sign_order, ParsedCancel, ParsedOrder, TypedDomain};
use shared_crypto::EcdsaKeyPair;
use std::time::Duration;

pub const SYMBOL: &str = "HYPL-USDC";

/// A funded trading user.
pub struct User {
    pub keypair: EcdsaKeyPair,
    nonce: std::sync::atomic::AtomicU64,
}

impl User {
    pub fn new() -> Self {
        Self {
            keypair: EcdsaKeyPair::generate(),
            nonce: std::sync::atomic::AtomicU64::new(0),
        }
    }

    pub fn address(&self) -> shared_types::Address {
        self.keypair.address()
    }

    fn next_nonce(&self) -> u64 {
        self.nonce
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1
    }

    /// A signed order envelope with the next nonce.
    pub fn order(
        &self,
        domain: &TypedDomain,
        side: Side,
        order_type: OrderType,
        price: u64,
        qty: u64,
    ) -> Vec<u8> {
        let order = ParsedOrder {
            symbol: SYMBOL.into(),
            side,
            order_type,
            price,
            qty,
            nonce: self.next_nonce(),
            deadline: 0,
            leverage: 10,
            owner: self.address(),
            agent_mode: false,
            delegation_id: None,
        };
        sign_order(&self.keypair, &order, domain)
            .expect("signing cannot fail")
            .to_bytes()
    }

    /// A signed cancel envelope with the next nonce.
    pub fn cancel(&self, domain: &TypedDomain, order_id: u64) -> Vec<u8> {
        let cancel = ParsedCancel {
            order_id,
            symbol: SYMBOL.into(),
            nonce: self.next_nonce(),
            owner: self.address(),
        };
        sign_cancel(&self.keypair, &cancel, domain)
            .expect("signing cannot fail")
            .to_bytes()
    }
}

/// Poll until `condition` holds or the deadline passes.
pub async fn wait_until<F>(what: &str, timeout: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
