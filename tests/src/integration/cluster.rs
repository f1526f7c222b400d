//! Whole-cluster end-to-end flows: signed envelopes travel through the
//! mempool, proposals, execution and commit, and every replica converges
//! on the same books and balances.

use hl_book::{OrderType, Side};
use hl_codec::TypedDomain;
use hl_storage::BlockStore;
use node_runtime::{Cluster, NodeConfig};
use shared_types::Address;
use std::time::Duration;

use super::support::{wait_until, User, SYMBOL};

fn fast_config(allocations: Vec<(Address, u128)>) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.validators = 4;
    config.storage.in_memory = true;
    config.consensus.vote_timeout = Duration::from_secs(1);
    config.consensus.ppc = Duration::from_millis(400);
    config.consensus.delta = Duration::from_millis(100);
    config.genesis.allocations = allocations;
    config
}

fn domain(config: &NodeConfig) -> TypedDomain {
    TypedDomain::hyperlicked(config.chain_id, config.verifying_contract)
}

#[tokio::test(flavor = "multi_thread")]
async fn cluster_converges_on_matched_trades() {
    let alice = User::new();
    let bob = User::new();
    let config = fast_config(vec![
        (alice.address(), 1_000_000),
        (bob.address(), 1_000_000),
    ]);
    let cluster = Cluster::start(&config).expect("cluster start");
    let domain = domain(&config);

    // Bob rests a bid, Alice hits it.
    cluster.submit(&bob.order(&domain, Side::Buy, OrderType::Gtc, 50_000, 100));
    cluster.submit(&alice.order(&domain, Side::Sell, OrderType::Gtc, 50_000, 60));

    let validators = &cluster.validators;
    wait_until(
        "every replica executes the match",
        Duration::from_secs(20),
        || {
            validators.iter().all(|v| {
                v.app
                    .account(&bob.address())
                    .map(|a| a.positions.get(SYMBOL).map(|p| p.size) == Some(60))
                    .unwrap_or(false)
            })
        },
    )
    .await;

    // Identical books and accounts on every replica.
    for validator in validators {
        let (bids, asks) = validator.app.depth(SYMBOL, 5);
        assert_eq!(bids, vec![(50_000, 40)]);
        assert!(asks.is_empty());
        assert_eq!(validator.app.last_traded_price(SYMBOL), Some(50_000));

        let alice_acct = validator.app.account(&alice.address()).unwrap();
        assert_eq!(alice_acct.positions[SYMBOL].size, -60);
        assert_eq!(alice_acct.positions[SYMBOL].entry_price, 50_000);
    }

    // The replicas committed the trade durably.
    wait_until("trades are persisted", Duration::from_secs(20), || {
        validators.iter().any(|v| {
            v.store
                .trades_by_symbol(SYMBOL, 10)
                .map(|trades| !trades.is_empty())
                .unwrap_or(false)
        })
    })
    .await;

    cluster.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn alo_rejection_and_replay_are_cluster_wide() {
    let alice = User::new();
    let bob = User::new();
    let config = fast_config(vec![
        (alice.address(), 1_000_000),
        (bob.address(), 1_000_000),
    ]);
    let cluster = Cluster::start(&config).expect("cluster start");
    let domain = domain(&config);

    let resting_bid = bob.order(&domain, Side::Buy, OrderType::Gtc, 50_000, 100);
    cluster.submit(&resting_bid);
    let validators = &cluster.validators;
    wait_until("bid rests everywhere", Duration::from_secs(20), || {
        validators
            .iter()
            .all(|v| v.app.best_bid(SYMBOL) == Some(50_000))
    })
    .await;

    // A crossing ALO is rejected on every replica: the nonce is consumed
    // but the book is untouched.
    cluster.submit(&alice.order(&domain, Side::Sell, OrderType::Alo, 49_000, 10));
    wait_until("ALO nonce consumed", Duration::from_secs(20), || {
        validators
            .iter()
            .all(|v| v.app.account(&alice.address()).map(|a| a.nonce) == Some(1))
    })
    .await;
    for validator in validators {
        let (bids, asks) = validator.app.depth(SYMBOL, 5);
        assert_eq!(bids, vec![(50_000, 100)]);
        assert!(asks.is_empty());
        assert_eq!(validator.app.open_orders(&alice.address()), 0);
    }

    // Replaying Bob's envelope bit-for-bit changes nothing.
    let before: Vec<_> = validators
        .iter()
        .map(|v| v.app.account(&bob.address()).unwrap())
        .collect();
    cluster.submit(&resting_bid);
    tokio::time::sleep(Duration::from_secs(3)).await;
    for (validator, earlier) in validators.iter().zip(&before) {
        assert_eq!(&validator.app.account(&bob.address()).unwrap(), earlier);
        let (bids, _) = validator.app.depth(SYMBOL, 5);
        assert_eq!(bids, vec![(50_000, 100)]);
    }

    // The next strictly-greater nonce still works.
    cluster.submit(&bob.order(&domain, Side::Buy, OrderType::Gtc, 49_500, 10));
    wait_until("next nonce accepted", Duration::from_secs(20), || {
        validators
            .iter()
            .all(|v| v.app.account(&bob.address()).map(|a| a.nonce) == Some(2))
    })
    .await;

    cluster.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_releases_collateral_across_the_cluster() {
    let bob = User::new();
    let config = fast_config(vec![(bob.address(), 1_000_000)]);
    let cluster = Cluster::start(&config).expect("cluster start");
    let domain = domain(&config);

    cluster.submit(&bob.order(&domain, Side::Buy, OrderType::Gtc, 50_000, 10));
    let validators = &cluster.validators;
    wait_until("order rests", Duration::from_secs(20), || {
        validators
            .iter()
            .all(|v| v.app.best_bid(SYMBOL) == Some(50_000))
    })
    .await;
    for validator in validators {
        let account = validator.app.account(&bob.address()).unwrap();
        assert_eq!(account.locked_collateral, 50_000);
    }

    // Order ids are deterministic: the first order in the chain is id 1.
    cluster.submit(&bob.cancel(&domain, 1));
    wait_until("cancel empties the book", Duration::from_secs(20), || {
        validators.iter().all(|v| v.app.best_bid(SYMBOL).is_none())
    })
    .await;
    for validator in validators {
        let account = validator.app.account(&bob.address()).unwrap();
        assert_eq!(account.locked_collateral, 0);
        assert_eq!(account.balance, 1_000_000);
        assert_eq!(validator.app.open_orders(&bob.address()), 0);
    }

    cluster.shutdown().await;
}
