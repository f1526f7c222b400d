//! Genesis construction: deterministic validator identities, market
//! registration and initial balances.

use crate::config::NodeConfig;
use hl_app::App;
use hl_markets::MarketRegistry;
use shared_crypto::BlsKeyPair;
use shared_types::{NodeId, ValidatorInfo, ValidatorSet};
use std::sync::Arc;
use tracing::info;

/// A validator identity generated at genesis.
pub struct GenesisValidator {
    pub node_id: NodeId,
    pub bls: BlsKeyPair,
}

/// Deterministic dev-cluster identities: `val-1 .. val-n` with seeded
/// BLS keys. A production deployment provisions real keys instead.
pub fn dev_validators(n: usize) -> Vec<GenesisValidator> {
    (1..=n)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&(i as u64).to_be_bytes());
            seed[31] = 0x42;
            GenesisValidator {
                node_id: format!("val-{i}"),
                bls: BlsKeyPair::from_seed(&seed),
            }
        })
        .collect()
}

/// The public validator set for a list of genesis identities.
pub fn validator_set(validators: &[GenesisValidator]) -> ValidatorSet {
    ValidatorSet::new(
        validators
            .iter()
            .map(|v| ValidatorInfo {
                node_id: v.node_id.clone(),
                bls_public_key: v.bls.public_key().to_bytes(),
            })
            .collect(),
    )
}

/// Register genesis markets into a fresh registry.
pub fn build_registry(config: &NodeConfig) -> anyhow::Result<Arc<MarketRegistry>> {
    let registry = Arc::new(MarketRegistry::new());
    for market in &config.genesis.markets {
        registry
            .register(market.clone())
            .map_err(|e| anyhow::anyhow!("genesis market rejected: {e}"))?;
        info!(symbol = %market.symbol, "genesis market registered");
    }
    Ok(registry)
}

/// Credit genesis balances into an application instance.
pub fn apply_allocations(config: &NodeConfig, app: &App) {
    if config.genesis.allocations.is_empty() {
        return;
    }
    app.apply_genesis(&config.genesis.allocations);
    info!(
        accounts = config.genesis.allocations.len(),
        "genesis balances credited"
    );
}
