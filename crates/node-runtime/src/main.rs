//! HyperLicked validator entry point: runs a local cluster over the
//! in-process network simulator.

use anyhow::Result;
use node_runtime::{Cluster, NodeConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = NodeConfig::from_env();
    config.validate()?;
    info!(
        validators = config.validators,
        chain_id = config.chain_id,
        in_memory = config.storage.in_memory,
        "starting HyperLicked cluster"
    );

    let cluster = Cluster::start(&config)?;
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    cluster.shutdown().await;
    Ok(())
}
