//! Vendo Drop Daemon
//!
//! Watches a payment address and turns matching payments into batched
//! collectible mints, or refunds once the drop sells out.
//!
//! # Usage
//!
//! ```bash
//! vendod --network testnet --drop launch-one \
//!        --policy <policy-id> --address <payment-address>
//! ```
//!
//! # Environment Variables
//!
//! Every flag has a `VENDO_*` fallback, loaded from the environment or a
//! `.env` file:
//!
//! - `VENDO_NETWORK`: Ledger network (default: testnet)
//! - `VENDO_DROP`: Drop name
//! - `VENDO_POLICY`: Minting policy id
//! - `VENDO_ADDRESS`: Watched payment address
//! - `VENDO_DATA_DIR`: Root data directory (default: data)
//! - `VENDO_POLL_INTERVAL_SECS`: Seconds between chain polls (default: 30)
//! - `VENDO_MAX_ITEMS_PER_TX`: Item ceiling per mint transaction (default: 10)
//! - `VENDO_CONFIRM_ATTEMPTS`: Visibility poll budget (default: 100)

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vendod::{Config, Orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("vendod=info".parse()?))
        .init();

    // Load configuration
    let config = Config::from_args()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        network = %config.network,
        drop = %config.drop,
        "Vendo drop daemon"
    );

    // Stub adapters until real chain adapters land behind the ports
    let orchestrator = Orchestrator::new_stub(config)?;
    orchestrator.run().await?;

    Ok(())
}
