//! Daemon configuration.
//!
//! Configuration comes from the command line, with `VENDO_*` environment
//! variables (and a `.env` file through `dotenvy`) as fallbacks. Everything
//! is validated at startup: a daemon that comes up runs with a coherent
//! price table and a readable inventory, or not at all.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use vendo_domain::{Address, Network, PolicyId, PriceTable};

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// CLI
// =============================================================================

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "vendod", version, about = "Payment-watching collectible drop daemon")]
pub struct Cli {
    /// Ledger network the drop runs on (mainnet, testnet)
    #[arg(long, env = "VENDO_NETWORK", default_value = "testnet")]
    pub network: String,

    /// Drop name; selects the per-drop data subdirectory
    #[arg(long, env = "VENDO_DROP")]
    pub drop: String,

    /// Minting policy id for the drop
    #[arg(long, env = "VENDO_POLICY")]
    pub policy: String,

    /// Watched payment address
    #[arg(long, env = "VENDO_ADDRESS")]
    pub address: String,

    /// Root data directory
    #[arg(long, env = "VENDO_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Seconds between chain polls
    #[arg(long, env = "VENDO_POLL_INTERVAL_SECS", default_value_t = 30)]
    pub poll_interval_secs: u64,

    /// Item ceiling for a single mint transaction
    #[arg(long, env = "VENDO_MAX_ITEMS_PER_TX", default_value_t = 10)]
    pub max_items_per_tx: usize,

    /// Polling attempts when waiting for a submitted transaction
    #[arg(long, env = "VENDO_CONFIRM_ATTEMPTS", default_value_t = 100)]
    pub confirm_attempts: u32,
}

// =============================================================================
// Configuration
// =============================================================================

/// Validated daemon configuration for one drop.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ledger network
    pub network: Network,
    /// Drop name
    pub drop: String,
    /// Minting policy
    pub policy: PolicyId,
    /// Watched payment address
    pub payment_address: Address,
    /// Root data directory
    pub data_dir: PathBuf,
    /// Pause between orchestrator iterations
    pub poll_interval: Duration,
    /// Item ceiling for a single mint transaction
    pub max_items_per_tx: usize,
    /// Polling attempts when waiting for a submitted transaction
    pub confirm_attempts: u32,
}

impl Config {
    /// Parse the command line (and `.env` fallbacks) into a configuration.
    pub fn from_args() -> DaemonResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();
        Self::from_cli(Cli::parse())
    }

    /// Validate parsed arguments.
    pub fn from_cli(cli: Cli) -> DaemonResult<Self> {
        let network: Network = cli
            .network
            .parse()
            .map_err(|e| DaemonError::Config(format!("Invalid --network: {}", e)))?;
        let policy = PolicyId::new(cli.policy)
            .map_err(|e| DaemonError::Config(format!("Invalid --policy: {}", e)))?;
        let payment_address = Address::new(cli.address)
            .map_err(|e| DaemonError::Config(format!("Invalid --address: {}", e)))?;

        if cli.drop.is_empty() {
            return Err(DaemonError::Config("--drop must be non-empty".to_string()));
        }
        if cli.max_items_per_tx == 0 {
            return Err(DaemonError::Config(
                "--max-items-per-tx must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            network,
            drop: cli.drop,
            policy,
            payment_address,
            data_dir: cli.data_dir,
            poll_interval: Duration::from_secs(cli.poll_interval_secs),
            max_items_per_tx: cli.max_items_per_tx,
            confirm_attempts: cli.confirm_attempts,
        })
    }

    /// Create a test configuration rooted at `data_dir`.
    pub fn test(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            network: Network::Testnet,
            drop: "test-drop".to_string(),
            policy: PolicyId::new("policy-test").expect("valid policy"),
            payment_address: Address::new("addr_mint").expect("valid address"),
            data_dir: data_dir.into(),
            poll_interval: Duration::from_millis(10),
            max_items_per_tx: 10,
            confirm_attempts: 3,
        }
    }

    /// On-disk layout for this drop.
    pub fn paths(&self) -> DropPaths {
        let root = self
            .data_dir
            .join(self.network.to_string())
            .join(&self.drop);
        DropPaths {
            inventory: root.join("inventory.json"),
            ledger: root.join("sales.json"),
            prices: root.join("prices.json"),
            root,
        }
    }

    /// Load and validate the price table document for this drop.
    ///
    /// # Errors
    /// `Config` if the file is unreadable, not valid JSON, empty, or holds a
    /// count of zero or above `max_items_per_tx`.
    pub fn load_price_table(&self) -> DaemonResult<PriceTable> {
        let path = self.paths().prices;
        let table = read_price_table(&path)?;
        table
            .validate(self.max_items_per_tx)
            .map_err(|e| DaemonError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(table)
    }
}

fn read_price_table(path: &Path) -> DaemonResult<PriceTable> {
    let raw = fs::read_to_string(path)
        .map_err(|e| DaemonError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| DaemonError::Config(format!("Invalid price table {}: {}", path.display(), e)))
}

/// Derived file locations under `{data_dir}/{network}/{drop}/`.
#[derive(Debug, Clone)]
pub struct DropPaths {
    /// Drop root directory
    pub root: PathBuf,
    /// Remaining-items document
    pub inventory: PathBuf,
    /// Sales ledger document
    pub ledger: PathBuf,
    /// Price table document
    pub prices: PathBuf,
}

// =============================================================================
// Tests
// =============================================================================
