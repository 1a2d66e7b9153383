//! Vendo Drop Daemon Library
//!
//! Runtime for a payment-watching collectible drop: polls the chain for
//! payments to the drop address, matches them against the price table, and
//! turns them into batched mints or refunds.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator loop
//!     ├── ChainQuery (visible transfers, payer addresses)
//!     ├── Allocator (vendo-engine: the next action)
//!     ├── BatchMinter ──► ItemMinter port
//!     ├── RefundIssuer ─► ValueTransferer port
//!     └── Inventory + SalesLedger (vendo-store: durable state)
//! ```
//!
//! # Components
//!
//! - **Orchestrator**: poll loop, startup reconciliation, shutdown
//! - **BatchMinter**: one allocator batch → one mint transaction
//! - **RefundIssuer**: full refunds once the inventory is exhausted
//! - **Config**: CLI + environment configuration, startup validation

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod minter;
pub mod orchestrator;
pub mod refunder;

// Re-exports for convenience
pub use config::{Cli, Config, DropPaths};
pub use error::{DaemonError, DaemonResult};
pub use minter::{BatchMinter, MintOutcome};
pub use orchestrator::{IterationOutcome, Orchestrator};
pub use refunder::RefundIssuer;
