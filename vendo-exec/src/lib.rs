//! Vendo Execution Layer
//!
//! Ports for the slow, eventually-consistent infrastructure the orchestrator
//! depends on, plus stub adapters for tests and development.
//!
//! # Architecture
//!
//! ```text
//! Allocator Decision → BatchMinter / RefundIssuer → Ports → Chain
//! ```
//!
//! # Components
//!
//! - **Ports**: Traits for the chain indexer, the mint operation, and the
//!   refund transfer
//! - **Stub**: In-memory implementations with scripted failures
//!
//! Key derivation, transaction encoding/signing and SQL against the indexer
//! all live behind these ports; the core never sees them.

#![warn(clippy::all)]

pub mod error;
pub mod ports;
pub mod stub;

// Re-exports for convenience
pub use error::{ExecError, ExecResult};
pub use ports::{ChainQuery, ItemMinter, MintReceipt, MintRequest, RefundReceipt, ValueTransferer};
pub use stub::{StubChain, StubMinter, StubTransferer};
