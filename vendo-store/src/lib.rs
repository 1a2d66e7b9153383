//! Vendo Storage Layer
//!
//! Durable state for the issuance daemon: the consumable item inventory and
//! the sales ledger. Both are small JSON documents rewritten wholesale and
//! replaced atomically (write-to-temp, then rename), which is acceptable at
//! the transfer frequency of a drop and means a crash mid-commit leaves the
//! old or the new document, never a torn one.
//!
//! # Single-writer
//!
//! Neither store takes locks against other processes. Running two daemons
//! against the same inventory or ledger is a precondition violation.

#![warn(clippy::all)]

// Modules
mod error;
mod inventory;
mod ledger;

// Re-exports
pub use error::StoreError;
pub use inventory::{Inventory, Reservation};
pub use ledger::SalesLedger;
