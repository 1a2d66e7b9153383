//! Vendo Domain Layer
//!
//! Pure domain logic with zero I/O dependencies.
//! Contains value objects, the sales record entity, and domain rules.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod entities;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{RefundDetail, SalesRecord};
pub use value_objects::{
    Address, DomainError, Lovelace, Network, PolicyId, PriceTable, TokenRef, TxId, Utxo, UtxoRef,
};
