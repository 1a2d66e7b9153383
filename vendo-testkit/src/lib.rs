//! Shared test fixtures for the vendo workspace.

#![warn(clippy::all)]

mod helpers;

pub use helpers::{
    address, item, items, price_table, temp_inventory, temp_ledger, token_ref, utxo, utxo_at,
};
