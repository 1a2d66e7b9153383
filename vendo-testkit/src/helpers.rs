//! Test helper functions for building transfers and on-disk state.

use std::collections::BTreeMap;
use tempfile::TempDir;

use vendo_domain::{Address, Lovelace, PriceTable, TokenRef, TxId, Utxo, UtxoRef};
use vendo_store::{Inventory, SalesLedger};

/// A value-only UTXO at output index 0.
pub fn utxo(hash: &str, amount: u64, slot: u64) -> Utxo {
    utxo_at(hash, 0, amount, slot)
}

/// A value-only UTXO at an explicit output index.
pub fn utxo_at(hash: &str, index: u32, amount: u64, slot: u64) -> Utxo {
    Utxo::new(
        UtxoRef::new(TxId::new(hash).expect("valid tx hash"), index),
        Lovelace::new(amount),
        slot,
    )
}

/// A validated address.
pub fn address(value: &str) -> Address {
    Address::new(value).expect("valid address")
}

/// A validated token reference.
pub fn token_ref(value: &str) -> TokenRef {
    TokenRef::new(value).expect("valid token ref")
}

/// Numbered item references: `item-001 .. item-N`.
pub fn items(count: usize) -> Vec<TokenRef> {
    (1..=count).map(|i| item(i)).collect()
}

/// The `i`-th numbered item reference.
pub fn item(i: usize) -> TokenRef {
    token_ref(&format!("item-{:03}", i))
}

/// A price table from (lovelace, count) pairs.
pub fn price_table(entries: &[(u64, u32)]) -> PriceTable {
    let map: BTreeMap<Lovelace, u32> = entries
        .iter()
        .map(|(amount, count)| (Lovelace::new(*amount), *count))
        .collect();
    PriceTable::new(map).expect("valid price table")
}

/// A fresh inventory document in its own temp dir.
///
/// Keep the `TempDir` alive for as long as the inventory is used.
pub fn temp_inventory(count: usize) -> (TempDir, Inventory) {
    let dir = TempDir::new().expect("temp dir");
    let inventory =
        Inventory::create(dir.path().join("inventory.json"), items(count)).expect("inventory");
    (dir, inventory)
}

/// A fresh, empty sales ledger in its own temp dir.
pub fn temp_ledger() -> (TempDir, SalesLedger) {
    let dir = TempDir::new().expect("temp dir");
    let ledger = SalesLedger::load_or_create(dir.path().join("sales.json")).expect("ledger");
    (dir, ledger)
}
