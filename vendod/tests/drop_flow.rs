//! End-to-end drop lifecycle against the stub adapters.
//!
//! Walks a small drop through every phase: full batch mints, a partial fill
//! when the inventory runs low, and full refunds once it is exhausted.

use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use vendo_domain::{Lovelace, TxId};
use vendo_exec::{StubChain, StubMinter, StubTransferer};
use vendo_store::Inventory;
use vendo_testkit::{address, item, items, utxo};
use vendod::{Config, IterationOutcome, Orchestrator};

fn seed(dir: &TempDir, item_count: usize) -> Config {
    let config = Config::test(dir.path());
    let paths = config.paths();
    fs::create_dir_all(&paths.root).expect("drop dir");
    Inventory::create(&paths.inventory, items(item_count)).expect("inventory");
    fs::write(&paths.prices, r#"{"8000000": 1, "20000000": 3}"#).expect("prices");
    config
}

#[tokio::test]
async fn test_drop_sells_out_and_switches_to_refunds() {
    let dir = TempDir::new().expect("temp dir");
    let config = seed(&dir, 5);

    let chain = Arc::new(StubChain::new());
    let minter = Arc::new(StubMinter::new());
    let transferer = Arc::new(StubTransferer::new(Lovelace::new(180_000)));
    let mut orchestrator = Orchestrator::new(
        config,
        chain.clone(),
        minter.clone(),
        transferer.clone(),
    )
    .expect("orchestrator");

    // 1. Alice (1 item) and Bob (3 items) arrive and fit one batch.
    chain.add_utxo(utxo("alice", 8_000_000, 10));
    chain.add_utxo(utxo("bob", 20_000_000, 11));
    chain.set_input_address(TxId::new("alice").expect("tx id"), address("addr_alice"));
    chain.set_input_address(TxId::new("bob").expect("tx id"), address("addr_bob"));

    let outcome = orchestrator.iterate().await.expect("iterate");
    assert!(matches!(outcome, IterationOutcome::Minted { items: 4, .. }));
    assert_eq!(orchestrator.remaining(), 1);

    let batch = &minter.minted()[0];
    assert_eq!(batch.requests[0].payer, address("addr_alice"));
    assert_eq!(batch.requests[0].items, vec![item(1)]);
    assert_eq!(batch.requests[1].payer, address("addr_bob"));
    assert_eq!(batch.requests[1].items, vec![item(2), item(3), item(4)]);

    // 2. Carol pays for 3 with one item left: partial fill, two items worth
    //    of change returned inside the mint transaction.
    chain.add_utxo(utxo("carol", 20_000_000, 12));
    chain.set_input_address(TxId::new("carol").expect("tx id"), address("addr_carol"));

    let outcome = orchestrator.iterate().await.expect("iterate");
    assert!(matches!(outcome, IterationOutcome::Minted { items: 1, .. }));
    assert_eq!(orchestrator.remaining(), 0);

    let carol = &minter.minted()[1].requests[0];
    assert_eq!(carol.items, vec![item(5)]);
    // per-item price 20 ADA / 3 = 6_666_666; two items owed back
    assert_eq!(carol.change, Lovelace::new(13_333_332));

    let record = orchestrator
        .ledger()
        .get(&utxo("carol", 20_000_000, 12).reference)
        .expect("carol record");
    assert_eq!(record.refund.as_ref().expect("refund").amount, Lovelace::new(13_333_332));
    // The ledger alone reconciles what carol got back: min output + change
    assert_eq!(
        record.output_amount,
        Some(Lovelace::new(StubMinter::MIN_OUTPUT.as_u64() + 13_333_332))
    );

    // 3. Dave pays after the sell-out: full refund minus the network fee.
    chain.add_utxo(utxo("dave", 8_000_000, 13));
    chain.set_input_address(TxId::new("dave").expect("tx id"), address("addr_dave"));

    let outcome = orchestrator.iterate().await.expect("iterate");
    assert_eq!(outcome, IterationOutcome::Refunded(1));

    let refunds = transferer.refunds();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].1, address("addr_dave"));
    assert_eq!(refunds[0].2.amount, Lovelace::new(7_820_000));

    // 4. Everything settled: re-running over the same visible set is a no-op.
    let outcome = orchestrator.iterate().await.expect("iterate");
    assert_eq!(outcome, IterationOutcome::Idle);
    assert_eq!(minter.minted().len(), 2);
    assert_eq!(transferer.refunds().len(), 1);

    // 5. Conservation: every item is accounted for exactly once.
    let assigned = orchestrator.ledger().assigned_items();
    assert_eq!(assigned.len(), 5);
    assert_eq!(minter.issued_items().len(), 5);
}

#[tokio::test]
async fn test_indexer_lag_defers_batch_until_resolvable() {
    let dir = TempDir::new().expect("temp dir");
    let config = seed(&dir, 2);

    let chain = Arc::new(StubChain::new());
    let minter = Arc::new(StubMinter::new());
    let transferer = Arc::new(StubTransferer::new(Lovelace::new(180_000)));
    let mut orchestrator =
        Orchestrator::new(config, chain.clone(), minter.clone(), transferer).expect("orchestrator");

    // The payment is visible before its inputs are queryable.
    chain.add_utxo(utxo("alice", 8_000_000, 10));

    let outcome = orchestrator.iterate().await.expect("iterate");
    assert_eq!(outcome, IterationOutcome::MintDeferred);
    assert!(minter.minted().is_empty());
    assert_eq!(orchestrator.remaining(), 2);

    // The indexer catches up; the same payment is fulfilled.
    chain.set_input_address(TxId::new("alice").expect("tx id"), address("addr_alice"));
    let outcome = orchestrator.iterate().await.expect("iterate");
    assert!(matches!(outcome, IterationOutcome::Minted { items: 1, .. }));
    assert_eq!(orchestrator.remaining(), 1);
}
