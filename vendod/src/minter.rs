//! Batched mint execution.
//!
//! Turns one allocator batch into one mint transaction, driving the durable
//! stores through the order that keeps issuance at-most-once:
//!
//! 1. observe every transfer in the ledger, commit
//! 2. resolve payer addresses (defer the whole batch on indexer lag)
//! 3. reserve the items and split them across the entries in order
//! 4. mint
//! 5. on success: commit the ledger (items, returned value, output tx),
//!    then the inventory
//! 6. on failure: release the reservation, leave the records pending
//!
//! The ledger commits before the inventory so a crash between the two can
//! only leave items that look unsold but are already assigned; startup
//! reconciliation removes those. The reverse order would let the same item
//! be sold twice.

use std::sync::Arc;
use tracing::{debug, info, warn};

use vendo_domain::{Address, Lovelace, PolicyId, RefundDetail, TxId};
use vendo_engine::MintBatch;
use vendo_exec::{ChainQuery, ItemMinter, MintRequest};
use vendo_store::{Inventory, SalesLedger};

use crate::error::{DaemonError, DaemonResult};

// =============================================================================
// Batch Minter
// =============================================================================

/// How a batch execution ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintOutcome {
    /// The batch was minted and both stores are committed.
    Minted {
        /// Submitted mint transaction
        tx_id: TxId,
        /// Items issued
        items: usize,
    },
    /// A payer address is not resolvable yet; nothing was reserved.
    Deferred,
    /// The mint was rejected; the reservation was released and the records
    /// stay pending for the next cycle.
    Failed,
}

/// Executes one mint batch against the chain ports and the durable stores.
pub struct BatchMinter<C, M> {
    chain: Arc<C>,
    minter: Arc<M>,
    policy: PolicyId,
    payment_address: Address,
    confirm_attempts: u32,
}

impl<C: ChainQuery, M: ItemMinter> BatchMinter<C, M> {
    /// Create a batch minter for one drop.
    pub fn new(
        chain: Arc<C>,
        minter: Arc<M>,
        policy: PolicyId,
        payment_address: Address,
        confirm_attempts: u32,
    ) -> Self {
        Self {
            chain,
            minter,
            policy,
            payment_address,
            confirm_attempts,
        }
    }

    /// Execute one batch.
    ///
    /// # Errors
    /// Store failures and invariant violations are fatal. Indexer lag and
    /// mint rejection are not errors; they come back as `Deferred`/`Failed`.
    pub async fn execute(
        &self,
        inventory: &mut Inventory,
        ledger: &mut SalesLedger,
        batch: &MintBatch,
    ) -> DaemonResult<MintOutcome> {
        // Observe first: the durable record must exist before any external
        // action so a crash can never lose a payment.
        for entry in &batch.entries {
            ledger.record_observed(&entry.utxo.reference, entry.utxo.amount, entry.requested);
        }
        ledger.commit()?;

        let Some(payers) = self.resolve_payers(ledger, batch).await? else {
            return Ok(MintOutcome::Deferred);
        };

        let reservation = inventory.reserve(batch.total_items())?;

        // An item both reserved and already assigned means the inventory and
        // ledger disagree about what was sold. Minting would double-issue.
        let assigned = ledger.assigned_items();
        if let Some(duplicate) = reservation.items().iter().find(|i| assigned.contains(*i)) {
            let key = duplicate.clone();
            inventory.release(reservation)?;
            return Err(DaemonError::InvariantViolation(format!(
                "item {} is reserved for minting but already assigned in the sales ledger",
                key
            )));
        }

        let mut requests = Vec::with_capacity(batch.entries.len());
        let mut offset = 0;
        for (entry, payer) in batch.entries.iter().zip(&payers) {
            let granted = entry.granted as usize;
            requests.push(MintRequest {
                reference: entry.utxo.reference.clone(),
                payer: payer.clone(),
                items: reservation.items()[offset..offset + granted].to_vec(),
                change: entry.refund,
            });
            offset += granted;
        }

        let receipt = match self.minter.mint(&requests, &self.policy).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %e, entries = batch.entries.len(), "Mint rejected; releasing reservation");
                inventory.release(reservation)?;
                return Ok(MintOutcome::Failed);
            }
        };
        let tx_id = receipt.tx_id;

        for ((entry, request), returned) in
            batch.entries.iter().zip(&requests).zip(&receipt.returned)
        {
            let reference = &entry.utxo.reference;
            ledger.set_assigned_items(reference, request.items.clone())?;
            if entry.is_partial() {
                ledger.set_refund(
                    reference,
                    RefundDetail {
                        fee: Lovelace::ZERO,
                        amount: entry.refund,
                    },
                )?;
            }
            ledger.set_output_amount(reference, *returned)?;
            ledger.set_output_tx_id(reference, tx_id.clone())?;
        }

        // Ledger first, inventory second.
        ledger.commit()?;
        inventory.commit(reservation)?;

        let items = batch.total_items();
        info!(%tx_id, items, "Mint batch committed");

        match self
            .chain
            .wait_for_visible(&self.payment_address, &tx_id, self.confirm_attempts)
            .await
        {
            Ok(true) => debug!(%tx_id, "Mint transaction visible"),
            Ok(false) => warn!(%tx_id, "Mint transaction not visible within attempt budget"),
            Err(e) => warn!(%tx_id, error = %e, "Visibility check failed"),
        }

        Ok(MintOutcome::Minted { tx_id, items })
    }

    /// Resolve the originating address of every entry, reusing addresses a
    /// previous attempt already persisted. `None` means at least one address
    /// is not queryable yet and the batch must wait.
    async fn resolve_payers(
        &self,
        ledger: &mut SalesLedger,
        batch: &MintBatch,
    ) -> DaemonResult<Option<Vec<Address>>> {
        let mut payers = Vec::with_capacity(batch.entries.len());
        let mut newly_resolved = false;

        for entry in &batch.entries {
            let reference = &entry.utxo.reference;
            if let Some(known) = ledger.get(reference).and_then(|r| r.payer_address.clone()) {
                payers.push(known);
                continue;
            }

            let resolved = match self.chain.input_address(&reference.tx_id).await {
                Ok(Some(address)) => address,
                Ok(None) => {
                    debug!(utxo = %reference, "Payer address not indexed yet; deferring batch");
                    return Ok(None);
                }
                Err(e) => {
                    warn!(utxo = %reference, error = %e, "Payer lookup failed; deferring batch");
                    return Ok(None);
                }
            };

            ledger.set_payer_address(reference, resolved.clone())?;
            newly_resolved = true;
            payers.push(resolved);
        }

        if newly_resolved {
            ledger.commit()?;
        }
        Ok(Some(payers))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vendo_domain::TokenRef;
    use vendo_engine::BatchEntry;
    use vendo_exec::{StubChain, StubMinter};
    use vendo_testkit::{address, item, temp_inventory, temp_ledger, utxo};

    fn minter_under_test(
        chain: Arc<StubChain>,
        stub: Arc<StubMinter>,
    ) -> BatchMinter<StubChain, StubMinter> {
        BatchMinter::new(
            chain,
            stub,
            PolicyId::new("policy-1").unwrap(),
            address("addr_mint"),
            3,
        )
    }

    fn entry(hash: &str, amount: u64, slot: u64, requested: u32, granted: u32) -> BatchEntry {
        let utxo = utxo(hash, amount, slot);
        let refund = if granted < requested {
            utxo.amount.per_item(requested).times(requested - granted)
        } else {
            Lovelace::ZERO
        };
        BatchEntry {
            utxo,
            requested,
            granted,
            refund,
        }
    }

    #[tokio::test]
    async fn test_successful_batch_settles_everything() {
        let chain = Arc::new(StubChain::new());
        let stub = Arc::new(StubMinter::new());
        let (_dir, mut inventory) = temp_inventory(5);
        let (_ldir, mut ledger) = temp_ledger();

        let batch = MintBatch {
            entries: vec![entry("aa", 8_000_000, 10, 1, 1), entry("bb", 20_000_000, 11, 3, 3)],
        };
        chain.set_input_address(TxId::new("aa").unwrap(), address("addr_alice"));
        chain.set_input_address(TxId::new("bb").unwrap(), address("addr_bob"));

        let minter = minter_under_test(chain, stub.clone());
        let outcome = minter
            .execute(&mut inventory, &mut ledger, &batch)
            .await
            .unwrap();

        let MintOutcome::Minted { items, .. } = outcome else {
            panic!("expected mint");
        };
        assert_eq!(items, 4);
        assert_eq!(inventory.remaining(), 1);

        // Items split in order: alice gets the first, bob the next three
        let minted = stub.minted();
        assert_eq!(minted[0].requests[0].items, vec![item(1)]);
        assert_eq!(minted[0].requests[1].items, vec![item(2), item(3), item(4)]);

        for hash in ["aa", "bb"] {
            let reference = utxo(hash, 0, 0).reference;
            let record = ledger.get(&reference).unwrap();
            assert!(record.is_settled());
            assert!(record.payer_address.is_some());
            // Full fills get the plain minimum output back
            assert_eq!(record.output_amount, Some(StubMinter::MIN_OUTPUT));
        }
    }

    #[tokio::test]
    async fn test_unresolved_payer_defers_batch() {
        let chain = Arc::new(StubChain::new());
        let stub = Arc::new(StubMinter::new());
        let (_dir, mut inventory) = temp_inventory(5);
        let (_ldir, mut ledger) = temp_ledger();

        // No input address registered: the indexer has not caught up
        let batch = MintBatch {
            entries: vec![entry("aa", 8_000_000, 10, 1, 1)],
        };

        let minter = minter_under_test(chain, stub.clone());
        let outcome = minter
            .execute(&mut inventory, &mut ledger, &batch)
            .await
            .unwrap();

        assert_eq!(outcome, MintOutcome::Deferred);
        assert!(stub.minted().is_empty());
        assert_eq!(inventory.remaining(), 5);
        // The observation is durable even though nothing was minted
        assert_eq!(ledger.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_mint_releases_reservation() {
        let chain = Arc::new(StubChain::new());
        let stub = Arc::new(StubMinter::new());
        let (_dir, mut inventory) = temp_inventory(5);
        let (_ldir, mut ledger) = temp_ledger();

        let batch = MintBatch {
            entries: vec![entry("aa", 8_000_000, 10, 1, 1)],
        };
        chain.set_input_address(TxId::new("aa").unwrap(), address("addr_alice"));
        stub.set_fail_next(true);

        let minter = minter_under_test(chain, stub.clone());
        let outcome = minter
            .execute(&mut inventory, &mut ledger, &batch)
            .await
            .unwrap();

        assert_eq!(outcome, MintOutcome::Failed);
        assert_eq!(inventory.remaining(), 5);
        assert_eq!(ledger.pending_count(), 1);

        // The next attempt reuses the persisted payer and succeeds
        let outcome = minter
            .execute(&mut inventory, &mut ledger, &batch)
            .await
            .unwrap();
        assert!(matches!(outcome, MintOutcome::Minted { .. }));
        assert_eq!(inventory.remaining(), 4);
    }

    #[tokio::test]
    async fn test_partial_entry_records_refund_and_change() {
        let chain = Arc::new(StubChain::new());
        let stub = Arc::new(StubMinter::new());
        let (_dir, mut inventory) = temp_inventory(2);
        let (_ldir, mut ledger) = temp_ledger();

        // 20 ADA bought 3 but only 2 remain
        let batch = MintBatch {
            entries: vec![entry("aa", 20_000_000, 10, 3, 2)],
        };
        chain.set_input_address(TxId::new("aa").unwrap(), address("addr_alice"));

        let minter = minter_under_test(chain, stub.clone());
        minter
            .execute(&mut inventory, &mut ledger, &batch)
            .await
            .unwrap();

        let expected_change = Lovelace::new(6_666_666);
        assert_eq!(stub.minted()[0].requests[0].change, expected_change);

        let record = ledger.get(&batch.entries[0].utxo.reference).unwrap();
        let refund = record.refund.as_ref().unwrap();
        assert_eq!(refund.amount, expected_change);
        assert_eq!(refund.fee, Lovelace::ZERO);
        // Returned value = minimum output + the change remainder
        assert_eq!(
            record.output_amount,
            Some(Lovelace::new(StubMinter::MIN_OUTPUT.as_u64() + 6_666_666))
        );
        assert_eq!(inventory.remaining(), 0);
    }

    #[tokio::test]
    async fn test_already_assigned_item_is_fatal() {
        let chain = Arc::new(StubChain::new());
        let stub = Arc::new(StubMinter::new());
        let (_dir, mut inventory) = temp_inventory(3);
        let (_ldir, mut ledger) = temp_ledger();

        // Another record already owns the head item the reservation will take
        let older = utxo("zz", 8_000_000, 5).reference;
        ledger.record_observed(&older, Lovelace::new(8_000_000), 1);
        ledger
            .set_assigned_items(&older, vec![TokenRef::new("item-001").unwrap()])
            .unwrap();

        let batch = MintBatch {
            entries: vec![entry("aa", 8_000_000, 10, 1, 1)],
        };
        chain.set_input_address(TxId::new("aa").unwrap(), address("addr_alice"));

        let minter = minter_under_test(chain, stub.clone());
        let result = minter.execute(&mut inventory, &mut ledger, &batch).await;

        assert!(matches!(result, Err(DaemonError::InvariantViolation(_))));
        assert!(stub.minted().is_empty());
    }
}
