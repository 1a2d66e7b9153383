//! Payment allocator.
//!
//! Matches visible incoming transfers against the price table and the
//! remaining inventory, packing them oldest-first into a single mint batch.
//! Arrival order is never reordered: a transfer that does not fit defers
//! everything behind it to the next cycle rather than letting a later payer
//! jump the queue.

use std::collections::HashSet;
use tracing::debug;

use vendo_domain::{Lovelace, PriceTable, Utxo, UtxoRef};

use crate::error::EngineError;

// =============================================================================
// Batch types
// =============================================================================

/// One transfer's share of a mint batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// The paying transfer
    pub utxo: Utxo,
    /// Items the payment amount asked for
    pub requested: u32,
    /// Items granted (fewer than requested for a partial fill)
    pub granted: u32,
    /// Remainder owed back for a partial fill, zero otherwise
    pub refund: Lovelace,
}

impl BatchEntry {
    /// True if this entry grants fewer items than the payment requested.
    pub fn is_partial(&self) -> bool {
        self.granted < self.requested
    }
}

/// Transfers fulfilled together in one mint transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintBatch {
    /// Entries in arrival order
    pub entries: Vec<BatchEntry>,
}

impl MintBatch {
    /// Total items the batch consumes from the inventory.
    pub fn total_items(&self) -> usize {
        self.entries.iter().map(|e| e.granted as usize).sum()
    }
}

/// The single action an orchestrator iteration executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Mint one batch
    Mint(MintBatch),
    /// Refund these transfers in full (inventory exhausted)
    Refund(Vec<Utxo>),
    /// Nothing actionable this cycle
    Idle,
}

// =============================================================================
// Allocation
// =============================================================================

/// Decide the next action from the currently visible transfer set.
///
/// Rules, applied oldest-slot-first:
/// - transfers with a settled ledger record are skipped (already resolved);
///   pending records stay eligible, which is the retry path after a crash
/// - amounts absent from the price table are ignored entirely; they may be
///   unrelated transfers, not errors
/// - matching transfers are packed into one batch while the requested count
///   fits both the remaining inventory and `max_items_per_tx`
/// - a transfer that does not fit stops the scan; if the batch is still
///   empty and the request exceeds the remaining inventory it becomes a
///   sole-entry partial fill with a proportional refund remainder
/// - with no inventory left, every eligible matching transfer is queued for
///   a full refund instead
///
/// # Errors
/// `EngineError::Configuration` if a bundle fits the inventory but not
/// `max_items_per_tx`; startup validation of the price table prevents this.
pub fn allocate(
    utxos: &[Utxo],
    settled: &HashSet<UtxoRef>,
    prices: &PriceTable,
    remaining: usize,
    max_items_per_tx: usize,
) -> Result<Action, EngineError> {
    let mut ordered: Vec<&Utxo> = utxos.iter().collect();
    ordered.sort_by(|a, b| a.slot.cmp(&b.slot).then_with(|| a.reference.cmp(&b.reference)));

    if remaining == 0 {
        let refunds: Vec<Utxo> = ordered
            .into_iter()
            .filter(|u| !settled.contains(&u.reference))
            .filter(|u| prices.lookup(u.amount).is_some())
            .cloned()
            .collect();
        return Ok(if refunds.is_empty() {
            Action::Idle
        } else {
            Action::Refund(refunds)
        });
    }

    let mut entries: Vec<BatchEntry> = Vec::new();
    let mut packed: usize = 0;

    for utxo in ordered {
        if settled.contains(&utxo.reference) {
            continue;
        }
        let Some(count) = prices.lookup(utxo.amount) else {
            continue;
        };
        let requested = count as usize;

        if packed + requested <= remaining && packed + requested <= max_items_per_tx {
            debug!(utxo = %utxo.reference, count, "Queued for mint");
            entries.push(BatchEntry {
                utxo: utxo.clone(),
                requested: count,
                granted: count,
                refund: Lovelace::ZERO,
            });
            packed += requested;
            continue;
        }

        if entries.is_empty() {
            if requested > remaining {
                // Inventory nearly exhausted: grant what is left and owe the
                // payer the per-item price for the rest.
                let granted = remaining as u32;
                let per_item = utxo.amount.per_item(count);
                let refund = per_item.times(count - granted);
                debug!(utxo = %utxo.reference, granted, %refund, "Queued for partial mint");
                entries.push(BatchEntry {
                    utxo: utxo.clone(),
                    requested: count,
                    granted,
                    refund,
                });
            } else {
                return Err(EngineError::Configuration(format!(
                    "bundle of {} items cannot fit the {} item transaction ceiling",
                    count, max_items_per_tx
                )));
            }
        }

        // Arrival order is preserved: everything behind this transfer waits
        // for the next cycle.
        break;
    }

    Ok(if entries.is_empty() {
        Action::Idle
    } else {
        Action::Mint(MintBatch { entries })
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vendo_domain::TxId;

    fn utxo(hash: &str, amount: u64, slot: u64) -> Utxo {
        Utxo::new(
            UtxoRef::new(TxId::new(hash).unwrap(), 0),
            Lovelace::new(amount),
            slot,
        )
    }

    /// 8 ADA = 1 item, 20 ADA = 3 items
    fn prices() -> PriceTable {
        let mut entries = BTreeMap::new();
        entries.insert(Lovelace::new(8_000_000), 1);
        entries.insert(Lovelace::new(20_000_000), 3);
        PriceTable::new(entries).unwrap()
    }

    fn no_settled() -> HashSet<UtxoRef> {
        HashSet::new()
    }

    #[test]
    fn test_packs_matching_transfers_in_arrival_order() {
        let utxos = vec![
            utxo("bb", 20_000_000, 11),
            utxo("aa", 8_000_000, 10),
            utxo("cc", 8_000_000, 12),
        ];

        let action = allocate(&utxos, &no_settled(), &prices(), 10, 10).unwrap();
        let Action::Mint(batch) = action else {
            panic!("expected mint");
        };

        assert_eq!(batch.entries.len(), 3);
        // Sorted by slot, not input order
        assert_eq!(batch.entries[0].utxo.reference.tx_id.as_str(), "aa");
        assert_eq!(batch.entries[1].utxo.reference.tx_id.as_str(), "bb");
        assert_eq!(batch.entries[2].utxo.reference.tx_id.as_str(), "cc");
        assert_eq!(batch.total_items(), 5);
    }

    #[test]
    fn test_unrelated_amounts_ignored() {
        let utxos = vec![utxo("aa", 1_234_567, 10), utxo("bb", 8_000_000, 11)];

        let action = allocate(&utxos, &no_settled(), &prices(), 10, 10).unwrap();
        let Action::Mint(batch) = action else {
            panic!("expected mint");
        };
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].utxo.reference.tx_id.as_str(), "bb");
    }

    #[test]
    fn test_settled_transfers_skipped() {
        let utxos = vec![utxo("aa", 8_000_000, 10), utxo("bb", 8_000_000, 11)];
        let settled: HashSet<UtxoRef> = [utxos[0].reference.clone()].into_iter().collect();

        let action = allocate(&utxos, &settled, &prices(), 10, 10).unwrap();
        let Action::Mint(batch) = action else {
            panic!("expected mint");
        };
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].utxo.reference.tx_id.as_str(), "bb");
    }

    #[test]
    fn test_idle_when_everything_settled() {
        let utxos = vec![utxo("aa", 8_000_000, 10)];
        let settled: HashSet<UtxoRef> = [utxos[0].reference.clone()].into_iter().collect();

        let action = allocate(&utxos, &settled, &prices(), 10, 10).unwrap();
        assert_eq!(action, Action::Idle);
    }

    #[test]
    fn test_batch_ceiling_stops_scan() {
        // Two 3-item bundles with a ceiling of 4: only the first fits
        let utxos = vec![utxo("aa", 20_000_000, 10), utxo("bb", 20_000_000, 11)];

        let action = allocate(&utxos, &no_settled(), &prices(), 10, 4).unwrap();
        let Action::Mint(batch) = action else {
            panic!("expected mint");
        };
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].utxo.reference.tx_id.as_str(), "aa");
    }

    #[test]
    fn test_partial_fulfillment_when_batch_empty() {
        // 20 ADA buys 3 items but only 2 remain
        let utxos = vec![utxo("aa", 20_000_000, 10)];

        let action = allocate(&utxos, &no_settled(), &prices(), 2, 10).unwrap();
        let Action::Mint(batch) = action else {
            panic!("expected mint");
        };
        assert_eq!(batch.entries.len(), 1);

        let entry = &batch.entries[0];
        assert_eq!(entry.granted, 2);
        assert!(entry.is_partial());
        // per-item = 20 ADA / 3 = 6_666_666; refund = 1 * per-item
        assert_eq!(entry.refund, Lovelace::new(6_666_666));
    }

    #[test]
    fn test_partial_is_sole_entry_and_defers_followers() {
        let utxos = vec![
            utxo("aa", 8_000_000, 10),
            utxo("bb", 20_000_000, 11),
            utxo("cc", 8_000_000, 12),
        ];

        // Inventory of 2: "aa" takes 1, "bb" wants 3 with 1 left, but the
        // batch is non-empty, so the scan stops and "bb"/"cc" wait.
        let action = allocate(&utxos, &no_settled(), &prices(), 2, 10).unwrap();
        let Action::Mint(batch) = action else {
            panic!("expected mint");
        };
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].utxo.reference.tx_id.as_str(), "aa");
        assert!(!batch.entries[0].is_partial());
    }

    #[test]
    fn test_fifo_fairness_late_transfer_not_served_first() {
        // A, B, C each request 3; inventory fits only A and B
        let utxos = vec![
            utxo("aa", 20_000_000, 10),
            utxo("bb", 20_000_000, 11),
            utxo("cc", 20_000_000, 12),
        ];

        let action = allocate(&utxos, &no_settled(), &prices(), 6, 10).unwrap();
        let Action::Mint(batch) = action else {
            panic!("expected mint");
        };
        assert_eq!(batch.entries.len(), 2);
        assert_eq!(batch.entries[0].utxo.reference.tx_id.as_str(), "aa");
        assert_eq!(batch.entries[1].utxo.reference.tx_id.as_str(), "bb");

        // After A and B settle, C gets the partial/refund treatment, never
        // a fill ahead of B.
        let settled: HashSet<UtxoRef> = utxos[..2].iter().map(|u| u.reference.clone()).collect();
        let action = allocate(&utxos, &settled, &prices(), 0, 10).unwrap();
        let Action::Refund(queue) = action else {
            panic!("expected refund");
        };
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].reference.tx_id.as_str(), "cc");
    }

    #[test]
    fn test_sold_out_queues_full_refunds() {
        let utxos = vec![
            utxo("aa", 8_000_000, 10),
            utxo("bb", 1_000_000, 11), // unrelated, ignored
            utxo("cc", 20_000_000, 12),
        ];

        let action = allocate(&utxos, &no_settled(), &prices(), 0, 10).unwrap();
        let Action::Refund(queue) = action else {
            panic!("expected refund");
        };
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].reference.tx_id.as_str(), "aa");
        assert_eq!(queue[1].reference.tx_id.as_str(), "cc");
    }

    #[test]
    fn test_sold_out_with_no_matches_is_idle() {
        let utxos = vec![utxo("aa", 1_000_000, 10)];
        let action = allocate(&utxos, &no_settled(), &prices(), 0, 10).unwrap();
        assert_eq!(action, Action::Idle);
    }

    #[test]
    fn test_empty_visible_set_is_idle() {
        let action = allocate(&[], &no_settled(), &prices(), 10, 10).unwrap();
        assert_eq!(action, Action::Idle);
    }

    #[test]
    fn test_bundle_exceeding_tx_ceiling_is_config_error() {
        // 3-item bundle, 5 items remaining, but ceiling of 2
        let utxos = vec![utxo("aa", 20_000_000, 10)];
        let result = allocate(&utxos, &no_settled(), &prices(), 5, 2);
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_rerun_after_settlement_is_idempotent() {
        let utxos = vec![utxo("aa", 8_000_000, 10), utxo("bb", 20_000_000, 11)];

        let first = allocate(&utxos, &no_settled(), &prices(), 10, 10).unwrap();
        let Action::Mint(batch) = first else {
            panic!("expected mint");
        };
        assert_eq!(batch.entries.len(), 2);

        // Same visible set, now settled: nothing to do
        let settled: HashSet<UtxoRef> = utxos.iter().map(|u| u.reference.clone()).collect();
        let second = allocate(&utxos, &settled, &prices(), 6, 10).unwrap();
        assert_eq!(second, Action::Idle);
    }
}
