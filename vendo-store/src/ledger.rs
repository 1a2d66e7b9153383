//! Durable sales ledger.
//!
//! Keyed record of every observed transfer and its resolution: the
//! idempotency source of truth. The orchestrator checks `contains` before
//! acting on a transfer and commits after every state change, before the
//! next external action, so a crash can only leave a record whose populated
//! fields tell the next run how to resume.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use serde::{Deserialize, Serialize};
use vendo_domain::{Address, Lovelace, RefundDetail, SalesRecord, TokenRef, TxId, UtxoRef};

use crate::error::StoreError;
use crate::inventory::write_document;

/// On-disk form, keyed by the `"txid#ix"` string form of the transfer ref.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDoc {
    sales: BTreeMap<UtxoRef, SalesRecord>,
}

/// Durable, keyed record of every observed transfer.
pub struct SalesLedger {
    path: PathBuf,
    sales: BTreeMap<UtxoRef, SalesRecord>,
}

impl SalesLedger {
    /// Open the ledger at `path`, starting empty if the file does not exist.
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let sales = match fs::read_to_string(&path) {
            Ok(raw) => {
                let doc: LedgerDoc = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::corrupt(&path, e.to_string()))?;
                doc.sales
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        debug!(path = %path.display(), records = sales.len(), "Opened sales ledger");
        Ok(Self { path, sales })
    }

    /// True if a record exists for the transfer (settled or pending).
    pub fn contains(&self, reference: &UtxoRef) -> bool {
        self.sales.contains_key(reference)
    }

    /// Record a newly observed transfer. Idempotent: a no-op when the record
    /// already exists. Returns true if a record was created.
    pub fn record_observed(
        &mut self,
        reference: &UtxoRef,
        amount: Lovelace,
        requested_count: u32,
    ) -> bool {
        if self.sales.contains_key(reference) {
            return false;
        }
        self.sales
            .insert(reference.clone(), SalesRecord::observed(amount, requested_count));
        true
    }

    /// Record the resolved originating address.
    pub fn set_payer_address(
        &mut self,
        reference: &UtxoRef,
        address: Address,
    ) -> Result<(), StoreError> {
        self.pending_mut(reference)?.payer_address = Some(address);
        Ok(())
    }

    /// Record the items issued for the transfer.
    pub fn set_assigned_items(
        &mut self,
        reference: &UtxoRef,
        items: Vec<TokenRef>,
    ) -> Result<(), StoreError> {
        self.pending_mut(reference)?.assigned_items = items;
        Ok(())
    }

    /// Record a refund (partial remainder or full return).
    pub fn set_refund(
        &mut self,
        reference: &UtxoRef,
        refund: RefundDetail,
    ) -> Result<(), StoreError> {
        self.pending_mut(reference)?.refund = Some(refund);
        Ok(())
    }

    /// Record the lovelace the resolving transaction returned to the payer.
    pub fn set_output_amount(
        &mut self,
        reference: &UtxoRef,
        amount: Lovelace,
    ) -> Result<(), StoreError> {
        self.pending_mut(reference)?.output_amount = Some(amount);
        Ok(())
    }

    /// Record the resolving transaction, making the record terminal.
    pub fn set_output_tx_id(&mut self, reference: &UtxoRef, tx_id: TxId) -> Result<(), StoreError> {
        self.pending_mut(reference)?.settle(tx_id);
        Ok(())
    }

    /// Flush the ledger durably (atomic whole-document replace).
    pub fn commit(&self) -> Result<(), StoreError> {
        let doc = LedgerDoc {
            sales: self.sales.clone(),
        };
        write_document(&self.path, &doc)?;
        debug!(records = self.sales.len(), "Sales ledger committed");
        Ok(())
    }

    /// Look up a record.
    pub fn get(&self, reference: &UtxoRef) -> Option<&SalesRecord> {
        self.sales.get(reference)
    }

    /// Number of records, settled and pending.
    pub fn len(&self) -> usize {
        self.sales.len()
    }

    /// True if no transfer has ever been observed.
    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }

    /// References with an on-chain resolution. The allocator skips these;
    /// pending records stay eligible so interrupted work is retried.
    pub fn settled_refs(&self) -> HashSet<UtxoRef> {
        self.sales
            .iter()
            .filter(|(_, record)| record.is_settled())
            .map(|(reference, _)| reference.clone())
            .collect()
    }

    /// Every item the ledger has ever assigned, across all records.
    pub fn assigned_items(&self) -> HashSet<TokenRef> {
        self.sales
            .values()
            .flat_map(|record| record.assigned_items.iter().cloned())
            .collect()
    }

    /// Number of records awaiting resolution.
    pub fn pending_count(&self) -> usize {
        self.sales.values().filter(|r| !r.is_settled()).count()
    }

    /// Mutable access to a record that must still be pending.
    fn pending_mut(&mut self, reference: &UtxoRef) -> Result<&mut SalesRecord, StoreError> {
        let record = self
            .sales
            .get_mut(reference)
            .ok_or_else(|| StoreError::NotFound {
                key: reference.to_string(),
            })?;
        if record.is_settled() {
            return Err(StoreError::AlreadySettled {
                key: reference.to_string(),
            });
        }
        Ok(record)
    }
}

// =============================================================================
// Tests
// =============================================================================
