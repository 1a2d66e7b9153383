//! Sales record entity.
//!
//! One record per observed transfer, created on first observation and only
//! ever mutated forward. Records are never deleted: the ledger doubles as
//! the audit trail for manual reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Address, Lovelace, TokenRef, TxId};

// =============================================================================
// RefundDetail
// =============================================================================

/// Amount returned to the payer and the network fee it cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundDetail {
    /// Network fee deducted from the returned value
    pub fee: Lovelace,
    /// Amount actually sent back to the payer
    pub amount: Lovelace,
}

// =============================================================================
// SalesRecord
// =============================================================================

/// Durable record of one observed transfer and its resolution.
///
/// A record is **settled** once `output_tx_id` is set (the transfer was
/// fulfilled or refunded on-chain) and **pending** otherwise. Pending
/// records are the retry queue: a crash at any point leaves a record whose
/// populated fields tell the next run what remains to be done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// Lovelace received in the incoming transfer
    pub input_amount: Lovelace,
    /// Item count the payment requested (0 for a pure refund)
    pub requested_count: u32,
    /// Originating address, once resolved from the indexer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_address: Option<Address>,
    /// Items issued for this transfer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_items: Vec<TokenRef>,
    /// Transaction that fulfilled or refunded the transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tx_id: Option<TxId>,
    /// Lovelace the resolving transaction returned to the payer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_amount: Option<Lovelace>,
    /// Refund issued, either the partial remainder or the full amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundDetail>,
    /// When the transfer was first observed
    pub observed_at: DateTime<Utc>,
    /// When the resolution transaction was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SalesRecord {
    /// Create a pending record for a newly observed transfer.
    pub fn observed(input_amount: Lovelace, requested_count: u32) -> Self {
        Self {
            input_amount,
            requested_count,
            payer_address: None,
            assigned_items: Vec::new(),
            output_tx_id: None,
            output_amount: None,
            refund: None,
            observed_at: Utc::now(),
            completed_at: None,
        }
    }

    /// True once the transfer has an on-chain resolution.
    pub fn is_settled(&self) -> bool {
        self.output_tx_id.is_some()
    }

    /// Record the resolution transaction and completion time.
    pub fn settle(&mut self, tx_id: TxId) {
        self.output_tx_id = Some(tx_id);
        self.completed_at = Some(Utc::now());
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_record_is_pending() {
        let record = SalesRecord::observed(Lovelace::new(8_000_000), 1);

        assert!(!record.is_settled());
        assert!(record.assigned_items.is_empty());
        assert!(record.refund.is_none());
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn test_settle_marks_terminal() {
        let mut record = SalesRecord::observed(Lovelace::new(8_000_000), 1);
        record.settle(TxId::new("outtx").unwrap());

        assert!(record.is_settled());
        assert!(record.completed_at.is_some());
    }

    #[test]
    fn test_record_json_omits_unset_fields() {
        let record = SalesRecord::observed(Lovelace::new(8_000_000), 1);
        let json = serde_json::to_string(&record).unwrap();

        assert!(!json.contains("payer_address"));
        assert!(!json.contains("output_tx_id"));
        assert!(!json.contains("output_amount"));
        assert!(!json.contains("assigned_items"));

        let parsed: SalesRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
