//! Execution layer port definitions.
//!
//! Ports define the interfaces for the external collaborators (chain
//! indexer, minting wallet, refund transfers). Adapters implement these
//! ports for specific infrastructure (a node + db-sync deployment, stubs).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vendo_domain::{Address, Lovelace, PolicyId, TokenRef, TxId, Utxo, UtxoRef};

use crate::error::ExecError;

// =============================================================================
// Chain Query Port
// =============================================================================

/// Port for reading chain state through the indexer.
///
/// The indexer is eventually consistent: a transfer can be visible as a UTXO
/// before its inputs are queryable, and a submitted transaction takes a
/// while to show up. Callers treat both as transient.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// All unspent value records currently visible at `address`.
    async fn unspent_records(&self, address: &Address) -> Result<Vec<Utxo>, ExecError>;

    /// Originating address of the transaction that created a transfer.
    ///
    /// Returns `None` while the indexer has not caught up to the creating
    /// transaction's inputs yet.
    async fn input_address(&self, tx_id: &TxId) -> Result<Option<Address>, ExecError>;

    /// Poll until `tx_id` is visible at `address`, up to `max_attempts`.
    ///
    /// Returns `false` on timeout. A timeout is never fatal: the next loop
    /// iteration re-derives its action from ledger state.
    async fn wait_for_visible(
        &self,
        address: &Address,
        tx_id: &TxId,
        max_attempts: u32,
    ) -> Result<bool, ExecError>;
}

// =============================================================================
// Item Minter Port
// =============================================================================

/// One payer's slice of a batched mint transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequest {
    /// Transfer being fulfilled
    pub reference: UtxoRef,
    /// Destination for the minted tokens
    pub payer: Address,
    /// Items to issue, in inventory order
    pub items: Vec<TokenRef>,
    /// Partial-fulfillment remainder returned inside the mint transaction
    pub change: Lovelace,
}

/// Result of a batched mint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    /// Submitted mint transaction id
    pub tx_id: TxId,
    /// Lovelace returned to each payer inside the transaction, one value per
    /// request in request order: the token-carrying output plus any change
    pub returned: Vec<Lovelace>,
}

/// Port for the batched mint operation.
///
/// The adapter owns everything below the contract: merging item metadata,
/// building/signing the transaction that spends the payment UTXOs, the fee
/// and min-UTXO arithmetic, and submission.
#[async_trait]
pub trait ItemMinter: Send + Sync {
    /// Mint every request in one transaction under `policy`.
    ///
    /// Returns the submitted transaction and what each payer got back; any
    /// failure means nothing was submitted and the whole batch can be
    /// retried.
    async fn mint(
        &self,
        requests: &[MintRequest],
        policy: &PolicyId,
    ) -> Result<MintReceipt, ExecError>;
}

// =============================================================================
// Value Transferer Port
// =============================================================================

/// Result of a refund transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    /// Refund transaction id
    pub tx_id: TxId,
    /// Network fee deducted from the returned value
    pub fee: Lovelace,
    /// Amount actually sent back
    pub amount: Lovelace,
}

/// Port for returning a payment to its originating address.
#[async_trait]
pub trait ValueTransferer: Send + Sync {
    /// Return the entire UTXO value, minus the network fee, to `destination`.
    async fn refund_utxo(
        &self,
        utxo: &Utxo,
        destination: &Address,
    ) -> Result<RefundReceipt, ExecError>;
}

// =============================================================================
// Tests
// =============================================================================
