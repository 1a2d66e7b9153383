//! Stub implementations for testing.
//!
//! These implementations simulate the chain indexer, mint wallet, and refund
//! transfers without touching real infrastructure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use vendo_domain::{Address, Lovelace, PolicyId, TokenRef, TxId, Utxo, UtxoRef};

use crate::error::ExecError;
use crate::ports::{ChainQuery, ItemMinter, MintReceipt, MintRequest, RefundReceipt, ValueTransferer};

// =============================================================================
// Stub Chain
// =============================================================================

/// Stub chain indexer.
///
/// Visible UTXOs and input addresses are injected by tests; minted/refunded
/// transaction ids become visible when registered.
pub struct StubChain {
    /// Visible UTXOs at the watched address
    utxos: RwLock<Vec<Utxo>>,
    /// Input address per creating transaction
    input_addresses: RwLock<HashMap<TxId, Address>>,
    /// Transactions considered visible for `wait_for_visible`
    visible: RwLock<HashSet<TxId>>,
    /// Whether to simulate a query failure
    fail_next: RwLock<bool>,
}

impl StubChain {
    /// Create an empty stub chain.
    pub fn new() -> Self {
        Self {
            utxos: RwLock::new(Vec::new()),
            input_addresses: RwLock::new(HashMap::new()),
            visible: RwLock::new(HashSet::new()),
            fail_next: RwLock::new(false),
        }
    }

    /// Add a visible UTXO.
    pub fn add_utxo(&self, utxo: Utxo) {
        self.utxos.write().unwrap().push(utxo);
    }

    /// Remove a UTXO from the visible set (it was spent).
    pub fn spend_utxo(&self, reference: &UtxoRef) {
        self.utxos
            .write()
            .unwrap()
            .retain(|u| &u.reference != reference);
    }

    /// Register the originating address for a transaction.
    pub fn set_input_address(&self, tx_id: TxId, address: Address) {
        self.input_addresses.write().unwrap().insert(tx_id, address);
    }

    /// Mark a transaction as visible on-chain.
    pub fn set_visible(&self, tx_id: TxId) {
        self.visible.write().unwrap().insert(tx_id);
    }

    /// Configure the next query to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap() = fail;
    }

    /// Check if we should fail the next operation.
    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap();
        let fail = *fail_next;
        *fail_next = false; // Reset after check
        fail
    }
}

impl Default for StubChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainQuery for StubChain {
    async fn unspent_records(&self, _address: &Address) -> Result<Vec<Utxo>, ExecError> {
        if self.should_fail() {
            return Err(ExecError::Chain("Simulated query failure".to_string()));
        }
        Ok(self.utxos.read().unwrap().clone())
    }

    async fn input_address(&self, tx_id: &TxId) -> Result<Option<Address>, ExecError> {
        if self.should_fail() {
            return Err(ExecError::Chain("Simulated input lookup failure".to_string()));
        }
        Ok(self.input_addresses.read().unwrap().get(tx_id).cloned())
    }

    async fn wait_for_visible(
        &self,
        _address: &Address,
        tx_id: &TxId,
        _max_attempts: u32,
    ) -> Result<bool, ExecError> {
        if self.should_fail() {
            return Err(ExecError::Chain("Simulated visibility failure".to_string()));
        }
        Ok(self.visible.read().unwrap().contains(tx_id))
    }
}

// =============================================================================
// Stub Minter
// =============================================================================

/// A mint call the stub accepted, kept for assertions.
#[derive(Debug, Clone)]
pub struct RecordedMint {
    /// The requests the call carried
    pub requests: Vec<MintRequest>,
    /// Policy the batch was minted under
    pub policy: PolicyId,
    /// Transaction id the stub returned
    pub tx_id: TxId,
    /// When the stub accepted the call
    pub minted_at: DateTime<Utc>,
}

/// Stub minter that accepts every batch and records it.
///
/// Each payer gets back a flat simulated minimum output value plus the
/// request's change, mirroring what a real mint transaction returns.
pub struct StubMinter {
    /// Simulated minimum lovelace on the token-carrying output
    min_output: Lovelace,
    /// Accepted calls
    minted: RwLock<Vec<RecordedMint>>,
    /// Transaction counter for generating ids
    tx_counter: RwLock<u64>,
    /// Whether to simulate a mint failure
    fail_next: RwLock<bool>,
}

impl StubMinter {
    /// Flat minimum output value the stub simulates.
    pub const MIN_OUTPUT: Lovelace = Lovelace::new(1_500_000);

    /// Create a new stub minter.
    pub fn new() -> Self {
        Self {
            min_output: Self::MIN_OUTPUT,
            minted: RwLock::new(Vec::new()),
            tx_counter: RwLock::new(0),
            fail_next: RwLock::new(false),
        }
    }

    /// Configure the next mint to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap() = fail;
    }

    /// Calls accepted so far.
    pub fn minted(&self) -> Vec<RecordedMint> {
        self.minted.read().unwrap().clone()
    }

    /// Every item issued across all accepted calls.
    pub fn issued_items(&self) -> Vec<TokenRef> {
        self.minted
            .read()
            .unwrap()
            .iter()
            .flat_map(|m| m.requests.iter().flat_map(|r| r.items.iter().cloned()))
            .collect()
    }

    fn next_tx_id(&self) -> TxId {
        let mut counter = self.tx_counter.write().unwrap();
        *counter += 1;
        TxId::new(format!("MINT-{}", *counter)).unwrap()
    }

    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap();
        let fail = *fail_next;
        *fail_next = false;
        fail
    }
}

impl Default for StubMinter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemMinter for StubMinter {
    async fn mint(
        &self,
        requests: &[MintRequest],
        policy: &PolicyId,
    ) -> Result<MintReceipt, ExecError> {
        if self.should_fail() {
            return Err(ExecError::MintRejected("Simulated mint failure".to_string()));
        }
        if requests.is_empty() {
            return Err(ExecError::MintRejected("Empty batch".to_string()));
        }

        let tx_id = self.next_tx_id();
        let returned = requests
            .iter()
            .map(|r| Lovelace::new(self.min_output.as_u64() + r.change.as_u64()))
            .collect();
        self.minted.write().unwrap().push(RecordedMint {
            requests: requests.to_vec(),
            policy: policy.clone(),
            tx_id: tx_id.clone(),
            minted_at: Utc::now(),
        });

        tracing::debug!(%tx_id, batch = requests.len(), "Stub: batch minted");
        Ok(MintReceipt { tx_id, returned })
    }
}

// =============================================================================
// Stub Transferer
// =============================================================================

/// Stub refund transfers with a flat simulated network fee.
pub struct StubTransferer {
    /// Flat fee deducted from every refund
    fee: Lovelace,
    /// Accepted refunds (utxo ref, destination, receipt)
    refunds: RwLock<Vec<(UtxoRef, Address, RefundReceipt)>>,
    /// Transaction counter for generating ids
    tx_counter: RwLock<u64>,
    /// Whether to simulate a transfer failure
    fail_next: RwLock<bool>,
}

impl StubTransferer {
    /// Create a stub with the given flat fee.
    pub fn new(fee: Lovelace) -> Self {
        Self {
            fee,
            refunds: RwLock::new(Vec::new()),
            tx_counter: RwLock::new(0),
            fail_next: RwLock::new(false),
        }
    }

    /// Configure the next transfer to fail.
    pub fn set_fail_next(&self, fail: bool) {
        *self.fail_next.write().unwrap() = fail;
    }

    /// Refunds accepted so far.
    pub fn refunds(&self) -> Vec<(UtxoRef, Address, RefundReceipt)> {
        self.refunds.read().unwrap().clone()
    }

    fn next_tx_id(&self) -> TxId {
        let mut counter = self.tx_counter.write().unwrap();
        *counter += 1;
        TxId::new(format!("REFUND-{}", *counter)).unwrap()
    }

    fn should_fail(&self) -> bool {
        let mut fail_next = self.fail_next.write().unwrap();
        let fail = *fail_next;
        *fail_next = false;
        fail
    }
}

#[async_trait]
impl ValueTransferer for StubTransferer {
    async fn refund_utxo(
        &self,
        utxo: &Utxo,
        destination: &Address,
    ) -> Result<RefundReceipt, ExecError> {
        if self.should_fail() {
            return Err(ExecError::TransferRejected(
                "Simulated transfer failure".to_string(),
            ));
        }

        let receipt = RefundReceipt {
            tx_id: self.next_tx_id(),
            fee: self.fee,
            amount: utxo.amount.saturating_sub(self.fee),
        };

        self.refunds.write().unwrap().push((
            utxo.reference.clone(),
            destination.clone(),
            receipt.clone(),
        ));

        tracing::debug!(utxo = %utxo.reference, %destination, "Stub: refund sent");
        Ok(receipt)
    }
}

// =============================================================================
// Tests
// =============================================================================
