//! Full-refund execution for the sold-out path.
//!
//! Once the inventory is empty every matching payment gets its value back,
//! minus the network fee. Each refund runs through the same durable record
//! discipline as a mint: observe, resolve the payer, transfer, settle. A
//! refund that cannot complete this cycle (indexer lag, rejected transfer)
//! is logged and retried next cycle off its pending ledger record.

use std::sync::Arc;
use tracing::{debug, info, warn};

use vendo_domain::{Address, RefundDetail, Utxo};
use vendo_exec::{ChainQuery, ValueTransferer};
use vendo_store::SalesLedger;

use crate::error::DaemonResult;

// =============================================================================
// Refund Issuer
// =============================================================================

/// Issues full refunds for payments that can no longer be fulfilled.
pub struct RefundIssuer<C, T> {
    chain: Arc<C>,
    transferer: Arc<T>,
    confirm_attempts: u32,
}

impl<C: ChainQuery, T: ValueTransferer> RefundIssuer<C, T> {
    /// Create a refund issuer.
    pub fn new(chain: Arc<C>, transferer: Arc<T>, confirm_attempts: u32) -> Self {
        Self {
            chain,
            transferer,
            confirm_attempts,
        }
    }

    /// Refund every transfer in `queue` that is still unsettled.
    ///
    /// Returns the number of refunds submitted this cycle. Per-transfer
    /// failures skip that transfer only.
    ///
    /// # Errors
    /// Only store failures are fatal.
    pub async fn drain(&self, ledger: &mut SalesLedger, queue: &[Utxo]) -> DaemonResult<usize> {
        let mut issued = 0;

        for utxo in queue {
            let reference = &utxo.reference;
            if ledger.get(reference).is_some_and(|r| r.is_settled()) {
                continue;
            }

            // Requested count zero marks the record as refund-only.
            if ledger.record_observed(reference, utxo.amount, 0) {
                ledger.commit()?;
            }

            let Some(payer) = self.resolve_payer(ledger, utxo).await? else {
                continue;
            };

            let receipt = match self.transferer.refund_utxo(utxo, &payer).await {
                Ok(receipt) => receipt,
                Err(e) => {
                    warn!(utxo = %reference, error = %e, "Refund transfer failed; will retry");
                    continue;
                }
            };

            ledger.set_refund(
                reference,
                RefundDetail {
                    fee: receipt.fee,
                    amount: receipt.amount,
                },
            )?;
            ledger.set_output_amount(reference, receipt.amount)?;
            ledger.set_output_tx_id(reference, receipt.tx_id.clone())?;
            ledger.commit()?;

            info!(utxo = %reference, tx_id = %receipt.tx_id, amount = %receipt.amount, "Refund issued");
            issued += 1;

            match self
                .chain
                .wait_for_visible(&payer, &receipt.tx_id, self.confirm_attempts)
                .await
            {
                Ok(true) => debug!(tx_id = %receipt.tx_id, "Refund transaction visible"),
                Ok(false) => {
                    warn!(tx_id = %receipt.tx_id, "Refund transaction not visible within attempt budget")
                }
                Err(e) => warn!(tx_id = %receipt.tx_id, error = %e, "Visibility check failed"),
            }
        }

        Ok(issued)
    }

    /// Resolve and persist the refund destination. `None` skips the transfer
    /// for this cycle.
    async fn resolve_payer(
        &self,
        ledger: &mut SalesLedger,
        utxo: &Utxo,
    ) -> DaemonResult<Option<Address>> {
        let reference = &utxo.reference;
        if let Some(known) = ledger.get(reference).and_then(|r| r.payer_address.clone()) {
            return Ok(Some(known));
        }

        match self.chain.input_address(&reference.tx_id).await {
            Ok(Some(address)) => {
                ledger.set_payer_address(reference, address.clone())?;
                ledger.commit()?;
                Ok(Some(address))
            }
            Ok(None) => {
                debug!(utxo = %reference, "Payer address not indexed yet; skipping refund");
                Ok(None)
            }
            Err(e) => {
                warn!(utxo = %reference, error = %e, "Payer lookup failed; skipping refund");
                Ok(None)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
