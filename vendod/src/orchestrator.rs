//! Main drop loop.
//!
//! One iteration: query the visible transfers at the payment address, let
//! the allocator pick the single next action, execute it, sleep. Shutdown is
//! honored only between iterations, so a commit sequence is never cut in
//! half. Everything the loop does is re-derivable from the two durable
//! documents, which is what makes killing the process at any point safe.
//!
//! # Lifecycle
//!
//! 1. Load configuration, price table, inventory and ledger
//! 2. Reconcile the inventory against the ledger (crash recovery)
//! 3. Poll loop: allocate → mint | refund | idle → sleep
//! 4. Stop on ctrl-c

use std::sync::Arc;
use tracing::{debug, info, warn};

use vendo_domain::{Lovelace, PriceTable, TxId};
use vendo_engine::{allocate, Action};
use vendo_exec::{ChainQuery, ItemMinter, StubChain, StubMinter, StubTransferer, ValueTransferer};
use vendo_store::{Inventory, SalesLedger};

use crate::config::Config;
use crate::error::DaemonResult;
use crate::minter::{BatchMinter, MintOutcome};
use crate::refunder::RefundIssuer;

// =============================================================================
// Orchestrator
// =============================================================================

/// What a single loop iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// A batch was minted and committed.
    Minted {
        /// Submitted mint transaction
        tx_id: TxId,
        /// Items issued
        items: usize,
    },
    /// A batch was allocated but a payer address is not indexed yet.
    MintDeferred,
    /// A batch was allocated but the mint was rejected.
    MintFailed,
    /// This many full refunds were submitted.
    Refunded(usize),
    /// The chain query failed; nothing was attempted.
    Skipped,
    /// Nothing actionable was visible.
    Idle,
}

/// The drop daemon: stores, ports, and the poll loop.
pub struct Orchestrator<C, M, T> {
    config: Config,
    prices: PriceTable,
    inventory: Inventory,
    ledger: SalesLedger,
    chain: Arc<C>,
    minter: BatchMinter<C, M>,
    refunder: RefundIssuer<C, T>,
}

impl Orchestrator<StubChain, StubMinter, StubTransferer> {
    /// Create an orchestrator wired to stub adapters.
    ///
    /// Used for tests and development until real chain adapters exist behind
    /// the execution ports.
    pub fn new_stub(config: Config) -> DaemonResult<Self> {
        Self::new(
            config,
            Arc::new(StubChain::new()),
            Arc::new(StubMinter::new()),
            Arc::new(StubTransferer::new(Lovelace::new(180_000))),
        )
    }
}

impl<C, M, T> Orchestrator<C, M, T>
where
    C: ChainQuery,
    M: ItemMinter,
    T: ValueTransferer,
{
    /// Load the drop state from disk and wire the components.
    ///
    /// # Errors
    /// `Config` for a bad price table; `Store` for an unreadable inventory
    /// or ledger document. All fatal: the daemon refuses to start.
    pub fn new(
        config: Config,
        chain: Arc<C>,
        item_minter: Arc<M>,
        transferer: Arc<T>,
    ) -> DaemonResult<Self> {
        let prices = config.load_price_table()?;
        let paths = config.paths();
        let inventory = Inventory::load(&paths.inventory)?;
        let ledger = SalesLedger::load_or_create(&paths.ledger)?;

        if inventory.remaining() == 0 {
            warn!("Inventory is empty; running in refund-only mode");
        }

        let minter = BatchMinter::new(
            chain.clone(),
            item_minter,
            config.policy.clone(),
            config.payment_address.clone(),
            config.confirm_attempts,
        );
        let refunder = RefundIssuer::new(chain.clone(), transferer, config.confirm_attempts);

        Ok(Self {
            config,
            prices,
            inventory,
            ledger,
            chain,
            minter,
            refunder,
        })
    }

    /// Remove from the inventory every item the ledger already assigned.
    ///
    /// The mint path commits the ledger before the inventory; a crash
    /// between the two leaves sold items in the inventory document. Running
    /// this once at startup restores the conservation invariant. Returns
    /// the number of items removed.
    pub fn reconcile(&mut self) -> DaemonResult<usize> {
        let assigned = self.ledger.assigned_items();
        let removed = self.inventory.retain_unassigned(&assigned)?;
        if removed > 0 {
            warn!(
                removed,
                remaining = self.inventory.remaining(),
                "Dropped ledger-assigned items from inventory (interrupted commit)"
            );
        }
        Ok(removed)
    }

    /// Execute one poll iteration.
    ///
    /// # Errors
    /// Fatal conditions only: store failures, invariant violations, or an
    /// allocation that contradicts the validated configuration.
    pub async fn iterate(&mut self) -> DaemonResult<IterationOutcome> {
        let utxos = match self
            .chain
            .unspent_records(&self.config.payment_address)
            .await
        {
            Ok(utxos) => utxos,
            Err(e) => {
                warn!(error = %e, "Chain query failed; skipping iteration");
                return Ok(IterationOutcome::Skipped);
            }
        };

        let settled = self.ledger.settled_refs();
        let action = allocate(
            &utxos,
            &settled,
            &self.prices,
            self.inventory.remaining(),
            self.config.max_items_per_tx,
        )?;

        match action {
            Action::Mint(batch) => {
                let outcome = self
                    .minter
                    .execute(&mut self.inventory, &mut self.ledger, &batch)
                    .await?;
                Ok(match outcome {
                    MintOutcome::Minted { tx_id, items } => {
                        info!(
                            %tx_id,
                            items,
                            remaining = self.inventory.remaining(),
                            "Batch fulfilled"
                        );
                        IterationOutcome::Minted { tx_id, items }
                    }
                    MintOutcome::Deferred => IterationOutcome::MintDeferred,
                    MintOutcome::Failed => IterationOutcome::MintFailed,
                })
            }
            Action::Refund(queue) => {
                let issued = self.refunder.drain(&mut self.ledger, &queue).await?;
                Ok(IterationOutcome::Refunded(issued))
            }
            Action::Idle => {
                debug!("Nothing actionable");
                Ok(IterationOutcome::Idle)
            }
        }
    }

    /// Run the drop until ctrl-c.
    pub async fn run(mut self) -> DaemonResult<()> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            network = %self.config.network,
            drop = %self.config.drop,
            remaining = self.inventory.remaining(),
            records = self.ledger.len(),
            "Starting drop daemon"
        );

        self.reconcile()?;

        loop {
            self.iterate().await?;

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        info!(
            remaining = self.inventory.remaining(),
            pending = self.ledger.pending_count(),
            "Shutdown complete"
        );
        Ok(())
    }

    /// Remaining unissued items.
    pub fn remaining(&self) -> usize {
        self.inventory.remaining()
    }

    /// Read access to the sales ledger.
    pub fn ledger(&self) -> &SalesLedger {
        &self.ledger
    }
}

// =============================================================================
// Tests
// =============================================================================
