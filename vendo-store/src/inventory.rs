//! Consumable item inventory with two-phase reservations.
//!
//! The inventory is the ordered list of collectibles that have not been
//! issued yet. Callers never remove items directly: they `reserve` the next
//! `n` items, attempt the external mint, and either `commit` (items are
//! durably gone) or `release` (items return to the head). This is the
//! at-most-once half of the issuance guarantee: the durable consume only
//! happens after the external call is known to have succeeded.
//!
//! # Flow
//!
//! 1. `reserve(n)` → token over the next n items
//! 2. mint using the reserved items
//! 3. `commit(token)` on success, `release(token)` on failure

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use vendo_domain::TokenRef;

use crate::error::StoreError;

/// On-disk form: an ordered list of the remaining item references.
#[derive(Debug, Serialize, Deserialize)]
struct InventoryDoc {
    items: Vec<TokenRef>,
}

// =============================================================================
// Reservation
// =============================================================================

/// Token for a tentative claim on the next items in the inventory.
///
/// Holding a `Reservation` means the items are excluded from `remaining()`
/// but still present in the durable document. The token must be handed back
/// via `Inventory::commit` or `Inventory::release`; it is deliberately not
/// `Clone`, so a reservation cannot be settled twice.
#[derive(Debug)]
pub struct Reservation {
    token: u64,
    items: Vec<TokenRef>,
}

impl Reservation {
    /// The reserved item references, in assignment order.
    pub fn items(&self) -> &[TokenRef] {
        &self.items
    }

    /// Number of reserved items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the reservation is empty (never produced by `reserve`).
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Ordered, consumable list of mintable item references.
pub struct Inventory {
    path: PathBuf,
    items: Vec<TokenRef>,
    /// Items at the head covered by the outstanding reservation
    reserved: usize,
    /// Token of the outstanding reservation, if any
    outstanding: Option<u64>,
    next_token: u64,
}

impl Inventory {
    /// Create a new inventory document at `path` from an ordered item list.
    pub fn create(path: impl Into<PathBuf>, items: Vec<TokenRef>) -> Result<Self, StoreError> {
        let inventory = Self {
            path: path.into(),
            items,
            reserved: 0,
            outstanding: None,
            next_token: 0,
        };
        inventory.persist()?;
        Ok(inventory)
    }

    /// Load an existing inventory document.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let raw = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        let doc: InventoryDoc =
            serde_json::from_str(&raw).map_err(|e| StoreError::corrupt(&path, e.to_string()))?;

        debug!(path = %path.display(), remaining = doc.items.len(), "Loaded inventory");

        Ok(Self {
            path,
            items: doc.items,
            reserved: 0,
            outstanding: None,
            next_token: 0,
        })
    }

    /// Items still available for reservation.
    pub fn remaining(&self) -> usize {
        self.items.len() - self.reserved
    }

    /// Reserve the next `n` items in order.
    ///
    /// # Errors
    /// - `ReservationOutstanding` if a previous reservation was not settled
    /// - `InsufficientInventory` if fewer than `n` items remain
    pub fn reserve(&mut self, n: usize) -> Result<Reservation, StoreError> {
        if self.outstanding.is_some() {
            return Err(StoreError::ReservationOutstanding);
        }
        if n == 0 || n > self.remaining() {
            return Err(StoreError::InsufficientInventory {
                requested: n,
                remaining: self.remaining(),
            });
        }

        let token = self.next_token;
        self.next_token += 1;
        self.reserved = n;
        self.outstanding = Some(token);

        debug!(token, count = n, "Reserved inventory items");

        Ok(Reservation {
            token,
            items: self.items[..n].to_vec(),
        })
    }

    /// Durably consume the reserved items.
    ///
    /// The new document is written to a temporary file in the same directory
    /// and renamed over the old one.
    ///
    /// # Errors
    /// `ReservationMismatch` if the token is not the outstanding reservation.
    pub fn commit(&mut self, reservation: Reservation) -> Result<(), StoreError> {
        if self.outstanding != Some(reservation.token) {
            return Err(StoreError::ReservationMismatch);
        }

        self.items.drain(..reservation.len());
        self.reserved = 0;
        self.outstanding = None;
        self.persist()?;

        info!(
            consumed = reservation.len(),
            remaining = self.items.len(),
            "Inventory committed"
        );
        Ok(())
    }

    /// Return reserved items to the head of the inventory.
    ///
    /// Nothing is persisted; the durable document never contained the claim.
    ///
    /// # Errors
    /// `ReservationMismatch` if the token is not the outstanding reservation.
    pub fn release(&mut self, reservation: Reservation) -> Result<(), StoreError> {
        if self.outstanding != Some(reservation.token) {
            return Err(StoreError::ReservationMismatch);
        }

        self.reserved = 0;
        self.outstanding = None;

        debug!(returned = reservation.len(), "Reservation released");
        Ok(())
    }

    /// Drop every item present in `assigned` and persist if anything changed.
    ///
    /// Startup reconciliation: the ledger commits before the inventory, so a
    /// crash between the two leaves already-assigned items in this document.
    /// Returns the number of items removed.
    ///
    /// # Errors
    /// `ReservationOutstanding` if called while a reservation is open.
    pub fn retain_unassigned(
        &mut self,
        assigned: &HashSet<TokenRef>,
    ) -> Result<usize, StoreError> {
        if self.outstanding.is_some() {
            return Err(StoreError::ReservationOutstanding);
        }

        let before = self.items.len();
        self.items.retain(|item| !assigned.contains(item));
        let removed = before - self.items.len();

        if removed > 0 {
            self.persist()?;
            info!(removed, remaining = self.items.len(), "Inventory reconciled");
        }
        Ok(removed)
    }

    /// Atomic write-then-rename of the current document.
    fn persist(&self) -> Result<(), StoreError> {
        let doc = InventoryDoc {
            items: self.items.clone(),
        };
        write_document(&self.path, &doc)
    }
}

/// Serialize `doc` to a temp file beside `path` and rename it into place.
pub(crate) fn write_document<T: Serialize>(path: &Path, doc: &T) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp =
        tempfile::NamedTempFile::new_in(parent).map_err(|e| StoreError::io(path, e))?;

    let json = serde_json::to_string_pretty(doc)
        .map_err(|e| StoreError::corrupt(path, e.to_string()))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| StoreError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
