//! Storage layer errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error while reading or replacing a document
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Document path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Document did not parse
    #[error("Corrupt document {path}: {message}")]
    Corrupt {
        /// Document path
        path: PathBuf,
        /// Parse failure description
        message: String,
    },

    /// No sales record for the given transfer
    #[error("No sales record for {key}")]
    NotFound {
        /// Ledger key (`txid#ix`)
        key: String,
    },

    /// Reservation asked for more items than remain
    #[error("Insufficient inventory: requested {requested}, remaining {remaining}")]
    InsufficientInventory {
        /// Items requested
        requested: usize,
        /// Items still available
        remaining: usize,
    },

    /// A reservation is already outstanding (single-writer violation)
    #[error("A reservation is already outstanding")]
    ReservationOutstanding,

    /// Commit/release presented a token that is not the outstanding one
    #[error("Reservation token does not match the outstanding reservation")]
    ReservationMismatch,

    /// Attempt to mutate a record that already has an on-chain resolution
    #[error("Sales record {key} is already settled")]
    AlreadySettled {
        /// Ledger key (`txid#ix`)
        key: String,
    },

    /// Domain error passthrough
    #[error("Domain error: {0}")]
    Domain(#[from] vendo_domain::DomainError),
}

impl StoreError {
    /// I/O error tagged with the document it hit
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Corrupt-document error
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: message.into(),
        }
    }
}
