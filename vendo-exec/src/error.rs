//! Execution layer error types.

use thiserror::Error;

/// Errors that can occur talking to the chain and its indexer.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Chain or indexer query failed (transient, retried next iteration)
    #[error("Chain query error: {0}")]
    Chain(String),

    /// The mint transaction was rejected or failed to submit
    #[error("Mint rejected: {0}")]
    MintRejected(String),

    /// The refund transfer was rejected or failed to submit
    #[error("Transfer rejected: {0}")]
    TransferRejected(String),

    /// Bounded confirmation wait ran out of attempts
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] vendo_domain::DomainError),
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
