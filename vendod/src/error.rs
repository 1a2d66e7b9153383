//! Daemon error types.

use thiserror::Error;
use vendo_domain::DomainError;
use vendo_engine::EngineError;
use vendo_exec::ExecError;
use vendo_store::StoreError;

/// Daemon-level errors.
///
/// Anything that reaches the caller of `Orchestrator::run` is fatal; the
/// transient failure modes (chain query errors, indexer lag, rejected mints)
/// are absorbed inside the loop and retried on the next iteration.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Execution error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A durable-state invariant no longer holds. Continuing risks issuing
    /// the same item twice, so the process must stop.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
