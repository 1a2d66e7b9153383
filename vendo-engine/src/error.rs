//! Engine error types.

use thiserror::Error;

/// Errors from the allocation decision logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Price table and batch ceiling disagree. Startup validation makes this
    /// unreachable in a running daemon; hitting it means the configuration
    /// changed underneath us and the process must stop.
    #[error("Configuration error: {0}")]
    Configuration(String),
}
