//! Vendo Engine Layer
//!
//! Pure decision logic, deterministic, no I/O.
//! Takes the visible transfer set plus inventory/price state and returns at
//! most one action for the orchestrator to execute.

#![warn(clippy::all)]

pub mod allocator;
pub mod error;

pub use allocator::{allocate, Action, BatchEntry, MintBatch};
pub use error::EngineError;
