//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement:
//! - Chain access (balances, token accounts, transaction submission)
//! - DLMM protocol operations (pool lookup, positions, swaps)
//!
//! `mocks` holds in-memory implementations used by the test suites. It is only
//! compiled for tests or with the `test-util` feature.

pub mod chain;
pub mod dlmm;
#[cfg(any(test, feature = "test-util"))]
pub mod mocks;

// Re-export main traits and types
pub use chain::{ChainError, ChainPort};
pub use dlmm::{CreatePoolRequest, DlmmError, DlmmPort, OpenPositionRequest, PoolState, SwapQuote};
