//! Application Layer - Farming and recovery use cases
//!
//! - `pool_resolver`: find or create the pool for a pair, with retries
//! - `cycle`: one open/swap/close cycle as a stage machine
//! - `farming_loop`: runs cycles until stopped
//! - `wallet_rotator`: round-robin wallet selection
//! - `account_scanner`, `batch_closer`, `recovery`: rent recovery pipeline
//! - `token_minter`: fresh SPL mints for test pools

pub mod wallet_rotator;
pub mod pool_resolver;
pub mod cycle;
pub mod farming_loop;
pub mod account_scanner;
pub mod batch_closer;
pub mod recovery;
pub mod token_minter;

pub use wallet_rotator::WalletRotator;
pub use pool_resolver::{PoolResolver, PoolResolverConfig};
pub use cycle::{CycleConfig, CycleOutcome, PositionCycleController};
pub use farming_loop::{FarmingLoop, FarmingStatus};
pub use account_scanner::{AccountScanner, ScanResult};
pub use batch_closer::{BatchCloser, CloseOutcome};
pub use recovery::RecoveryService;
pub use token_minter::{MintReceipt, TokenMinter};
