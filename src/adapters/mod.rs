//! Adapters Layer - External System Implementations
//!
//! Implementations of the port traits plus the command line:
//! - Solana: RPC client and wallet management
//! - Meteora: DLMM address derivation, account decoding, instructions and quotes
//! - CLI: Command-line arguments

pub mod solana;
pub mod meteora;
pub mod cli;

pub use solana::{SolanaClient, WalletManager};
pub use meteora::MeteoraDlmmClient;
pub use cli::CliApp;
