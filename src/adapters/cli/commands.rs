//! CLI Commands
//!
//! Argument definitions for the farmer binary. Handlers live in `main.rs`.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Meteora DLMM farmer - open position, swap, withdraw, repeat
#[derive(Parser, Debug)]
#[command(
    name = "meteora-farmer",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Meteora DLMM liquidity farmer and rent recovery tool",
    long_about = "Runs randomized liquidity cycles against Meteora DLMM pools: open a \
                  position around the active bin, swap back and forth, withdraw, repeat. \
                  Also scans wallets for empty token accounts and reclaims their rent."
)]
pub struct CliApp {
    /// The command to execute (defaults to `farm`)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/farmer.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

impl CliApp {
    /// The subcommand to run; no subcommand means farm
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Farm(FarmCmd::default()))
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the farming loop until Ctrl+C
    Farm(FarmCmd),

    /// Scan wallets for empty token accounts and reclaim their rent
    Recover(RecoverCmd),

    /// Create a new SPL token and mint an initial supply
    Mint(MintCmd),

    /// Show configured wallets and their balances
    Status(StatusCmd),
}

/// Run the farming loop
#[derive(Parser, Debug, Clone, Default)]
pub struct FarmCmd {
    /// Stop after this many cycles
    #[arg(long, value_name = "N")]
    pub cycles: Option<u64>,

    /// Override RPC URL
    #[arg(long, value_name = "URL")]
    pub rpc_url: Option<String>,
}

/// Reclaim rent from empty token accounts
#[derive(Parser, Debug, Clone)]
pub struct RecoverCmd {
    /// Close the accounts (default is scan only)
    #[arg(long)]
    pub execute: bool,

    /// Concurrent close transactions per batch (overrides config)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Print the reports as JSON
    #[arg(long)]
    pub json: bool,

    /// Override RPC URL
    #[arg(long, value_name = "URL")]
    pub rpc_url: Option<String>,
}

/// Create a test token
#[derive(Parser, Debug, Clone)]
pub struct MintCmd {
    /// Decimal places of the new mint
    #[arg(long, value_name = "D", default_value = "9")]
    pub decimals: u8,

    /// Initial supply in whole tokens
    #[arg(long, value_name = "AMOUNT", default_value = "1000000000")]
    pub supply: Decimal,

    /// Override RPC URL
    #[arg(long, value_name = "URL")]
    pub rpc_url: Option<String>,
}

/// Wallet balances
#[derive(Parser, Debug, Clone)]
pub struct StatusCmd {
    /// Output format (text, json)
    #[arg(short, long, value_name = "FORMAT", default_value = "text")]
    pub format: String,
}
