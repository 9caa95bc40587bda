//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    Config, ConfigError, CycleSection, LiquiditySection, LoggingSection, PoolSection, PoolSelection,
    RecoverySection, SolanaSection, SwapSection, WalletsSection, load_config, parse_config, MAX_SWAPS_PER_CYCLE,
};
