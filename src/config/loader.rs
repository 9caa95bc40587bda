//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/farmer.toml.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::meteora::pda::MAX_BINS_PER_POSITION;
use crate::domain::{RangeInclusive, TokenDescriptor};

/// Upper bound on `swaps_per_cycle`
pub const MAX_SWAPS_PER_CYCLE: u32 = 100;

/// Main configuration structure matching config/farmer.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub solana: SolanaSection,
    #[serde(default)]
    pub wallets: WalletsSection,
    pub pool: PoolSection,
    pub tokens: Vec<TokenDescriptor>,
    pub liquidity: LiquiditySection,
    pub swap: SwapSection,
    pub cycle: CycleSection,
    #[serde(default)]
    pub recovery: RecoverySection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Solana RPC configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct SolanaSection {
    /// RPC endpoint (use private RPC for production)
    pub rpc_url: String,
    /// Commitment level: "processed", "confirmed", "finalized"
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

impl SolanaSection {
    /// Get RPC URL with environment variable override
    /// Checks SOLANA_RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> String {
        std::env::var("SOLANA_RPC_URL").unwrap_or_else(|_| self.rpc_url.clone())
    }
}

/// Wallet credentials. Keys are rotated in the order listed, inline keys first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletsSection {
    /// Base58 encoded secret keys (prefer WALLET_PRIVATE_KEYS in .env)
    #[serde(default)]
    pub private_keys: Vec<String>,
    /// Keypair files in JSON byte-array format
    #[serde(default)]
    pub keypair_paths: Vec<String>,
}

impl WalletsSection {
    /// Get private keys with environment variable override
    /// WALLET_PRIVATE_KEYS (comma separated) replaces the configured list when set
    pub fn get_private_keys(&self) -> Vec<String> {
        match std::env::var("WALLET_PRIVATE_KEYS") {
            Ok(list) if !list.trim().is_empty() => split_key_list(&list),
            _ => self.private_keys.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.private_keys.is_empty() && self.keypair_paths.is_empty()
    }
}

fn split_key_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(String::from)
        .collect()
}

/// How each cycle picks the pair and bin step when no fixed pool is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolSelection {
    /// First two tokens, first bin step
    #[default]
    First,
    /// Random distinct pair and random bin step every cycle
    Random,
}

/// Pool resolution configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSection {
    /// Fixed pool; skips resolution entirely when set
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_base_factor")]
    pub base_factor: u16,
    /// Attempts before giving up on resolve/create (must be > 0)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Wait after creating a pool before using it
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Position covers active +/- this many bins
    #[serde(default = "default_bin_half_width")]
    pub bin_half_width: i32,
    #[serde(default)]
    pub selection: PoolSelection,
    pub bin_steps: Vec<u16>,
}

/// Position deposit amounts, in human units of each token.
/// `token_x_amount` belongs to the pair token listed first in `[[tokens]]`,
/// whichever side the pool stores it on.
#[derive(Debug, Clone, Deserialize)]
pub struct LiquiditySection {
    pub token_x_amount: Decimal,
    pub token_y_amount: Decimal,
}

/// Swap configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct SwapSection {
    /// Swaps per cycle, drawn uniformly from [min, max]
    pub swaps_per_cycle: RangeInclusive,
    /// Input of the first swap, in the pair token listed first
    #[serde(default = "default_initial_amount")]
    pub initial_amount: Decimal,
    /// Slippage tolerance in basis points (0.5% = 50 bps)
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,
    /// Optional random pause between swaps
    #[serde(default)]
    pub wait_between_swaps_ms: Option<RangeInclusive>,
}

/// Cycle pacing configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct CycleSection {
    pub wait_between_cycles_ms: RangeInclusive,
    pub wait_after_error_ms: u64,
}

/// Rent recovery configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct RecoverySection {
    /// Close transactions in flight per batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RecoverySection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Append-only log file (in addition to stdout)
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: None,
        }
    }
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_base_factor() -> u16 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2_000
}

fn default_settle_delay_ms() -> u64 {
    2_000
}

fn default_bin_half_width() -> i32 {
    10
}

fn default_initial_amount() -> Decimal {
    Decimal::new(1, 2)
}

fn default_slippage_bps() -> u16 {
    50
}

fn default_concurrency() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

fn check_range(name: &str, range: &RangeInclusive) -> Result<(), ConfigError> {
    if !range.is_valid() {
        return Err(ConfigError::ValidationError(format!(
            "{} must have min <= max, got [{}, {}]",
            name, range.min, range.max
        )));
    }
    Ok(())
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate Solana
        if self.solana.rpc_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "rpc_url cannot be empty".to_string(),
            ));
        }

        // Validate wallets (env may still supply keys)
        if self.wallets.is_empty() && self.wallets.get_private_keys().is_empty() {
            return Err(ConfigError::ValidationError(
                "no wallets configured: set wallets.private_keys, wallets.keypair_paths or WALLET_PRIVATE_KEYS".to_string(),
            ));
        }

        // Validate tokens
        if self.tokens.len() < 2 {
            return Err(ConfigError::ValidationError(format!(
                "at least two tokens are required, got {}",
                self.tokens.len()
            )));
        }
        for token in &self.tokens {
            if token.mint().is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "token {} has an invalid mint address: {}",
                    token.symbol, token.address
                )));
            }
        }

        // Validate pool section
        if self.pool.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "max_retries must be > 0".to_string(),
            ));
        }

        if self.pool.bin_steps.is_empty() || self.pool.bin_steps.contains(&0) {
            return Err(ConfigError::ValidationError(format!(
                "bin_steps must be non-empty and positive, got {:?}",
                self.pool.bin_steps
            )));
        }

        let max_half_width = (MAX_BINS_PER_POSITION - 1) / 2;
        if self.pool.bin_half_width < 1 || self.pool.bin_half_width > max_half_width {
            return Err(ConfigError::ValidationError(format!(
                "bin_half_width must be 1-{}, got {}",
                max_half_width, self.pool.bin_half_width
            )));
        }

        if let Some(address) = &self.pool.address {
            if address.parse::<solana_sdk::pubkey::Pubkey>().is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "pool address is not a valid public key: {}",
                    address
                )));
            }
            if self.pool.selection == PoolSelection::Random {
                return Err(ConfigError::ValidationError(
                    "selection = \"random\" cannot be combined with a fixed pool address".to_string(),
                ));
            }
        }

        // Validate amounts
        if self.liquidity.token_x_amount.is_sign_negative()
            || self.liquidity.token_y_amount.is_sign_negative()
        {
            return Err(ConfigError::ValidationError(
                "liquidity amounts cannot be negative".to_string(),
            ));
        }

        if self.swap.initial_amount <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "initial_amount must be > 0, got {}",
                self.swap.initial_amount
            )));
        }

        if self.swap.slippage_bps > 10_000 {
            return Err(ConfigError::ValidationError(format!(
                "slippage_bps must be 0-10000, got {}",
                self.swap.slippage_bps
            )));
        }

        // Validate ranges
        check_range("swaps_per_cycle", &self.swap.swaps_per_cycle)?;
        if self.swap.swaps_per_cycle.max > MAX_SWAPS_PER_CYCLE as u64 {
            return Err(ConfigError::ValidationError(format!(
                "swaps_per_cycle max must be <= {}, got {}",
                MAX_SWAPS_PER_CYCLE, self.swap.swaps_per_cycle.max
            )));
        }
        check_range("wait_between_cycles_ms", &self.cycle.wait_between_cycles_ms)?;
        if let Some(range) = &self.swap.wait_between_swaps_ms {
            check_range("wait_between_swaps_ms", range)?;
        }

        // Validate recovery
        if self.recovery.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "recovery concurrency must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl PoolSection {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl CycleSection {
    pub fn wait_after_error(&self) -> Duration {
        Duration::from_millis(self.wait_after_error_ms)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    pub(crate) fn create_valid_config() -> String {
        r#"
[solana]
rpc_url = "https://api.mainnet-beta.solana.com"
commitment = "confirmed"

[wallets]
keypair_paths = ["~/.config/solana/id.json"]

[pool]
base_factor = 10000
max_retries = 3
retry_delay_ms = 2000
settle_delay_ms = 2000
bin_half_width = 10
selection = "first"
bin_steps = [20, 25]

[[tokens]]
symbol = "USDC"
address = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
decimals = 6

[[tokens]]
symbol = "SOL"
address = "So11111111111111111111111111111111111111112"
decimals = 9

[liquidity]
token_x_amount = "0.3"
token_y_amount = "0.001"

[swap]
swaps_per_cycle = [2, 4]
initial_amount = "0.01"
slippage_bps = 50

[cycle]
wait_between_cycles_ms = [30000, 60000]
wait_after_error_ms = 10000

[recovery]
concurrency = 10

[logging]
level = "info"
log_file = "logs/farmer.log"
"#
        .to_string()
    }

    fn with_replaced(from: &str, to: &str) -> String {
        let config = create_valid_config();
        assert!(config.contains(from), "fixture does not contain {:?}", from);
        config.replace(from, to)
    }

    fn assert_invalid(content: &str) {
        let result = parse_config(content);
        assert!(
            matches!(result, Err(ConfigError::ValidationError(_))),
            "expected validation error, got {:?}",
            result
        );
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_valid_config().as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.tokens.len(), 2);
        assert_eq!(config.tokens[0].symbol, "USDC");
        assert_eq!(config.pool.bin_steps, vec![20, 25]);
        assert_eq!(config.pool.selection, PoolSelection::First);
        assert_eq!(config.swap.swaps_per_cycle, RangeInclusive::new(2, 4));
        assert_eq!(config.swap.initial_amount, dec!(0.01));
        assert_eq!(config.liquidity.token_x_amount, dec!(0.3));
        assert_eq!(config.recovery.concurrency, 10);
        assert!(config.swap.wait_between_swaps_ms.is_none());
        assert_eq!(config.logging.log_file.as_deref(), Some("logs/farmer.log"));
    }

    #[test]
    fn test_defaults_apply() {
        let content = create_valid_config()
            .replace("[recovery]\nconcurrency = 10\n", "")
            .replace("slippage_bps = 50\n", "")
            .replace("max_retries = 3\n", "");
        let config = parse_config(&content).unwrap();

        assert_eq!(config.recovery.concurrency, 10);
        assert_eq!(config.swap.slippage_bps, 50);
        assert_eq!(config.pool.max_retries, 3);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/farmer.toml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = parse_config("[solana\nrpc_url = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_zero_retries_rejected() {
        assert_invalid(&with_replaced("max_retries = 3", "max_retries = 0"));
    }

    #[test]
    fn test_no_wallets_rejected() {
        if std::env::var("WALLET_PRIVATE_KEYS").map_or(false, |v| !v.trim().is_empty()) {
            return;
        }
        assert_invalid(&with_replaced(
            "keypair_paths = [\"~/.config/solana/id.json\"]",
            "keypair_paths = []",
        ));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert_invalid(&with_replaced("concurrency = 10", "concurrency = 0"));
    }

    #[test]
    fn test_inverted_ranges_rejected() {
        assert_invalid(&with_replaced("swaps_per_cycle = [2, 4]", "swaps_per_cycle = [4, 2]"));
        assert_invalid(&with_replaced(
            "wait_between_cycles_ms = [30000, 60000]",
            "wait_between_cycles_ms = [60000, 30000]",
        ));
        assert_invalid(&with_replaced(
            "slippage_bps = 50",
            "slippage_bps = 50\nwait_between_swaps_ms = [500, 100]",
        ));
    }

    #[test]
    fn test_bin_half_width_bounds() {
        assert_invalid(&with_replaced("bin_half_width = 10", "bin_half_width = 35"));
        assert_invalid(&with_replaced("bin_half_width = 10", "bin_half_width = 0"));
        assert!(parse_config(&with_replaced("bin_half_width = 10", "bin_half_width = 34")).is_ok());
    }

    #[test]
    fn test_single_token_rejected() {
        let content = with_replaced(
            "[[tokens]]\nsymbol = \"SOL\"\naddress = \"So11111111111111111111111111111111111111112\"\ndecimals = 9\n",
            "",
        );
        assert_invalid(&content);
    }

    #[test]
    fn test_invalid_mint_rejected() {
        assert_invalid(&with_replaced(
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "not-a-mint",
        ));
    }

    #[test]
    fn test_fixed_pool_address() {
        let config = parse_config(&with_replaced(
            "[pool]\n",
            "[pool]\naddress = \"91Q7G5n6Ux2qYo8vMMiuPGY5bJrjbuMucc8kmncAuqqn\"\n",
        ))
        .unwrap();
        assert_eq!(
            config.pool.address.as_deref(),
            Some("91Q7G5n6Ux2qYo8vMMiuPGY5bJrjbuMucc8kmncAuqqn")
        );

        assert_invalid(&with_replaced("[pool]\n", "[pool]\naddress = \"nope\"\n"));
    }

    #[test]
    fn test_fixed_pool_with_random_selection_rejected() {
        let content = with_replaced(
            "[pool]\n",
            "[pool]\naddress = \"91Q7G5n6Ux2qYo8vMMiuPGY5bJrjbuMucc8kmncAuqqn\"\n",
        );
        assert!(parse_config(&content).is_ok());
        assert_invalid(&content.replace("selection = \"first\"", "selection = \"random\""));
    }

    #[test]
    fn test_swaps_per_cycle_capped() {
        assert!(parse_config(&with_replaced("swaps_per_cycle = [2, 4]", "swaps_per_cycle = [2, 100]")).is_ok());
        assert_invalid(&with_replaced("swaps_per_cycle = [2, 4]", "swaps_per_cycle = [2, 101]"));
        assert_invalid(&with_replaced("swaps_per_cycle = [2, 4]", "swaps_per_cycle = [1, 4294967297]"));
    }

    #[test]
    fn test_random_selection() {
        let config = parse_config(&with_replaced("selection = \"first\"", "selection = \"random\"")).unwrap();
        assert_eq!(config.pool.selection, PoolSelection::Random);
    }

    #[test]
    fn test_split_key_list() {
        assert_eq!(split_key_list(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_key_list(" , ").is_empty());
    }
}
