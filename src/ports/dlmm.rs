//! DLMM Port - liquidity protocol operations
//!
//! Address derivation, pool state, and instruction building for pool
//! creation, positions and swaps. Submission is left to the `ChainPort`.

use async_trait::async_trait;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use thiserror::Error;

use super::chain::ChainError;
use crate::domain::PositionHandle;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DlmmError {
    #[error("RPC request failed: {0}")]
    RpcError(String),
    #[error("Invalid pool {0}")]
    InvalidPool(String),
    #[error("Insufficient liquidity in bin arrays for swap quote: {0}")]
    InsufficientLiquidity(String),
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Quote failed: {0}")]
    QuoteError(String),
}

impl From<ChainError> for DlmmError {
    fn from(err: ChainError) -> Self {
        DlmmError::RpcError(err.to_string())
    }
}

/// Decoded pool account, enough to build position and swap instructions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub address: Pubkey,
    pub token_x_mint: Pubkey,
    pub token_y_mint: Pubkey,
    pub reserve_x: Pubkey,
    pub reserve_y: Pubkey,
    pub oracle: Pubkey,
    pub active_id: i32,
    pub bin_step: u16,
    pub base_factor: u16,
    pub base_fee_power_factor: u8,
}

/// Pool creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePoolRequest {
    pub token_x: Pubkey,
    pub token_y: Pubkey,
    pub bin_step: u16,
    pub base_factor: u16,
    pub preset_parameter: Pubkey,
    pub active_id: i32,
}

/// Open a position over `[min_bin_id, max_bin_id]` and deposit both amounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPositionRequest {
    pub position: Pubkey,
    pub user: Pubkey,
    pub amount_x: u64,
    pub amount_y: u64,
    pub min_bin_id: i32,
    pub max_bin_id: i32,
}

/// Swap quote with slippage applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub swap_for_y: bool,
    pub amount_in: u64,
    /// Expected output before slippage
    pub out_amount: u64,
    /// Output floor enforced on-chain
    pub min_out_amount: u64,
    pub fee: u64,
    pub bin_arrays: Vec<Pubkey>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DlmmPort: Send + Sync {
    /// Deterministic pool address for a pair and fee parameters
    fn derive_pool_address(
        &self,
        token_x: &Pubkey,
        token_y: &Pubkey,
        bin_step: u16,
        base_factor: u16,
    ) -> Pubkey;

    /// Preset parameter account required to create a pool
    fn derive_preset_parameter(&self, bin_step: u16, base_factor: u16) -> Pubkey;

    /// Load and validate a pool. Fails with `InvalidPool` if the account is not one.
    async fn load_pool(&self, pool: &Pubkey) -> Result<PoolState, DlmmError>;

    async fn create_pool_instructions(
        &self,
        funder: &Pubkey,
        request: &CreatePoolRequest,
    ) -> Result<Vec<Instruction>, DlmmError>;

    async fn open_position_instructions(
        &self,
        pool: &PoolState,
        request: &OpenPositionRequest,
    ) -> Result<Vec<Instruction>, DlmmError>;

    /// Remove 100% of liquidity, claim fees and close the position
    async fn remove_liquidity_instructions(
        &self,
        pool: &PoolState,
        user: &Pubkey,
        position: &PositionHandle,
    ) -> Result<Vec<Instruction>, DlmmError>;

    /// Bin arrays a swap in this direction walks through; empty if none hold liquidity
    async fn bin_arrays_for_swap(
        &self,
        pool: &PoolState,
        swap_for_y: bool,
    ) -> Result<Vec<Pubkey>, DlmmError>;

    fn swap_quote(
        &self,
        pool: &PoolState,
        amount_in: u64,
        swap_for_y: bool,
        slippage_bps: u16,
        bin_arrays: Vec<Pubkey>,
    ) -> Result<SwapQuote, DlmmError>;

    async fn swap_instructions(
        &self,
        pool: &PoolState,
        user: &Pubkey,
        quote: &SwapQuote,
    ) -> Result<Vec<Instruction>, DlmmError>;
}
