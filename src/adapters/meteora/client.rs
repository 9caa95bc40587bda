use async_trait::async_trait;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, system_instruction};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::sync::Arc;

use super::instructions::{self, InitializeLbPairAccounts, PositionAccounts, FULL_WITHDRAWAL_BPS};
use super::pda::{self, MAX_BINS_PER_POSITION};
use super::quote::quote_exact_in;
use super::state::decode_lb_pair;
use crate::domain::PositionHandle;
use crate::ports::{
    ChainPort, CreatePoolRequest, DlmmError, DlmmPort, OpenPositionRequest, PoolState,
    SwapQuote,
};

/// Bin arrays inspected in the swap direction, active array included
const SWAP_BIN_ARRAY_LOOKAHEAD: i64 = 4;

/// Meteora DLMM client: reads pool state through a `ChainPort` and builds lb_clmm instructions
#[derive(Clone)]
pub struct MeteoraDlmmClient {
    chain: Arc<dyn ChainPort>,
}

impl MeteoraDlmmClient {
    pub fn new(chain: Arc<dyn ChainPort>) -> Self {
        Self { chain }
    }

    fn native_mint() -> Pubkey {
        spl_token::native_mint::id()
    }

    fn user_ata(user: &Pubkey, mint: &Pubkey) -> Pubkey {
        get_associated_token_address(user, mint)
    }

    fn create_ata(user: &Pubkey, mint: &Pubkey) -> Instruction {
        create_associated_token_account_idempotent(user, user, mint, &spl_token::id())
    }

    /// Move `lamports` into the user's wrapped SOL account
    fn wrap_sol(user: &Pubkey, lamports: u64) -> Result<Vec<Instruction>, DlmmError> {
        let ata = Self::user_ata(user, &Self::native_mint());
        let sync = spl_token::instruction::sync_native(&spl_token::id(), &ata)
            .map_err(|e| DlmmError::InvalidParameters(e.to_string()))?;
        Ok(vec![system_instruction::transfer(user, &ata, lamports), sync])
    }

    /// Close the wrapped SOL account, returning its lamports to the user
    fn unwrap_sol(user: &Pubkey) -> Result<Instruction, DlmmError> {
        let ata = Self::user_ata(user, &Self::native_mint());
        spl_token::instruction::close_account(&spl_token::id(), &ata, user, user, &[])
            .map_err(|e| DlmmError::InvalidParameters(e.to_string()))
    }

    fn position_accounts(pool: &PoolState, user: &Pubkey, position: &Pubkey, lower: i32, upper: i32) -> PositionAccounts {
        PositionAccounts {
            position: *position,
            user: *user,
            user_token_x: Self::user_ata(user, &pool.token_x_mint),
            user_token_y: Self::user_ata(user, &pool.token_y_mint),
            bin_array_lower: pda::derive_bin_array(&pool.address, pda::bin_id_to_bin_array_index(lower)),
            bin_array_upper: pda::derive_bin_array(&pool.address, pda::bin_id_to_bin_array_index(upper)),
        }
    }

    fn involves_native(pool: &PoolState) -> bool {
        pool.token_x_mint == Self::native_mint() || pool.token_y_mint == Self::native_mint()
    }
}

#[async_trait]
impl DlmmPort for MeteoraDlmmClient {
    fn derive_pool_address(&self, token_x: &Pubkey, token_y: &Pubkey, bin_step: u16, base_factor: u16) -> Pubkey {
        pda::derive_lb_pair(token_x, token_y, bin_step, base_factor)
    }

    fn derive_preset_parameter(&self, bin_step: u16, base_factor: u16) -> Pubkey {
        pda::derive_preset_parameter(bin_step, base_factor)
    }

    async fn load_pool(&self, pool: &Pubkey) -> Result<PoolState, DlmmError> {
        let account = self
            .chain
            .get_account(pool)
            .await?
            .ok_or_else(|| DlmmError::InvalidPool(format!("{} does not exist", pool)))?;
        decode_lb_pair(&account)
    }

    async fn create_pool_instructions(
        &self,
        funder: &Pubkey,
        request: &CreatePoolRequest,
    ) -> Result<Vec<Instruction>, DlmmError> {
        if request.token_x == request.token_y {
            return Err(DlmmError::InvalidParameters("pool tokens must differ".to_string()));
        }

        let lb_pair = pda::derive_lb_pair(&request.token_x, &request.token_y, request.bin_step, request.base_factor);
        let accounts = InitializeLbPairAccounts {
            lb_pair,
            token_mint_x: request.token_x,
            token_mint_y: request.token_y,
            reserve_x: pda::derive_reserve(&lb_pair, &request.token_x),
            reserve_y: pda::derive_reserve(&lb_pair, &request.token_y),
            oracle: pda::derive_oracle(&lb_pair),
            preset_parameter: request.preset_parameter,
            funder: *funder,
        };

        Ok(vec![instructions::initialize_lb_pair(&accounts, request.active_id, request.bin_step)])
    }

    async fn open_position_instructions(
        &self,
        pool: &PoolState,
        request: &OpenPositionRequest,
    ) -> Result<Vec<Instruction>, DlmmError> {
        let width = request.max_bin_id - request.min_bin_id + 1;
        if width <= 0 || width > MAX_BINS_PER_POSITION {
            return Err(DlmmError::InvalidParameters(format!(
                "position range [{}, {}] must cover 1..={} bins",
                request.min_bin_id, request.max_bin_id, MAX_BINS_PER_POSITION
            )));
        }

        let user = &request.user;
        let mut ixs = vec![
            Self::create_ata(user, &pool.token_x_mint),
            Self::create_ata(user, &pool.token_y_mint),
        ];
        if pool.token_x_mint == Self::native_mint() && request.amount_x > 0 {
            ixs.extend(Self::wrap_sol(user, request.amount_x)?);
        }
        if pool.token_y_mint == Self::native_mint() && request.amount_y > 0 {
            ixs.extend(Self::wrap_sol(user, request.amount_y)?);
        }

        ixs.push(instructions::initialize_position(
            user,
            &request.position,
            &pool.address,
            user,
            request.min_bin_id,
            width,
        ));

        let lower_index = pda::bin_id_to_bin_array_index(request.min_bin_id);
        let upper_index = pda::bin_id_to_bin_array_index(request.max_bin_id);
        for index in lower_index..=upper_index {
            let bin_array = pda::derive_bin_array(&pool.address, index);
            if !self.chain.account_exists(&bin_array).await? {
                ixs.push(instructions::initialize_bin_array(&pool.address, &bin_array, user, index));
            }
        }

        let accounts = Self::position_accounts(pool, user, &request.position, request.min_bin_id, request.max_bin_id);
        ixs.push(instructions::add_liquidity_by_strategy(
            pool,
            &accounts,
            request.amount_x,
            request.amount_y,
            request.min_bin_id,
            request.max_bin_id,
        ));

        Ok(ixs)
    }

    async fn remove_liquidity_instructions(
        &self,
        pool: &PoolState,
        user: &Pubkey,
        position: &PositionHandle,
    ) -> Result<Vec<Instruction>, DlmmError> {
        let accounts = Self::position_accounts(pool, user, &position.address, position.lower_bin_id, position.upper_bin_id);

        let mut ixs = vec![
            Self::create_ata(user, &pool.token_x_mint),
            Self::create_ata(user, &pool.token_y_mint),
            instructions::remove_liquidity_by_range(
                pool,
                &accounts,
                position.lower_bin_id,
                position.upper_bin_id,
                FULL_WITHDRAWAL_BPS,
            ),
            instructions::claim_fee(pool, &accounts),
            instructions::close_position(pool, &accounts),
        ];
        if Self::involves_native(pool) {
            ixs.push(Self::unwrap_sol(user)?);
        }

        Ok(ixs)
    }

    async fn bin_arrays_for_swap(&self, pool: &PoolState, swap_for_y: bool) -> Result<Vec<Pubkey>, DlmmError> {
        // Selling X pushes the price (and the active bin) down
        let step: i64 = if swap_for_y { -1 } else { 1 };
        let start = pda::bin_id_to_bin_array_index(pool.active_id);

        let mut found = Vec::new();
        for offset in 0..SWAP_BIN_ARRAY_LOOKAHEAD {
            let bin_array = pda::derive_bin_array(&pool.address, start + step * offset);
            if self.chain.account_exists(&bin_array).await? {
                found.push(bin_array);
            } else if !found.is_empty() {
                break;
            }
        }

        tracing::debug!(
            "Found {} bin arrays for swap_for_y={} in pool {}",
            found.len(),
            swap_for_y,
            pool.address
        );
        Ok(found)
    }

    fn swap_quote(
        &self,
        pool: &PoolState,
        amount_in: u64,
        swap_for_y: bool,
        slippage_bps: u16,
        bin_arrays: Vec<Pubkey>,
    ) -> Result<SwapQuote, DlmmError> {
        quote_exact_in(pool, amount_in, swap_for_y, slippage_bps, bin_arrays)
    }

    async fn swap_instructions(
        &self,
        pool: &PoolState,
        user: &Pubkey,
        quote: &SwapQuote,
    ) -> Result<Vec<Instruction>, DlmmError> {
        let (mint_in, mint_out) = if quote.swap_for_y {
            (pool.token_x_mint, pool.token_y_mint)
        } else {
            (pool.token_y_mint, pool.token_x_mint)
        };

        let mut ixs = vec![Self::create_ata(user, &mint_in), Self::create_ata(user, &mint_out)];
        if mint_in == Self::native_mint() {
            ixs.extend(Self::wrap_sol(user, quote.amount_in)?);
        }

        ixs.push(instructions::swap(
            pool,
            user,
            &Self::user_ata(user, &mint_in),
            &Self::user_ata(user, &mint_out),
            quote,
        ));

        if Self::involves_native(pool) {
            ixs.push(Self::unwrap_sol(user)?);
        }

        Ok(ixs)
    }
}
