//! Anchor instruction builders for the lb_clmm program.
//!
//! Data layout is the 8-byte discriminator followed by the borsh encoding
//! of the arguments (little-endian scalars, no padding).

use solana_sdk::{
    hash::hashv,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
    sysvar,
};

use super::pda::{derive_event_authority, LB_CLMM_PROGRAM_ID};
use crate::ports::{PoolState, SwapQuote};

/// Share of liquidity to withdraw, in basis points
pub const FULL_WITHDRAWAL_BPS: u16 = 10_000;

/// `StrategyType::SpotImBalanced`, the spot shape with deposits on both sides
const STRATEGY_SPOT_IMBALANCED: u8 = 6;

/// Active bin drift tolerated between quote and deposit
const MAX_ACTIVE_BIN_SLIPPAGE: i32 = 3;

/// First 8 bytes of sha256("global:<name>")
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let hash = hashv(&[b"global:", name.as_bytes()]);
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash.to_bytes()[..8]);
    out
}

fn data_for(name: &str, args: &[&[u8]]) -> Vec<u8> {
    let mut data = instruction_discriminator(name).to_vec();
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// Trailing accounts of every `#[event_cpi]` instruction
fn event_accounts() -> [AccountMeta; 2] {
    [
        AccountMeta::new_readonly(derive_event_authority(), false),
        AccountMeta::new_readonly(LB_CLMM_PROGRAM_ID, false),
    ]
}

/// Optional account slot; the program id stands in for `None`
fn optional(key: Option<Pubkey>, writable: bool) -> AccountMeta {
    match key {
        Some(key) if writable => AccountMeta::new(key, false),
        Some(key) => AccountMeta::new_readonly(key, false),
        None => AccountMeta::new_readonly(LB_CLMM_PROGRAM_ID, false),
    }
}

/// Accounts of a pool creation
pub struct InitializeLbPairAccounts {
    pub lb_pair: Pubkey,
    pub token_mint_x: Pubkey,
    pub token_mint_y: Pubkey,
    pub reserve_x: Pubkey,
    pub reserve_y: Pubkey,
    pub oracle: Pubkey,
    pub preset_parameter: Pubkey,
    pub funder: Pubkey,
}

pub fn initialize_lb_pair(accounts: &InitializeLbPairAccounts, active_id: i32, bin_step: u16) -> Instruction {
    let mut metas = vec![
        AccountMeta::new(accounts.lb_pair, false),
        optional(None, true),
        AccountMeta::new_readonly(accounts.token_mint_x, false),
        AccountMeta::new_readonly(accounts.token_mint_y, false),
        AccountMeta::new(accounts.reserve_x, false),
        AccountMeta::new(accounts.reserve_y, false),
        AccountMeta::new(accounts.oracle, false),
        AccountMeta::new_readonly(accounts.preset_parameter, false),
        AccountMeta::new(accounts.funder, true),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ];
    metas.extend(event_accounts());

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts: metas,
        data: data_for("initialize_lb_pair", &[&active_id.to_le_bytes(), &bin_step.to_le_bytes()]),
    }
}

pub fn initialize_bin_array(lb_pair: &Pubkey, bin_array: &Pubkey, funder: &Pubkey, index: i64) -> Instruction {
    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new_readonly(*lb_pair, false),
            AccountMeta::new(*bin_array, false),
            AccountMeta::new(*funder, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: data_for("initialize_bin_array", &[&index.to_le_bytes()]),
    }
}

/// Position account is a fresh keypair and must sign alongside the owner
pub fn initialize_position(
    payer: &Pubkey,
    position: &Pubkey,
    lb_pair: &Pubkey,
    owner: &Pubkey,
    lower_bin_id: i32,
    width: i32,
) -> Instruction {
    let mut metas = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(*position, true),
        AccountMeta::new_readonly(*lb_pair, false),
        AccountMeta::new_readonly(*owner, true),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ];
    metas.extend(event_accounts());

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts: metas,
        data: data_for("initialize_position", &[&lower_bin_id.to_le_bytes(), &width.to_le_bytes()]),
    }
}

/// Accounts shared by instructions that move tokens in or out of a position
pub struct PositionAccounts {
    pub position: Pubkey,
    pub user: Pubkey,
    pub user_token_x: Pubkey,
    pub user_token_y: Pubkey,
    pub bin_array_lower: Pubkey,
    pub bin_array_upper: Pubkey,
}

fn liquidity_metas(pool: &PoolState, accounts: &PositionAccounts) -> Vec<AccountMeta> {
    let mut metas = vec![
        AccountMeta::new(accounts.position, false),
        AccountMeta::new(pool.address, false),
        optional(None, true),
        AccountMeta::new(accounts.user_token_x, false),
        AccountMeta::new(accounts.user_token_y, false),
        AccountMeta::new(pool.reserve_x, false),
        AccountMeta::new(pool.reserve_y, false),
        AccountMeta::new_readonly(pool.token_x_mint, false),
        AccountMeta::new_readonly(pool.token_y_mint, false),
        AccountMeta::new(accounts.bin_array_lower, false),
        AccountMeta::new(accounts.bin_array_upper, false),
        AccountMeta::new_readonly(accounts.user, true),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    metas.extend(event_accounts());
    metas
}

/// Spot-shaped deposit over `[min_bin_id, max_bin_id]`
pub fn add_liquidity_by_strategy(
    pool: &PoolState,
    accounts: &PositionAccounts,
    amount_x: u64,
    amount_y: u64,
    min_bin_id: i32,
    max_bin_id: i32,
) -> Instruction {
    let mut params = Vec::with_capacity(8 + 8 + 4 + 4 + 4 + 4 + 1 + 64);
    params.extend_from_slice(&amount_x.to_le_bytes());
    params.extend_from_slice(&amount_y.to_le_bytes());
    params.extend_from_slice(&pool.active_id.to_le_bytes());
    params.extend_from_slice(&MAX_ACTIVE_BIN_SLIPPAGE.to_le_bytes());
    params.extend_from_slice(&min_bin_id.to_le_bytes());
    params.extend_from_slice(&max_bin_id.to_le_bytes());
    params.push(STRATEGY_SPOT_IMBALANCED);
    params.extend_from_slice(&[0u8; 64]);

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts: liquidity_metas(pool, accounts),
        data: data_for("add_liquidity_by_strategy", &[&params]),
    }
}

pub fn remove_liquidity_by_range(
    pool: &PoolState,
    accounts: &PositionAccounts,
    from_bin_id: i32,
    to_bin_id: i32,
    bps: u16,
) -> Instruction {
    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts: liquidity_metas(pool, accounts),
        data: data_for(
            "remove_liquidity_by_range",
            &[&from_bin_id.to_le_bytes(), &to_bin_id.to_le_bytes(), &bps.to_le_bytes()],
        ),
    }
}

pub fn claim_fee(pool: &PoolState, accounts: &PositionAccounts) -> Instruction {
    let mut metas = vec![
        AccountMeta::new(pool.address, false),
        AccountMeta::new(accounts.position, false),
        AccountMeta::new(accounts.bin_array_lower, false),
        AccountMeta::new(accounts.bin_array_upper, false),
        AccountMeta::new_readonly(accounts.user, true),
        AccountMeta::new(pool.reserve_x, false),
        AccountMeta::new(pool.reserve_y, false),
        AccountMeta::new(accounts.user_token_x, false),
        AccountMeta::new(accounts.user_token_y, false),
        AccountMeta::new_readonly(pool.token_x_mint, false),
        AccountMeta::new_readonly(pool.token_y_mint, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    metas.extend(event_accounts());

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts: metas,
        data: data_for("claim_fee", &[]),
    }
}

/// Closes the position and returns its rent to the user
pub fn close_position(pool: &PoolState, accounts: &PositionAccounts) -> Instruction {
    let mut metas = vec![
        AccountMeta::new(accounts.position, false),
        AccountMeta::new(pool.address, false),
        AccountMeta::new(accounts.bin_array_lower, false),
        AccountMeta::new(accounts.bin_array_upper, false),
        AccountMeta::new_readonly(accounts.user, true),
        AccountMeta::new(accounts.user, false),
    ];
    metas.extend(event_accounts());

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts: metas,
        data: data_for("close_position", &[]),
    }
}

/// Exact-in swap. Bin arrays from the quote ride along as remaining accounts.
pub fn swap(
    pool: &PoolState,
    user: &Pubkey,
    user_token_in: &Pubkey,
    user_token_out: &Pubkey,
    quote: &SwapQuote,
) -> Instruction {
    let mut metas = vec![
        AccountMeta::new(pool.address, false),
        optional(None, false),
        AccountMeta::new(pool.reserve_x, false),
        AccountMeta::new(pool.reserve_y, false),
        AccountMeta::new(*user_token_in, false),
        AccountMeta::new(*user_token_out, false),
        AccountMeta::new_readonly(pool.token_x_mint, false),
        AccountMeta::new_readonly(pool.token_y_mint, false),
        AccountMeta::new(pool.oracle, false),
        optional(None, true),
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    metas.extend(event_accounts());
    metas.extend(quote.bin_arrays.iter().map(|key| AccountMeta::new(*key, false)));

    Instruction {
        program_id: LB_CLMM_PROGRAM_ID,
        accounts: metas,
        data: data_for(
            "swap",
            &[&quote.amount_in.to_le_bytes(), &quote.min_out_amount.to_le_bytes()],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> PoolState {
        PoolState {
            address: Pubkey::new_unique(),
            token_x_mint: Pubkey::new_unique(),
            token_y_mint: Pubkey::new_unique(),
            reserve_x: Pubkey::new_unique(),
            reserve_y: Pubkey::new_unique(),
            oracle: Pubkey::new_unique(),
            active_id: 5,
            bin_step: 20,
            base_factor: 10_000,
            base_fee_power_factor: 0,
        }
    }

    fn position_accounts() -> PositionAccounts {
        PositionAccounts {
            position: Pubkey::new_unique(),
            user: Pubkey::new_unique(),
            user_token_x: Pubkey::new_unique(),
            user_token_y: Pubkey::new_unique(),
            bin_array_lower: Pubkey::new_unique(),
            bin_array_upper: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_discriminators_differ() {
        assert_ne!(instruction_discriminator("swap"), instruction_discriminator("claim_fee"));
        assert_eq!(instruction_discriminator("swap"), instruction_discriminator("swap"));
    }

    #[test]
    fn test_add_liquidity_layout() {
        let pool = pool();
        let accounts = position_accounts();
        let ix = add_liquidity_by_strategy(&pool, &accounts, 1_000, 2_000, -5, 15);

        // discriminator + 8 + 8 + 4 + 4 + (4 + 4 + 1 + 64)
        assert_eq!(ix.data.len(), 8 + 97);
        assert_eq!(&ix.data[8..16], &1_000u64.to_le_bytes());
        assert_eq!(&ix.data[16..24], &2_000u64.to_le_bytes());
        assert_eq!(&ix.data[24..28], &5i32.to_le_bytes());
        assert_eq!(&ix.data[32..36], &(-5i32).to_le_bytes());
        assert_eq!(&ix.data[36..40], &15i32.to_le_bytes());
        assert_eq!(ix.data[40], STRATEGY_SPOT_IMBALANCED);
        assert_eq!(ix.accounts[0].pubkey, accounts.position);
        assert!(ix.accounts.iter().any(|m| m.pubkey == accounts.user && m.is_signer));
    }

    #[test]
    fn test_swap_appends_bin_arrays() {
        let pool = pool();
        let bin_arrays = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let quote = SwapQuote {
            swap_for_y: true,
            amount_in: 500,
            out_amount: 490,
            min_out_amount: 487,
            fee: 10,
            bin_arrays: bin_arrays.clone(),
        };
        let ix = swap(&pool, &Pubkey::new_unique(), &Pubkey::new_unique(), &Pubkey::new_unique(), &quote);

        let tail: Vec<Pubkey> = ix.accounts.iter().rev().take(2).rev().map(|m| m.pubkey).collect();
        assert_eq!(tail, bin_arrays);
        assert_eq!(&ix.data[8..16], &500u64.to_le_bytes());
        assert_eq!(&ix.data[16..24], &487u64.to_le_bytes());
    }

    #[test]
    fn test_remove_liquidity_full_range() {
        let pool = pool();
        let ix = remove_liquidity_by_range(&pool, &position_accounts(), -5, 15, FULL_WITHDRAWAL_BPS);
        assert_eq!(&ix.data[16..18], &10_000u16.to_le_bytes());
    }
}
