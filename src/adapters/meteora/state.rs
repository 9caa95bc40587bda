//! Zero-copy style decoding of the `LbPair` account.
//!
//! Only the fields needed to build position and swap instructions are read.

use solana_sdk::{hash::hashv, pubkey::Pubkey};

use super::pda::{derive_oracle, LB_CLMM_PROGRAM_ID};
use crate::domain::RawAccount;
use crate::ports::{DlmmError, PoolState};

const BASE_FACTOR_OFFSET: usize = 8;
const BASE_FEE_POWER_FACTOR_OFFSET: usize = 8 + 26;
const ACTIVE_ID_OFFSET: usize = 76;
const BIN_STEP_OFFSET: usize = 80;
const TOKEN_X_MINT_OFFSET: usize = 88;
const TOKEN_Y_MINT_OFFSET: usize = 120;
const RESERVE_X_OFFSET: usize = 152;
const RESERVE_Y_OFFSET: usize = 184;
/// Bytes that must be present to read every field above
const MIN_LB_PAIR_LEN: usize = 216;

/// Anchor account discriminator: first 8 bytes of sha256("account:<Name>")
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let hash = hashv(&[b"account:", name.as_bytes()]);
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash.to_bytes()[..8]);
    out
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&data[offset..offset + N]);
    out
}

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    Pubkey::new_from_array(read_array::<32>(data, offset))
}

/// Decode a pool account. Rejects accounts not owned by the DLMM program,
/// with the wrong discriminator, or too short to hold an `LbPair`.
pub fn decode_lb_pair(account: &RawAccount) -> Result<PoolState, DlmmError> {
    if account.owner != LB_CLMM_PROGRAM_ID {
        return Err(DlmmError::InvalidPool(format!(
            "{} is owned by {}, not the DLMM program",
            account.address, account.owner
        )));
    }

    let data = &account.data;
    if data.len() < MIN_LB_PAIR_LEN {
        return Err(DlmmError::InvalidPool(format!(
            "{} has {} bytes, expected at least {}",
            account.address,
            data.len(),
            MIN_LB_PAIR_LEN
        )));
    }

    if data[..8] != account_discriminator("LbPair") {
        return Err(DlmmError::InvalidPool(format!(
            "{} is not an LbPair account",
            account.address
        )));
    }

    Ok(PoolState {
        address: account.address,
        token_x_mint: read_pubkey(data, TOKEN_X_MINT_OFFSET),
        token_y_mint: read_pubkey(data, TOKEN_Y_MINT_OFFSET),
        reserve_x: read_pubkey(data, RESERVE_X_OFFSET),
        reserve_y: read_pubkey(data, RESERVE_Y_OFFSET),
        oracle: derive_oracle(&account.address),
        active_id: i32::from_le_bytes(read_array(data, ACTIVE_ID_OFFSET)),
        bin_step: u16::from_le_bytes(read_array(data, BIN_STEP_OFFSET)),
        base_factor: u16::from_le_bytes(read_array(data, BASE_FACTOR_OFFSET)),
        base_fee_power_factor: data[BASE_FEE_POWER_FACTOR_OFFSET],
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal `LbPair` account bytes with the fields the decoder reads
    pub fn lb_pair_bytes(
        token_x: &Pubkey,
        token_y: &Pubkey,
        reserve_x: &Pubkey,
        reserve_y: &Pubkey,
        active_id: i32,
        bin_step: u16,
        base_factor: u16,
    ) -> Vec<u8> {
        let mut data = vec![0u8; 904];
        data[..8].copy_from_slice(&account_discriminator("LbPair"));
        data[BASE_FACTOR_OFFSET..BASE_FACTOR_OFFSET + 2].copy_from_slice(&base_factor.to_le_bytes());
        data[ACTIVE_ID_OFFSET..ACTIVE_ID_OFFSET + 4].copy_from_slice(&active_id.to_le_bytes());
        data[BIN_STEP_OFFSET..BIN_STEP_OFFSET + 2].copy_from_slice(&bin_step.to_le_bytes());
        data[TOKEN_X_MINT_OFFSET..TOKEN_X_MINT_OFFSET + 32].copy_from_slice(token_x.as_ref());
        data[TOKEN_Y_MINT_OFFSET..TOKEN_Y_MINT_OFFSET + 32].copy_from_slice(token_y.as_ref());
        data[RESERVE_X_OFFSET..RESERVE_X_OFFSET + 32].copy_from_slice(reserve_x.as_ref());
        data[RESERVE_Y_OFFSET..RESERVE_Y_OFFSET + 32].copy_from_slice(reserve_y.as_ref());
        data
    }

    pub fn lb_pair_account(address: Pubkey, active_id: i32, bin_step: u16) -> RawAccount {
        RawAccount {
            address,
            owner: LB_CLMM_PROGRAM_ID,
            lamports: 7_182_720,
            data: lb_pair_bytes(
                &Pubkey::new_unique(),
                &Pubkey::new_unique(),
                &Pubkey::new_unique(),
                &Pubkey::new_unique(),
                active_id,
                bin_step,
                10_000,
            ),
        }
    }
}
