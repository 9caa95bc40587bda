//! Test token minting.
//!
//! Creates a fresh SPL mint with the payer as authority, the payer's
//! associated token account and an initial supply, all in one transaction.
//! Used to stand up pools against tokens nobody else trades.

use serde::Serialize;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use spl_token::solana_program::program_pack::Pack;
use std::sync::Arc;

use crate::domain::{FarmError, LAMPORTS_PER_SOL};
use crate::ports::ChainPort;

#[derive(Debug, Clone, Serialize)]
pub struct MintReceipt {
    pub mint: String,
    pub token_account: String,
    pub decimals: u8,
    /// Raw base units minted to the payer
    pub supply: u64,
    pub signature: String,
}

pub struct TokenMinter {
    chain: Arc<dyn ChainPort>,
}

impl TokenMinter {
    pub fn new(chain: Arc<dyn ChainPort>) -> Self {
        Self { chain }
    }

    pub async fn mint(&self, payer: &Keypair, decimals: u8, supply: u64) -> Result<MintReceipt, FarmError> {
        let payer_key = payer.pubkey();

        let balance = self
            .chain
            .get_balance(&payer_key)
            .await
            .map_err(|e| FarmError::transaction("balance lookup", e))?;
        if balance == 0 {
            return Err(FarmError::Configuration(format!(
                "wallet {} has no SOL to pay for the mint",
                payer_key
            )));
        }
        tracing::info!(
            "Payer {} balance {:.6} SOL",
            payer_key,
            balance as f64 / LAMPORTS_PER_SOL as f64
        );

        let rent = self
            .chain
            .get_minimum_balance_for_rent_exemption(spl_token::state::Mint::LEN)
            .await
            .map_err(|e| FarmError::transaction("rent lookup", e))?;

        let mint = Keypair::new();
        let token_account = get_associated_token_address(&payer_key, &mint.pubkey());
        let instructions = mint_instructions(&payer_key, &mint.pubkey(), rent, decimals, supply)?;

        tracing::info!("Creating mint {} ({} decimals)", mint.pubkey(), decimals);
        let signature = self
            .chain
            .send_and_confirm(&instructions, payer, &[&mint])
            .await
            .map_err(|e| FarmError::transaction("mint token", e))?;

        tracing::info!(
            "Minted {} base units of {} to {} | tx {}",
            supply,
            mint.pubkey(),
            token_account,
            signature
        );

        Ok(MintReceipt {
            mint: mint.pubkey().to_string(),
            token_account: token_account.to_string(),
            decimals,
            supply,
            signature: signature.to_string(),
        })
    }
}

fn mint_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    rent: u64,
    decimals: u8,
    supply: u64,
) -> Result<Vec<Instruction>, FarmError> {
    let token_program = spl_token::id();
    let token_account = get_associated_token_address(payer, mint);

    let create = system_instruction::create_account(
        payer,
        mint,
        rent,
        spl_token::state::Mint::LEN as u64,
        &token_program,
    );
    let initialize = spl_token::instruction::initialize_mint2(&token_program, mint, payer, Some(payer), decimals)
        .map_err(|e| FarmError::transaction("initialize mint", e))?;
    let create_ata = create_associated_token_account_idempotent(payer, payer, mint, &token_program);
    let mint_to = spl_token::instruction::mint_to(&token_program, mint, &token_account, payer, &[], supply)
        .map_err(|e| FarmError::transaction("mint to", e))?;

    Ok(vec![create, initialize, create_ata, mint_to])
}
