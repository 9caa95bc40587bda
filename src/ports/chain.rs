//! Chain Port - RPC queries and transaction submission
//!
//! The farmer never talks to an RPC node directly; everything goes through
//! this trait so cycles and recovery runs can be exercised against fakes.

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
};
use thiserror::Error;

use crate::domain::RawAccount;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChainError {
    #[error("RPC request failed: {0}")]
    RpcError(String),
    #[error("Transaction failed: {0}")]
    TransactionError(String),
    #[error("Signing failed: {0}")]
    SigningError(String),
    #[error("Invalid account data: {0}")]
    InvalidAccountData(String),
}

#[async_trait]
pub trait ChainPort: Send + Sync {
    /// Lamport balance of `owner`
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, ChainError>;

    /// All token accounts owned by `owner` under `token_program`, raw bytes
    async fn get_token_accounts(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<RawAccount>, ChainError>;

    /// Account at `address`, `None` if it does not exist
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, ChainError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, ChainError>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, ChainError>;

    /// Sign `instructions` with `payer` plus `signers`, submit and wait for confirmation
    async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
    ) -> Result<Signature, ChainError>;

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, ChainError> {
        Ok(self.get_account(address).await?.is_some())
    }
}
