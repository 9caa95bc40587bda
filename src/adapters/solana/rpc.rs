use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::{
    rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, RpcFilterType},
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::RawAccount;
use crate::ports::{ChainError, ChainPort};

/// Size of an SPL token account
const TOKEN_ACCOUNT_LEN: u64 = 165;
/// Offset of the owner field inside an SPL token account
const TOKEN_ACCOUNT_OWNER_OFFSET: usize = 32;

/// Wrapper around Solana RPC client with async-compatible methods
#[derive(Clone)]
pub struct SolanaClient {
    client: Arc<RpcClient>,
    rpc_url: String,
}

impl SolanaClient {
    /// Create a new Solana RPC client
    pub fn new(rpc_url: String) -> Self {
        let client = Arc::new(RpcClient::new_with_commitment(
            rpc_url.clone(),
            CommitmentConfig::confirmed(),
        ));
        Self { client, rpc_url }
    }

    /// Client at a named commitment level ("processed", "confirmed", "finalized").
    /// Unknown names fall back to confirmed.
    pub fn with_commitment(rpc_url: String, commitment: &str) -> Self {
        let commitment = CommitmentConfig::from_str(commitment).unwrap_or_else(|_| {
            tracing::warn!("Unknown commitment '{}', using confirmed", commitment);
            CommitmentConfig::confirmed()
        });
        let client = Arc::new(RpcClient::new_with_commitment(rpc_url.clone(), commitment));
        Self { client, rpc_url }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }
}

#[async_trait]
impl ChainPort for SolanaClient {
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, ChainError> {
        let owner = *owner;
        // Spawn blocking to make sync RPC call async-compatible
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_balance(&owner)
                .map_err(|e| ChainError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| ChainError::RpcError(format!("Task join error: {}", e)))?
    }

    async fn get_token_accounts(
        &self,
        owner: &Pubkey,
        token_program: &Pubkey,
    ) -> Result<Vec<RawAccount>, ChainError> {
        let owner = *owner;
        let program = *token_program;
        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::DataSize(TOKEN_ACCOUNT_LEN),
                RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
                    TOKEN_ACCOUNT_OWNER_OFFSET,
                    owner.as_ref(),
                )),
            ]),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(CommitmentConfig::confirmed()),
                ..Default::default()
            },
            ..Default::default()
        };

        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_program_accounts_with_config(&program, config)
                .map(|accounts| {
                    accounts
                        .into_iter()
                        .map(|(address, account)| RawAccount {
                            address,
                            owner: account.owner,
                            lamports: account.lamports,
                            data: account.data,
                        })
                        .collect()
                })
                .map_err(|e| ChainError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| ChainError::RpcError(format!("Task join error: {}", e)))?
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, ChainError> {
        let address = *address;
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_account_with_commitment(&address, client.commitment())
                .map(|response| {
                    response.value.map(|account| RawAccount {
                        address,
                        owner: account.owner,
                        lamports: account.lamports,
                        data: account.data,
                    })
                })
                .map_err(|e| ChainError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| ChainError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Get recent blockhash (needed for transaction building)
    async fn get_latest_blockhash(&self) -> Result<Hash, ChainError> {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_latest_blockhash()
                .map_err(|e| ChainError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| ChainError::RpcError(format!("Task join error: {}", e)))?
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, ChainError> {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_minimum_balance_for_rent_exemption(data_len)
                .map_err(|e| ChainError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| ChainError::RpcError(format!("Task join error: {}", e)))?
    }

    async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Keypair,
        signers: &[&Keypair],
    ) -> Result<Signature, ChainError> {
        let blockhash = self.get_latest_blockhash().await?;

        let mut all_signers: Vec<&Keypair> = vec![payer];
        all_signers.extend(signers.iter().copied().filter(|s| s.pubkey() != payer.pubkey()));

        let mut tx = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
        tx.try_sign(&all_signers, blockhash)
            .map_err(|e| ChainError::SigningError(e.to_string()))?;

        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .send_and_confirm_transaction(&tx)
                .map_err(|e| ChainError::TransactionError(e.to_string()))
        })
        .await
        .map_err(|e| ChainError::RpcError(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_creation() {
        let client = SolanaClient::new("https://api.devnet.solana.com".to_string());
        assert_eq!(client.rpc_url(), "https://api.devnet.solana.com");
    }

    #[test]
    fn test_commitment_levels() {
        let client = SolanaClient::with_commitment("http://localhost:8899".to_string(), "finalized");
        assert_eq!(client.client.commitment(), CommitmentConfig::finalized());

        let client = SolanaClient::with_commitment("http://localhost:8899".to_string(), "sometimes");
        assert_eq!(client.client.commitment(), CommitmentConfig::confirmed());
    }

    #[test]
    fn test_error_display() {
        let err = ChainError::RpcError("test".to_string());
        assert!(err.to_string().contains("RPC request failed"));

        let err = ChainError::TransactionError("custom program error: 0x1".to_string());
        assert!(err.to_string().contains("Transaction failed"));
    }
}
